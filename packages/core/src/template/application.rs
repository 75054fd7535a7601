use super::context::AppContext;
use super::filters::builtin_filters;
use super::{FilterRegistration, Template, TemplateCompiler, TemplateKind, TemplateOptions};
use crate::change_detection::ChangeDetectionStrategy;
use crate::config::FrameworkConfig;
use crate::di::Injector;
use crate::dom::{Dom, NodeId};
use crate::error::{DefinitionError, EvalResult, Result};
use crate::expression_parser::ExpressionParser;
use crate::extensions::{Extension, ExtensionManager};
use crate::i18n::{PluralRules, Translator};
use crate::metadata::{DirectiveClass, DirectiveType};
use crate::scope::Scope;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

pub struct ApplicationBuilder {
    dom: Rc<dyn Dom>,
    config: FrameworkConfig,
    injector: Option<Rc<Injector>>,
    extensions: ExtensionManager,
    plural_rules: PluralRules,
    filters: Vec<FilterRegistration>,
    translations: IndexMap<String, serde_json::Value>,
    directives: Vec<DirectiveType>,
}

impl ApplicationBuilder {
    pub fn new(dom: Rc<dyn Dom>) -> Self {
        ApplicationBuilder {
            dom,
            config: FrameworkConfig::default(),
            injector: None,
            extensions: ExtensionManager::new(),
            plural_rules: PluralRules::new(),
            filters: Vec::new(),
            translations: IndexMap::new(),
            directives: Vec::new(),
        }
    }

    pub fn config(mut self, config: FrameworkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn injector(mut self, injector: Rc<Injector>) -> Self {
        self.injector = Some(injector);
        self
    }

    pub fn extension(mut self, extension: Rc<dyn Extension>) -> Self {
        self.extensions.add(extension);
        self
    }

    pub fn plural_rules(mut self, rules: PluralRules) -> Self {
        self.plural_rules = rules;
        self
    }

    pub fn filter(mut self, filter: FilterRegistration) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn translations(mut self, locale: &str, tree: serde_json::Value) -> Self {
        self.translations.insert(locale.to_string(), tree);
        self
    }

    /// Directive usable anywhere in the application
    pub fn directive(mut self, directive: DirectiveType) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn build(self) -> Result<Application> {
        let parser = ExpressionParser::new(self.config.parser.clone())?;
        let app = Rc::new(AppContext::new(
            self.config,
            self.dom,
            self.injector.unwrap_or_default(),
            self.extensions,
            Translator::new(self.plural_rules),
            parser,
        ));

        let root = Template::new(
            Rc::clone(&app),
            None,
            TemplateOptions {
                kind: TemplateKind::Application,
                name: "application".to_string(),
                element: None,
                strategy: ChangeDetectionStrategy::Default,
                directive_types: self.directives,
                controller_as: None,
            },
        );

        // Later registrations shadow earlier ones with the same name
        let filters = builtin_filters()
            .into_iter()
            .chain(app.extensions().filters())
            .chain(self.filters);
        for filter in filters {
            root.register_filter(filter);
        }
        for (locale, tree) in self.translations {
            root.register_translations(&locale, tree);
        }
        app.set_root(&root);

        Ok(Application {
            context: app,
            root,
            components: RefCell::new(Vec::new()),
        })
    }
}

/// A running application: the root template and its bootstrapped components
pub struct Application {
    context: Rc<AppContext>,
    root: Rc<Template>,
    components: RefCell<Vec<Rc<Template>>>,
}

impl Application {
    pub fn builder(dom: Rc<dyn Dom>) -> ApplicationBuilder {
        ApplicationBuilder::new(dom)
    }

    pub fn context(&self) -> &Rc<AppContext> {
        &self.context
    }

    pub fn root(&self) -> &Rc<Template> {
        &self.root
    }

    pub fn scope(&self) -> &Rc<Scope> {
        self.root.scope()
    }

    pub fn dom(&self) -> &Rc<dyn Dom> {
        self.context.dom()
    }

    /// Mount the component `T` on `host`
    pub fn bootstrap<T: DirectiveClass>(&self, host: NodeId) -> Result<Rc<Template>> {
        self.bootstrap_type(DirectiveType::of::<T>(), host)
    }

    pub fn bootstrap_type(&self, ty: DirectiveType, host: NodeId) -> Result<Rc<Template>> {
        let definition = self.context.directive_parser().parse(&ty)?;
        if !definition.is_component() {
            return Err(DefinitionError::MissingTemplate {
                class: ty.name().to_string(),
            }
            .into());
        }

        let component = TemplateCompiler::new(&self.root)?.process_component(host, &definition)?;
        self.components.borrow_mut().push(Rc::clone(&component));
        info!(component = ty.name(), "application bootstrapped");
        Ok(component)
    }

    /// First bootstrapped component's template
    pub fn component_template(&self) -> Option<Rc<Template>> {
        self.components.borrow().first().cloned()
    }

    /// Compile `markup` into `host` under the root template
    pub fn compile_fragment(&self, host: NodeId, markup: &str) -> Result<Rc<Template>> {
        TemplateCompiler::new(&self.root)?.compile_fragment(host, markup)
    }

    /// Run one change detection sweep from the root
    pub fn tick(&self) -> EvalResult<usize> {
        self.context.tick()
    }

    pub fn locale(&self) -> String {
        self.context.locale()
    }

    /// Switch locale and re-render
    pub fn set_locale(&self, locale: &str) -> EvalResult<usize> {
        self.context.set_locale(locale);
        self.tick()
    }

    pub fn destroy(&self) {
        self.components.borrow_mut().clear();
        self.root.destroy();
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("context", &self.context)
            .field("root", &self.root)
            .finish()
    }
}
