use super::Template;
use crate::config::FrameworkConfig;
use crate::di::Injector;
use crate::dom::Dom;
use crate::error::{EvalResult, ParseResult};
use crate::expression::Expression;
use crate::expression_parser::ExpressionParser;
use crate::extensions::ExtensionManager;
use crate::i18n::Translator;
use crate::metadata::DirectiveParser;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Services shared by every template of one application
pub struct AppContext {
    config: FrameworkConfig,
    dom: Rc<dyn Dom>,
    injector: Rc<Injector>,
    extensions: ExtensionManager,
    translator: Translator,
    parser: ExpressionParser,
    directive_parser: DirectiveParser,
    locale: RefCell<String>,
    expressions: RefCell<HashMap<String, Rc<Expression>>>,
    interpolations: RefCell<HashMap<String, Option<Rc<Expression>>>>,
    root: RefCell<Weak<Template>>,
}

impl AppContext {
    pub(crate) fn new(
        config: FrameworkConfig,
        dom: Rc<dyn Dom>,
        injector: Rc<Injector>,
        extensions: ExtensionManager,
        translator: Translator,
        parser: ExpressionParser,
    ) -> Self {
        AppContext {
            locale: RefCell::new(config.locale.clone()),
            config,
            dom,
            injector,
            extensions,
            translator,
            parser,
            directive_parser: DirectiveParser::new(),
            expressions: RefCell::new(HashMap::new()),
            interpolations: RefCell::new(HashMap::new()),
            root: RefCell::new(Weak::new()),
        }
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn dom(&self) -> &Rc<dyn Dom> {
        &self.dom
    }

    pub fn injector(&self) -> &Rc<Injector> {
        &self.injector
    }

    pub fn extensions(&self) -> &ExtensionManager {
        &self.extensions
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn parser(&self) -> &ExpressionParser {
        &self.parser
    }

    pub fn directive_parser(&self) -> &DirectiveParser {
        &self.directive_parser
    }

    pub fn locale(&self) -> String {
        self.locale.borrow().clone()
    }

    pub fn set_locale(&self, locale: &str) {
        *self.locale.borrow_mut() = locale.to_string();
    }

    /// Compile a binding expression; identical sources share one instance
    pub fn compile_expression(&self, source: &str) -> ParseResult<Rc<Expression>> {
        if let Some(expression) = self.expressions.borrow().get(source) {
            return Ok(Rc::clone(expression));
        }
        let expression = Rc::new(self.parser.compile(source)?);
        self.expressions
            .borrow_mut()
            .insert(source.to_string(), Rc::clone(&expression));
        Ok(expression)
    }

    /// Compile text with `{{ }}` blocks; `None` when there are none
    pub fn compile_interpolation(&self, text: &str) -> ParseResult<Option<Rc<Expression>>> {
        if let Some(expression) = self.interpolations.borrow().get(text) {
            return Ok(expression.clone());
        }
        let expression = self.parser.compile_interpolation(text)?.map(Rc::new);
        self.interpolations
            .borrow_mut()
            .insert(text.to_string(), expression.clone());
        Ok(expression)
    }

    pub fn cached_expression_count(&self) -> usize {
        self.expressions.borrow().len() + self.interpolations.borrow().len()
    }

    pub(crate) fn set_root(&self, root: &Rc<Template>) {
        *self.root.borrow_mut() = Rc::downgrade(root);
    }

    pub fn root(&self) -> Option<Rc<Template>> {
        self.root.borrow().upgrade()
    }

    /// Sweep the whole application from the root template
    pub fn tick(&self) -> EvalResult<usize> {
        match self.root() {
            Some(root) => {
                let fired = root.detector().check()?;
                debug!(fired, "change detection sweep");
                Ok(fired)
            }
            None => Ok(0),
        }
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("locale", &*self.locale.borrow())
            .field("extensions", &self.extensions)
            .field("cached_expressions", &self.cached_expression_count())
            .finish()
    }
}
