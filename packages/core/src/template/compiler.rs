//! Template Compiler
//!
//! Walks a DOM subtree owned by one template and wires it up: text and
//! attribute interpolations, `[property]` and `(event)` bindings, and the
//! directives and components whose selectors match each element. Component
//! hosts are compiled into their own child template and the walk does not
//! descend into them.

use super::directive::{AttachedDirective, DirectiveContext, HostElement, OutputTable};
use super::{Template, TemplateKind, TemplateOptions};
use crate::change_detection::{ChangeDetectionStrategy, WatchId};
use crate::di::{ServiceDescriptor, ServiceOverrides};
use crate::dom::{parse_fragment, Dom, DomEvent, EventHandler, NodeId, NodeKind};
use crate::error::{DefinitionError, EvalResult, Result};
use crate::expression::{Expression, Locals, Value};
use crate::metadata::{DirectiveDefinition, InputDefinition};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

type Setter = Rc<dyn Fn(&Value) -> EvalResult<()>>;

enum InputSource {
    Expression(Rc<Expression>),
    Literal(Value),
}

enum BindingAttribute<'a> {
    Property(&'a str),
    Event(&'a str),
}

fn binding_attribute(name: &str) -> Option<BindingAttribute<'_>> {
    if let Some(inner) = name.strip_prefix('[').and_then(|n| n.strip_suffix(']')) {
        return Some(BindingAttribute::Property(inner));
    }
    if let Some(inner) = name.strip_prefix('(').and_then(|n| n.strip_suffix(')')) {
        return Some(BindingAttribute::Event(inner));
    }
    None
}

/// Compiles markup into one template
pub struct TemplateCompiler {
    template: Rc<Template>,
    definitions: Vec<Rc<DirectiveDefinition>>,
}

impl TemplateCompiler {
    /// Resolves the definitions of every directive available to `template`
    pub fn new(template: &Rc<Template>) -> Result<Self> {
        let parser = template.app().directive_parser();
        let definitions = template
            .available_directives()
            .iter()
            .map(|ty| parser.parse(ty))
            .collect::<std::result::Result<Vec<_>, DefinitionError>>()?;
        Ok(TemplateCompiler {
            template: Rc::clone(template),
            definitions,
        })
    }

    pub fn template(&self) -> &Rc<Template> {
        &self.template
    }

    pub fn definitions(&self) -> &[Rc<DirectiveDefinition>] {
        &self.definitions
    }

    /// Compile `nodes` and their descendants, stopping at component hosts
    pub fn compile_nodes(&self, nodes: &[NodeId]) -> Result<()> {
        let dom = self.template.dom();
        for &node in nodes {
            match dom.node_kind(node) {
                Some(NodeKind::Text) => {
                    let text = dom.text(node);
                    if text.contains("{{") {
                        self.bind_text(node, &text)?;
                    }
                }
                Some(NodeKind::Element) => {
                    if !self.compile_element(node)? {
                        self.compile_nodes(&dom.children(node))?;
                    }
                }
                Some(NodeKind::Fragment) => self.compile_nodes(&dom.children(node))?,
                None => {}
            }
        }
        Ok(())
    }

    /// Parse `markup` into `host` and compile it as an abstract template
    /// under the compiler's template.
    pub fn compile_fragment(&self, host: NodeId, markup: &str) -> Result<Rc<Template>> {
        let fragment = Template::new(
            Rc::clone(self.template.app()),
            Some(&self.template),
            TemplateOptions {
                kind: TemplateKind::Abstract,
                name: format!("{}#fragment", self.template.name()),
                element: Some(host),
                strategy: ChangeDetectionStrategy::Default,
                directive_types: Vec::new(),
                controller_as: None,
            },
        );
        let nodes = parse_fragment(&*fragment.dom(), host, markup)?;
        TemplateCompiler::new(&fragment)?.compile_nodes(&nodes)?;
        Ok(fragment)
    }

    /// Returns `true` when a component took over the element
    fn compile_element(&self, node: NodeId) -> Result<bool> {
        let dom = self.template.dom();
        let tag = dom.tag_name(node).unwrap_or_default();

        let matched: Vec<Rc<DirectiveDefinition>> = self
            .definitions
            .iter()
            .filter(|d| d.matches(&*dom, node))
            .cloned()
            .collect();

        let mut components = matched.iter().filter(|d| d.is_component());
        if let (Some(first), Some(second)) = (components.next(), components.next()) {
            return Err(DefinitionError::MultipleComponents {
                element: tag,
                first: first.class_name.to_string(),
                second: second.class_name.to_string(),
            }
            .into());
        }

        let consumed = |name: &str| {
            matched.iter().any(|d| match binding_attribute(name) {
                Some(BindingAttribute::Property(inner)) => d.input(inner).is_some(),
                Some(BindingAttribute::Event(inner)) => d.has_output(inner),
                None => d.input(name).is_some(),
            })
        };

        let attributes = dom.attributes(node);
        for (name, value) in &attributes {
            if consumed(name) {
                continue;
            }
            match binding_attribute(name) {
                Some(BindingAttribute::Property(path)) => {
                    self.bind_property(node, path, value)?
                }
                Some(BindingAttribute::Event(event)) => self.bind_event(node, event, value)?,
                None if value.contains("{{") => self.bind_attribute(node, name, value)?,
                None => {}
            }
        }

        let mut has_component = false;
        for definition in &matched {
            if definition.is_component() {
                self.process_component(node, definition)?;
                has_component = true;
            } else {
                self.process_directive(node, definition)?;
            }
        }

        for (name, _) in &attributes {
            if binding_attribute(name).is_some() {
                dom.remove_attribute(node, name);
            }
        }

        trace!(element = %tag, directives = matched.len(), "element compiled");
        Ok(has_component)
    }

    /// Watch `expression` on `owner`'s detector, writing changes through
    /// `setter`. Returns the watch and the initial value.
    fn watch(
        &self,
        owner: &Rc<Template>,
        expression: Rc<Expression>,
        setter: Setter,
    ) -> Result<(WatchId, Value)> {
        let detector = owner.detector();
        let id = detector.watch(
            expression,
            true,
            Rc::new(move |new: &Value, _old: &Value| setter(new)),
        )?;
        let initial = detector.last_value(id).unwrap_or_default();
        Ok((id, initial))
    }

    fn bind_text(&self, node: NodeId, text: &str) -> Result<()> {
        let Some(expression) = self.template.app().compile_interpolation(text)? else {
            return Ok(());
        };
        let dom = self.template.dom();
        let setter: Setter = Rc::new(move |value: &Value| {
            dom.set_text(node, &value.render_text());
            Ok(())
        });
        let (_, initial) = self.watch(&self.template, expression, Rc::clone(&setter))?;
        setter(&initial)?;
        Ok(())
    }

    fn bind_attribute(&self, node: NodeId, name: &str, text: &str) -> Result<()> {
        let Some(expression) = self.template.app().compile_interpolation(text)? else {
            return Ok(());
        };
        let dom = self.template.dom();
        let name = name.to_string();
        let setter: Setter = Rc::new(move |value: &Value| {
            dom.set_attribute(node, &name, &value.render_text());
            Ok(())
        });
        let (_, initial) = self.watch(&self.template, expression, Rc::clone(&setter))?;
        setter(&initial)?;
        Ok(())
    }

    fn bind_property(&self, node: NodeId, path: &str, source: &str) -> Result<()> {
        let setter = self.property_setter(node, path)?;
        let expression = self.template.app().compile_expression(source)?;
        let (_, initial) = self.watch(&self.template, expression, Rc::clone(&setter))?;
        setter(&initial)?;
        Ok(())
    }

    fn property_setter(&self, node: NodeId, path: &str) -> Result<Setter> {
        let invalid = |reason: String| DefinitionError::InvalidPropertyPath {
            path: path.to_string(),
            reason,
        };
        let property = self
            .template
            .app()
            .parser()
            .parse_property_path(path)
            .map_err(|e| invalid(e.message))?;

        let dom = self.template.dom();
        let setter: Setter = match (property.root.as_str(), property.member) {
            ("class", None) => Rc::new(move |value: &Value| {
                dom.set_attribute(node, "class", &class_list(value));
                Ok(())
            }),
            ("class", Some(class)) => Rc::new(move |value: &Value| {
                if value.is_truthy() {
                    dom.add_class(node, &class);
                } else {
                    dom.remove_class(node, &class);
                }
                Ok(())
            }),
            ("style", None) => Rc::new(move |value: &Value| {
                dom.set_attribute(node, "style", &value.render_text());
                Ok(())
            }),
            ("style", Some(name)) => Rc::new(move |value: &Value| {
                let text = value.render_text();
                let removed = value.is_nullish() || matches!(value, Value::Bool(false));
                dom.set_style(node, &name, if removed { None } else { Some(text.as_str()) });
                Ok(())
            }),
            ("attr", Some(name)) => Rc::new(move |value: &Value| {
                if value.is_nullish() || matches!(value, Value::Bool(false)) {
                    dom.remove_attribute(node, &name);
                } else {
                    dom.set_attribute(node, &name, &value.render_text());
                }
                Ok(())
            }),
            ("attr", None) => {
                return Err(invalid("attribute name expected after 'attr'".to_string()).into())
            }
            ("textContent", None) => Rc::new(move |value: &Value| {
                dom.set_text(node, &value.render_text());
                Ok(())
            }),
            (name, None) => {
                let name = name.to_string();
                Rc::new(move |value: &Value| {
                    dom.set_property(node, &name, value.clone());
                    Ok(())
                })
            }
            (root, Some(_)) => {
                return Err(invalid(format!("'{}' does not take a member", root)).into())
            }
        };
        Ok(setter)
    }

    fn bind_event(&self, node: NodeId, event: &str, source: &str) -> Result<()> {
        let expression = self.template.app().compile_expression(source)?;
        let template = Rc::downgrade(&self.template);
        let event_local = self.template.app().config().event_local.clone();
        let handler: EventHandler = Rc::new(move |event: &DomEvent| {
            let Some(template) = template.upgrade() else {
                return Ok(());
            };
            let locals = Locals::new(&*template).with(event_local.as_str(), event.detail.clone());
            expression.evaluate(&locals)?;
            template.app().tick()?;
            Ok(())
        });
        let id = self.template.dom().add_event_listener(node, event, handler);
        self.template.track_listener(id);
        Ok(())
    }

    /// Where the value of `input` comes from on `node`
    fn input_source(
        &self,
        node: NodeId,
        definition: &DirectiveDefinition,
        input: &InputDefinition,
    ) -> Result<Option<InputSource>> {
        let dom = self.template.dom();
        let app = self.template.app();

        if let Some(source) = dom.attribute(node, &format!("[{}]", input.name)) {
            return Ok(Some(InputSource::Expression(app.compile_expression(&source)?)));
        }

        let source = match dom.attribute(node, &input.name) {
            Some(source) if input.is_property() => {
                InputSource::Expression(app.compile_expression(&source)?)
            }
            Some(text) => match app.compile_interpolation(&text)? {
                Some(expression) => InputSource::Expression(expression),
                None => InputSource::Literal(Value::from(text)),
            },
            None if input.is_required() => {
                return Err(DefinitionError::MissingRequiredInput {
                    class: definition.class_name.to_string(),
                    input: input.name.clone(),
                    element: dom.tag_name(node).unwrap_or_default(),
                }
                .into())
            }
            None => return Ok(None),
        };
        Ok(Some(source))
    }

    /// Bind every declared input of `definition` found on `node`, watching
    /// on this compiler's template. Returns the initial values.
    fn bind_inputs(
        &self,
        node: NodeId,
        definition: &DirectiveDefinition,
        setter_for: impl Fn(&str) -> Setter,
    ) -> Result<Vec<(String, Value, Option<WatchId>)>> {
        let mut bound = Vec::new();
        for input in &definition.inputs {
            let Some(source) = self.input_source(node, definition, input)? else {
                continue;
            };
            match source {
                InputSource::Expression(expression) => {
                    let setter = setter_for(&input.name);
                    let (id, initial) = self.watch(&self.template, expression, setter)?;
                    bound.push((input.name.clone(), initial, Some(id)));
                }
                InputSource::Literal(value) => bound.push((input.name.clone(), value, None)),
            }
        }
        Ok(bound)
    }

    /// Subscribe `(output)="expr"` bindings on `node` to `outputs`. The
    /// expressions evaluate in this compiler's template with the emitted
    /// value as the event local.
    fn bind_outputs(
        &self,
        node: NodeId,
        definition: &DirectiveDefinition,
        outputs: &OutputTable,
    ) -> Result<()> {
        let dom = self.template.dom();
        for output in &definition.outputs {
            let Some(source) = dom.attribute(node, &format!("({})", output)) else {
                continue;
            };
            let expression = self.template.app().compile_expression(&source)?;
            let template = Rc::downgrade(&self.template);
            let event_local = self.template.app().config().event_local.clone();
            outputs.subscribe(
                output,
                Rc::new(move |value: &Value| {
                    let Some(template) = template.upgrade() else {
                        return Ok(());
                    };
                    let locals = Locals::new(&*template).with(event_local.as_str(), value.clone());
                    expression.evaluate(&locals)?;
                    Ok(())
                }),
            );
        }
        Ok(())
    }

    /// Host attributes and host listeners declared by `definition`.
    /// Listeners are tracked on `owner`.
    fn bind_host(
        &self,
        owner: &Rc<Template>,
        attached: &AttachedDirective,
        ctx: &DirectiveContext,
    ) {
        let dom = self.template.dom();
        let node = attached.element;
        let definition = &attached.definition;

        for (name, value) in &definition.host_attributes {
            dom.set_attribute(node, name, value);
        }

        for listener in &definition.host_listeners {
            let instance = Rc::downgrade(&attached.instance);
            let ctx = ctx.clone();
            let method = listener.method.clone();
            let handler: EventHandler = Rc::new(move |event: &DomEvent| {
                let Some(instance) = instance.upgrade() else {
                    return Ok(());
                };
                instance.borrow_mut().on_event(&method, event, &ctx)?;
                ctx.template().app().tick()?;
                Ok(())
            });
            let id = dom.add_event_listener(node, &listener.event, handler);
            owner.track_listener(id);
        }
    }

    /// Attach a plain directive to `node`. It shares this compiler's
    /// template and scope.
    pub fn process_directive(
        &self,
        node: NodeId,
        definition: &Rc<DirectiveDefinition>,
    ) -> Result<()> {
        let app = self.template.app();
        let outputs = Rc::new(OutputTable::new());
        let ctx = DirectiveContext::new(Rc::clone(&self.template), node, Rc::clone(&outputs));

        let overrides = ServiceOverrides::new()
            .with(ServiceDescriptor::instance(HostElement(node)))
            .with(ServiceDescriptor::shared(Rc::clone(&self.template)));
        let instance = Rc::new(RefCell::new(
            definition.instantiate(&app.injector().resolver(&overrides))?,
        ));

        let initial = {
            let instance = Rc::downgrade(&instance);
            let ctx = ctx.clone();
            self.bind_inputs(node, definition, move |name| {
                let instance = instance.clone();
                let ctx = ctx.clone();
                let name = name.to_string();
                let setter: Setter = Rc::new(move |value: &Value| match instance.upgrade() {
                    Some(instance) => instance.borrow_mut().on_input(&name, value, &ctx),
                    None => Ok(()),
                });
                setter
            })?
        };
        self.bind_outputs(node, definition, &outputs)?;

        let attached = AttachedDirective {
            definition: Rc::clone(definition),
            instance: Rc::clone(&instance),
            element: node,
            outputs,
        };
        self.bind_host(&self.template, &attached, &ctx);
        self.template.attach_directive(attached);

        for (name, value, _) in &initial {
            instance.borrow_mut().on_input(name, value, &ctx)?;
        }
        instance.borrow_mut().on_init(&ctx)?;

        debug!(directive = definition.class_name, element = node.0, "directive attached");
        Ok(())
    }

    /// Instantiate the component matched on `node` in a new child template,
    /// then replace the host's children with its compiled view.
    pub fn process_component(
        &self,
        node: NodeId,
        definition: &Rc<DirectiveDefinition>,
    ) -> Result<Rc<Template>> {
        let app = self.template.app();
        let Some(component) = &definition.component else {
            return Err(DefinitionError::MissingTemplate {
                class: definition.class_name.to_string(),
            }
            .into());
        };

        let child = Template::new(
            Rc::clone(app),
            Some(&self.template),
            TemplateOptions {
                kind: TemplateKind::Component,
                name: definition.class_name.to_string(),
                element: Some(node),
                strategy: component.strategy,
                directive_types: component.directives.clone(),
                controller_as: component.controller_as.clone(),
            },
        );
        for filter in &component.filters {
            child.register_filter(filter.clone());
        }
        for (locale, tree) in &component.translations {
            child.register_translations(locale, tree.clone());
        }

        let initial = {
            let target = Rc::downgrade(&child);
            self.bind_inputs(node, definition, move |name| {
                let target = target.clone();
                let name = name.to_string();
                let setter: Setter = Rc::new(move |value: &Value| match target.upgrade() {
                    Some(target) => target.set_input(&name, value.clone()),
                    None => Ok(()),
                });
                setter
            })?
        };
        for (name, value, watch) in &initial {
            child.set_input(name, value.clone())?;
            if let Some(id) = watch {
                child.track_parent_watch(*id);
            }
        }
        self.bind_outputs(node, definition, child.outputs())?;

        let mut overrides = ServiceOverrides::new()
            .with(ServiceDescriptor::instance(HostElement(node)))
            .with(ServiceDescriptor::shared(Rc::clone(&child)));
        app.extensions()
            .do_update_component_services(&child, node, &mut overrides)?;
        let instance = Rc::new(RefCell::new(
            definition.instantiate(&app.injector().resolver(&overrides))?,
        ));

        let ctx = DirectiveContext::new(Rc::clone(&child), node, Rc::clone(child.outputs()));
        let attached = AttachedDirective {
            definition: Rc::clone(definition),
            instance: Rc::clone(&instance),
            element: node,
            outputs: Rc::clone(child.outputs()),
        };
        self.bind_host(&child, &attached, &ctx);
        child.attach_component(attached);

        for (name, value, _) in &initial {
            instance.borrow_mut().on_input(name, value, &ctx)?;
        }
        instance.borrow_mut().on_init(&ctx)?;

        let dom = app.dom();
        dom.clear_children(node);
        let nodes = parse_fragment(&**dom, node, &component.template)?;
        TemplateCompiler::new(&child)?.compile_nodes(&nodes)?;

        debug!(component = %child.name(), element = node.0, "component compiled");
        Ok(child)
    }
}

/// Class attribute text for a wholesale `[class]` binding
fn class_list(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .borrow()
            .iter()
            .map(Value::render_text)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(entries) => entries
            .borrow()
            .iter()
            .filter(|(_, on)| on.is_truthy())
            .map(|(class, _)| class.clone())
            .collect::<Vec<_>>()
            .join(" "),
        other => other.render_text(),
    }
}
