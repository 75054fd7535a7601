/**
 * Template Test Utilities
 *
 * Application fixture over a MemoryDom, an injected event log, and the
 * directive and component classes shared by the template tests
 */
use std::cell::RefCell;
use std::rc::Rc;
use trellis_core::change_detection::ChangeDetectionStrategy;
use trellis_core::di::{DiError, Injectable, Injector, Resolver, ServiceDescriptor, ServiceOverrides};
use trellis_core::dom::{Dom, DomEvent, MemoryDom, NodeId};
use trellis_core::extensions::Extension;
use trellis_core::metadata::{Annotation, ComponentAnnotation, DirectiveClass, DirectiveType};
use trellis_core::template::{
    Application, ApplicationBuilder, Directive, DirectiveContext, FilterRegistration, HostElement,
    Template,
};
use trellis_core::{EvalResult, Value};

/// Lifecycle calls recorded by the test directives, shared through the injector
#[derive(Debug, Default)]
pub struct EventLog {
    entries: RefCell<Vec<String>>,
}

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries.borrow().iter().filter(|e| *e == entry).count()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

pub struct Fixture {
    pub dom: Rc<MemoryDom>,
    pub app: Application,
    pub log: Rc<EventLog>,
}

pub fn fixture() -> Fixture {
    fixture_with(|builder| builder)
}

pub fn fixture_with(configure: impl FnOnce(ApplicationBuilder) -> ApplicationBuilder) -> Fixture {
    let dom = Rc::new(MemoryDom::new());
    let log = Rc::new(EventLog::default());
    let injector = Rc::new(Injector::new());
    injector.provide(ServiceDescriptor::shared(Rc::clone(&log)));

    let builder = Application::builder(dom.clone()).injector(injector);
    let app = configure(builder).build().expect("application builds");
    Fixture { dom, app, log }
}

impl Fixture {
    /// Compile `markup` into a fresh `<main>` host
    pub fn render(&self, markup: &str) -> (NodeId, Rc<Template>) {
        let host = self.dom.create_element("main");
        let template = self
            .app
            .compile_fragment(host, markup)
            .unwrap_or_else(|e| panic!("failed to compile [{}]: {}", markup, e));
        (host, template)
    }

    pub fn html(&self, node: NodeId) -> String {
        self.dom.inner_html(node)
    }

    /// First descendant of `root` with tag `tag`
    pub fn find(&self, root: NodeId, tag: &str) -> NodeId {
        self.find_all(root, tag)
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("no <{}> under {:?}", tag, root))
    }

    pub fn find_all(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.dom
            .descendants(root)
            .into_iter()
            .filter(|node| self.dom.tag_name(*node).as_deref() == Some(tag))
            .collect()
    }

    pub fn set(&self, name: &str, value: Value) {
        self.app.scope().set(name, value);
    }

    pub fn tick(&self) -> usize {
        self.app.tick().expect("sweep succeeds")
    }

    pub fn click(&self, node: NodeId) -> usize {
        self.dom
            .dispatch_event(node, "click", Value::Null)
            .expect("click handlers succeed")
    }
}

/// Scope function appending its first argument to `sink`
pub fn recorder(sink: &Rc<RefCell<Vec<Value>>>) -> Value {
    let sink = Rc::clone(sink);
    Value::function("record", move |args| {
        sink.borrow_mut()
            .push(args.first().cloned().unwrap_or_default());
        Ok(Value::Undefined)
    })
}

/// `[highlight]`: paints its host and logs every hook
pub struct Highlight {
    log: Rc<EventLog>,
    host: Rc<HostElement>,
}

impl Injectable for Highlight {
    fn create(resolver: &Resolver<'_>) -> Result<Self, DiError> {
        Ok(Highlight {
            log: resolver.get::<EventLog>()?,
            host: resolver.get::<HostElement>()?,
        })
    }
}

impl Directive for Highlight {
    fn on_input(&mut self, name: &str, value: &Value, ctx: &DirectiveContext) -> EvalResult<()> {
        let color = value.render_text();
        ctx.dom().set_style(self.host.0, "background", Some(color.as_str()));
        self.log.push(format!("highlight:{}={}", name, color));
        Ok(())
    }

    fn on_event(&mut self, method: &str, _event: &DomEvent, _ctx: &DirectiveContext) -> EvalResult<()> {
        self.log.push(format!("highlight:{}", method));
        Ok(())
    }

    fn on_init(&mut self, _ctx: &DirectiveContext) -> EvalResult<()> {
        self.log.push("highlight:init");
        Ok(())
    }

    fn on_destroy(&mut self, _ctx: &DirectiveContext) {
        self.log.push("highlight:destroy");
    }
}

impl DirectiveClass for Highlight {
    fn annotations() -> Vec<Annotation> {
        vec![
            Annotation::directive("[highlight]"),
            Annotation::input("highlight"),
            Annotation::host_listener("mouseenter", "enter"),
            Annotation::host_attribute("data-highlighted", "yes"),
        ]
    }
}

/// `[tracked]`: second attribute directive, logs its hooks
pub struct Tracker {
    log: Rc<EventLog>,
}

impl Injectable for Tracker {
    fn create(resolver: &Resolver<'_>) -> Result<Self, DiError> {
        Ok(Tracker {
            log: resolver.get::<EventLog>()?,
        })
    }
}

impl Directive for Tracker {
    fn on_input(&mut self, name: &str, value: &Value, _ctx: &DirectiveContext) -> EvalResult<()> {
        self.log
            .push(format!("tracker:{}={}", name, value.render_text()));
        Ok(())
    }

    fn on_init(&mut self, _ctx: &DirectiveContext) -> EvalResult<()> {
        self.log.push("tracker:init");
        Ok(())
    }
}

impl DirectiveClass for Tracker {
    fn annotations() -> Vec<Annotation> {
        vec![Annotation::directive("[tracked]"), Annotation::input("tracked")]
    }
}

/// `<x-counter label="..." [start]="...">`: counts clicks, emits `changed`
pub struct Counter {
    log: Rc<EventLog>,
}

impl Injectable for Counter {
    fn create(resolver: &Resolver<'_>) -> Result<Self, DiError> {
        Ok(Counter {
            log: resolver.get::<EventLog>()?,
        })
    }
}

impl Directive for Counter {
    fn on_input(&mut self, name: &str, value: &Value, _ctx: &DirectiveContext) -> EvalResult<()> {
        self.log
            .push(format!("counter:{}={}", name, value.render_text()));
        Ok(())
    }

    fn on_init(&mut self, ctx: &DirectiveContext) -> EvalResult<()> {
        let scope = ctx.scope();
        let start = scope.get_own("start").map_or(0.0, |v| v.to_number());
        scope.set("count", Value::from(start));

        let weak_scope = Rc::downgrade(scope);
        let weak_template = Rc::downgrade(ctx.template());
        scope.set(
            "increment",
            Value::function("increment", move |_args| {
                let (Some(scope), Some(template)) = (weak_scope.upgrade(), weak_template.upgrade())
                else {
                    return Ok(Value::Undefined);
                };
                let next = scope.get("count").map_or(0.0, |v| v.to_number()) + 1.0;
                scope.set("count", Value::from(next));
                template.emit("changed", Value::from(next))?;
                Ok(Value::Undefined)
            }),
        );
        self.log.push(format!("counter:init:{}", start));
        Ok(())
    }

    fn on_destroy(&mut self, _ctx: &DirectiveContext) {
        self.log.push("counter:destroy");
    }
}

impl DirectiveClass for Counter {
    fn annotations() -> Vec<Annotation> {
        vec![
            Annotation::Component(ComponentAnnotation::new(
                "x-counter",
                "<span>{{ label }}: {{ count }}</span><button (click)=\"increment()\">+</button>",
            )),
            Annotation::input("label"),
            Annotation::input("[start]"),
            Annotation::output("changed"),
        ]
    }
}

/// Second component claiming `x-counter`
pub struct Rival;

impl Injectable for Rival {
    fn create(_resolver: &Resolver<'_>) -> Result<Self, DiError> {
        Ok(Rival)
    }
}

impl Directive for Rival {}

impl DirectiveClass for Rival {
    fn annotations() -> Vec<Annotation> {
        vec![Annotation::Component(ComponentAnnotation::new("x-counter", "rival"))]
    }
}

/// `<x-panel [title]>`: publishes inputs under the `panel` alias
pub struct Panel;

impl Injectable for Panel {
    fn create(_resolver: &Resolver<'_>) -> Result<Self, DiError> {
        Ok(Panel)
    }
}

impl Directive for Panel {}

impl DirectiveClass for Panel {
    fn annotations() -> Vec<Annotation> {
        vec![
            Annotation::Component(
                ComponentAnnotation::new("x-panel", "<h3>{{ panel.title }}</h3>")
                    .controller_as("panel"),
            ),
            Annotation::input("[title]"),
        ]
    }
}

/// `<x-badge [value]>`: checked only on request
pub struct Badge;

impl Injectable for Badge {
    fn create(_resolver: &Resolver<'_>) -> Result<Self, DiError> {
        Ok(Badge)
    }
}

impl Directive for Badge {}

impl DirectiveClass for Badge {
    fn annotations() -> Vec<Annotation> {
        vec![
            Annotation::Component(
                ComponentAnnotation::new("x-badge", "<b>{{ value }}</b>")
                    .strategy(ChangeDetectionStrategy::Manual),
            ),
            Annotation::input("[value]"),
        ]
    }
}

/// `<x-shout>`: registers its own `upper` filter
pub struct Shouter;

impl Injectable for Shouter {
    fn create(_resolver: &Resolver<'_>) -> Result<Self, DiError> {
        Ok(Shouter)
    }
}

impl Directive for Shouter {}

impl DirectiveClass for Shouter {
    fn annotations() -> Vec<Annotation> {
        vec![Annotation::Component(
            ComponentAnnotation::new("x-shout", "<i>{{ 'x' | upper }}</i>").filter(
                FilterRegistration::new("upper", |input, _| {
                    Ok(Value::from(format!("{}!", input.render_text().to_uppercase())))
                }),
            ),
        )]
    }
}

/// `[needs-value]` with a required `value` input
pub struct NeedsValue;

impl Injectable for NeedsValue {
    fn create(_resolver: &Resolver<'_>) -> Result<Self, DiError> {
        Ok(NeedsValue)
    }
}

impl Directive for NeedsValue {}

impl DirectiveClass for NeedsValue {
    fn annotations() -> Vec<Annotation> {
        vec![
            Annotation::directive("[needs-value]"),
            Annotation::input("value"),
            Annotation::required("value"),
        ]
    }
}

/// Service supplied per component by [`LabelExtension`]
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentLabel(pub String);

/// `<x-labelled>`: only constructible with a [`ComponentLabel`]
pub struct Labelled {
    label: Rc<ComponentLabel>,
}

impl Injectable for Labelled {
    fn create(resolver: &Resolver<'_>) -> Result<Self, DiError> {
        Ok(Labelled {
            label: resolver.get::<ComponentLabel>()?,
        })
    }
}

impl Directive for Labelled {
    fn on_init(&mut self, ctx: &DirectiveContext) -> EvalResult<()> {
        ctx.scope().set("label", Value::from(self.label.0.as_str()));
        Ok(())
    }
}

impl DirectiveClass for Labelled {
    fn annotations() -> Vec<Annotation> {
        vec![Annotation::Component(ComponentAnnotation::new(
            "x-labelled",
            "<em>{{ label | exclaim }}</em>",
        ))]
    }
}

/// Contributes `exclaim`, the `x-labelled` component and its label service
pub struct LabelExtension;

impl Extension for LabelExtension {
    fn name(&self) -> &str {
        "labels"
    }

    fn filters(&self) -> Vec<FilterRegistration> {
        vec![FilterRegistration::new("exclaim", |input, _| {
            Ok(Value::from(format!("{}!", input.render_text())))
        })]
    }

    fn directives(&self) -> Vec<DirectiveType> {
        vec![DirectiveType::of::<Labelled>()]
    }

    fn do_update_component_services(
        &self,
        template: &Rc<Template>,
        _element: NodeId,
        services: &mut ServiceOverrides,
    ) -> Result<(), DiError> {
        services.push(ServiceDescriptor::instance(ComponentLabel(
            template.name().to_string(),
        )));
        Ok(())
    }
}

/// `upper` and `substr : start : length`
pub fn text_filters(builder: ApplicationBuilder) -> ApplicationBuilder {
    builder
        .filter(FilterRegistration::new("upper", |input, _| {
            Ok(Value::from(input.render_text().to_uppercase()))
        }))
        .filter(FilterRegistration::new("substr", |input, args| {
            let start = args.first().map_or(0.0, Value::to_number) as usize;
            let length = args.get(1).map_or(f64::INFINITY, Value::to_number);
            let text: String = input
                .render_text()
                .chars()
                .skip(start)
                .take(if length.is_finite() { length as usize } else { usize::MAX })
                .collect();
            Ok(Value::from(text))
        }))
}
