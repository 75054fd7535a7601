use super::{Dom, DomEvent, EventHandler, ListenerId, NodeId, NodeKind};
use crate::error::EvalResult;
use crate::expression::Value;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};

/// Elements with no content and no closing tag
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    tag: Option<String>,
    text: String,
    attributes: IndexMap<String, String>,
    properties: IndexMap<String, Value>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        NodeData {
            kind,
            tag: None,
            text: String::new(),
            attributes: IndexMap::new(),
            properties: IndexMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }
}

struct ListenerEntry {
    id: ListenerId,
    node: NodeId,
    event: String,
    handler: EventHandler,
}

/// In-memory arena DOM with HTML serialization
#[derive(Default)]
pub struct MemoryDom {
    nodes: RefCell<Vec<NodeData>>,
    listeners: RefCell<Vec<ListenerEntry>>,
    next_listener: Cell<usize>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, data: NodeData) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(data);
        NodeId(nodes.len() - 1)
    }

    fn with_node<R>(&self, node: NodeId, f: impl FnOnce(&NodeData) -> R) -> Option<R> {
        self.nodes.borrow().get(node.0).map(f)
    }

    fn with_node_mut<R>(&self, node: NodeId, f: impl FnOnce(&mut NodeData) -> R) -> Option<R> {
        self.nodes.borrow_mut().get_mut(node.0).map(f)
    }

    /// Total number of attached listeners in the document
    pub fn total_listeners(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Serialize the children of `node` (or the node itself for elements/text)
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        match self.node_kind(node) {
            Some(NodeKind::Fragment) => {
                for child in self.children(node) {
                    self.write_html(child, &mut out);
                }
            }
            Some(_) => self.write_html(node, &mut out),
            None => {}
        }
        out
    }

    /// Serialize only the content of `node`
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some((kind, tag, text, attributes)) = self.with_node(node, |n| {
            (n.kind, n.tag.clone(), n.text.clone(), n.attributes.clone())
        }) else {
            return;
        };

        match kind {
            NodeKind::Text => out.push_str(&escape_text(&text)),
            NodeKind::Fragment => {
                for child in self.children(node) {
                    self.write_html(child, out);
                }
            }
            NodeKind::Element => {
                let tag = tag.unwrap_or_default();
                out.push('<');
                out.push_str(&tag);
                for (name, value) in &attributes {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_attribute(value));
                        out.push('"');
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in self.children(node) {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
        }
    }

    fn class_list(&self, node: NodeId) -> Vec<String> {
        self.attribute(node, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn write_class_list(&self, node: NodeId, classes: &[String]) {
        if classes.is_empty() {
            self.remove_attribute(node, "class");
        } else {
            self.set_attribute(node, "class", &classes.join(" "));
        }
    }

    fn style_declarations(&self, node: NodeId) -> IndexMap<String, String> {
        self.attribute(node, "style")
            .map(|style| {
                style
                    .split(';')
                    .filter_map(|decl| {
                        let (name, value) = decl.split_once(':')?;
                        Some((name.trim().to_string(), value.trim().to_string()))
                    })
                    .filter(|(name, _)| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

impl Dom for MemoryDom {
    fn create_element(&self, tag: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Element);
        data.tag = Some(tag.to_ascii_lowercase());
        self.push(data)
    }

    fn create_text(&self, text: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Text);
        data.text = text.to_string();
        self.push(data)
    }

    fn create_fragment(&self) -> NodeId {
        self.push(NodeData::new(NodeKind::Fragment))
    }

    fn append_child(&self, parent: NodeId, child: NodeId) {
        if let Some(old_parent) = self.parent(child) {
            self.remove_child(old_parent, child);
        }
        if self.with_node_mut(parent, |p| p.children.push(child)).is_some() {
            self.with_node_mut(child, |c| c.parent = Some(parent));
        }
    }

    fn remove_child(&self, parent: NodeId, child: NodeId) {
        let removed = self
            .with_node_mut(parent, |p| {
                let before = p.children.len();
                p.children.retain(|c| *c != child);
                p.children.len() != before
            })
            .unwrap_or(false);
        if removed {
            self.with_node_mut(child, |c| c.parent = None);
        }
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.with_node(node, |n| n.children.clone()).unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.with_node(node, |n| n.parent).flatten()
    }

    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.with_node(node, |n| n.kind)
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.with_node(node, |n| n.tag.clone()).flatten()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.with_node(node, |n| n.attributes.get(name).cloned())
            .flatten()
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        self.with_node_mut(node, |n| {
            n.attributes.insert(name.to_string(), value.to_string())
        });
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        self.with_node_mut(node, |n| n.attributes.shift_remove(name));
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.with_node(node, |n| {
            n.attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default()
    }

    fn property(&self, node: NodeId, name: &str) -> Option<Value> {
        self.with_node(node, |n| n.properties.get(name).cloned())
            .flatten()
    }

    fn set_property(&self, node: NodeId, name: &str, value: Value) {
        self.with_node_mut(node, |n| n.properties.insert(name.to_string(), value));
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.class_list(node).iter().any(|c| c == class)
    }

    fn add_class(&self, node: NodeId, class: &str) {
        let mut classes = self.class_list(node);
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
            self.write_class_list(node, &classes);
        }
    }

    fn remove_class(&self, node: NodeId, class: &str) {
        let mut classes = self.class_list(node);
        let before = classes.len();
        classes.retain(|c| c != class);
        if classes.len() != before {
            self.write_class_list(node, &classes);
        }
    }

    fn style(&self, node: NodeId, name: &str) -> Option<String> {
        self.style_declarations(node).get(name).cloned()
    }

    fn set_style(&self, node: NodeId, name: &str, value: Option<&str>) {
        let mut declarations = self.style_declarations(node);
        match value {
            Some(value) => {
                declarations.insert(name.to_string(), value.to_string());
            }
            None => {
                declarations.shift_remove(name);
            }
        }
        if declarations.is_empty() {
            self.remove_attribute(node, "style");
        } else {
            let style = declarations
                .iter()
                .map(|(k, v)| format!("{}: {};", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            self.set_attribute(node, "style", &style);
        }
    }

    fn text(&self, node: NodeId) -> String {
        match self.node_kind(node) {
            Some(NodeKind::Text) => self.with_node(node, |n| n.text.clone()).unwrap_or_default(),
            Some(_) => self
                .children(node)
                .into_iter()
                .map(|child| self.text(child))
                .collect(),
            None => String::new(),
        }
    }

    fn set_text(&self, node: NodeId, text: &str) {
        match self.node_kind(node) {
            Some(NodeKind::Text) => {
                self.with_node_mut(node, |n| n.text = text.to_string());
            }
            Some(_) => {
                self.clear_children(node);
                let child = self.create_text(text);
                self.append_child(node, child);
            }
            None => {}
        }
    }

    fn add_event_listener(&self, node: NodeId, event: &str, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push(ListenerEntry {
            id,
            node,
            event: event.to_string(),
            handler,
        });
        id
    }

    fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    fn listener_count(&self, node: NodeId) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|l| l.node == node)
            .count()
    }

    fn dispatch_event(&self, node: NodeId, event: &str, detail: Value) -> EvalResult<usize> {
        let handlers: Vec<EventHandler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.node == node && l.event == event)
            .map(|l| l.handler.clone())
            .collect();

        let dom_event = DomEvent {
            name: event.to_string(),
            target: node,
            detail,
        };
        for handler in &handlers {
            handler(&dom_event)?;
        }
        Ok(handlers.len())
    }
}

impl std::fmt::Debug for MemoryDom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDom")
            .field("nodes", &self.nodes.borrow().len())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}
