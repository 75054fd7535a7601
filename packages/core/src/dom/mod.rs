//! DOM capability set consumed by the template compiler

pub mod markup;
mod memory;

pub use markup::parse_fragment;
pub use memory::MemoryDom;

use crate::error::EvalResult;
use crate::expression::Value;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    /// Detached container (document root or template host)
    Fragment,
}

/// Event delivered to listeners
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub name: String,
    pub target: NodeId,
    pub detail: Value,
}

pub type EventHandler = Rc<dyn Fn(&DomEvent) -> EvalResult<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) usize);

/// Element creation, mutation, traversal and event plumbing.
///
/// Methods take `&self`; implementations use interior mutability so listeners
/// can mutate the tree while an event is being dispatched.
pub trait Dom {
    fn create_element(&self, tag: &str) -> NodeId;
    fn create_text(&self, text: &str) -> NodeId;
    fn create_fragment(&self) -> NodeId;

    fn append_child(&self, parent: NodeId, child: NodeId);
    fn remove_child(&self, parent: NodeId, child: NodeId);
    fn clear_children(&self, node: NodeId) {
        for child in self.children(node) {
            self.remove_child(node, child);
        }
    }
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn node_kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Lowercase tag name, `None` for non-elements
    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&self, node: NodeId, name: &str);
    /// Attributes in document order
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    fn property(&self, node: NodeId, name: &str) -> Option<Value>;
    fn set_property(&self, node: NodeId, name: &str, value: Value);

    fn has_class(&self, node: NodeId, class: &str) -> bool;
    fn add_class(&self, node: NodeId, class: &str);
    fn remove_class(&self, node: NodeId, class: &str);

    fn style(&self, node: NodeId, name: &str) -> Option<String>;
    /// `None` removes the declaration
    fn set_style(&self, node: NodeId, name: &str, value: Option<&str>);

    /// Text of a text node, or the concatenated text of an element's subtree
    fn text(&self, node: NodeId) -> String;
    fn set_text(&self, node: NodeId, text: &str);

    fn add_event_listener(&self, node: NodeId, event: &str, handler: EventHandler)
        -> ListenerId;
    fn remove_event_listener(&self, id: ListenerId) -> bool;
    /// Listeners currently attached to `node`
    fn listener_count(&self, node: NodeId) -> usize;
    /// Invoke every listener for `event` on `node`; returns how many ran
    fn dispatch_event(&self, node: NodeId, event: &str, detail: Value) -> EvalResult<usize>;

    /// All descendants of `node` in document order
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        out
    }
}
