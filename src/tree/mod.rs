//! Rendered tree model
//!
//! A rendered instance is a tree of [`Node`] records. Each node has a type
//! tag, a sorted property map and ordered children. Property values are
//! tagged ([`Value`]) and may hold callables ([`Handler`]) for event wiring.
//!
//! - [`query`]: immutable tree snapshots and node lookup
//! - [`serialize`]: canonical, line-oriented serialization

pub mod query;
pub mod serialize;

pub use query::{NodePath, NodeRef, RenderedTree};
pub use serialize::to_canonical;

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::constants::tree::{TEXT_PROP, TEXT_TAG};

/// Tagged property value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Callable bound to an event (`onClick`, `onInput`, ...)
    Handler(Handler),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            Value::Handler(h) => Some(h),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Handler> for Value {
    fn from(h: Handler) -> Self {
        Value::Handler(h)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float))
                .unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Event handler stored as a property value
///
/// Equality is identity: two handlers are equal only if they are the same
/// closure.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&Event)>);

impl Handler {
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the handler directly.
    ///
    /// Outside [`crate::Harness::act`] this leaves any resulting updates
    /// queued; the next settled read reports them as unsettled.
    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler([Function])")
    }
}

/// Sorted property (or state) map
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Props(BTreeMap<String, Value>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String property, `None` if absent or not a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` onto `self`: fields in `other` win, all others are kept.
    pub fn merge(&mut self, other: Props) {
        self.0.extend(other.0);
    }
}

impl FromIterator<(String, Value)> for Props {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Simulated user event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: String,
    payload: serde_json::Value,
    /// Node the event was fired on
    target: Option<NodePath>,
    /// Node whose handler is running (differs from `target` while bubbling)
    current_target: Option<NodePath>,
}

impl Event {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            target: None,
            current_target: None,
        }
    }

    pub fn click() -> Self {
        Self::new("click", serde_json::Value::Null)
    }

    /// Input event carrying the new field value
    pub fn input(value: impl Into<String>) -> Self {
        let value: String = value.into();
        Self::new("input", serde_json::json!({ "value": value }))
    }

    pub fn submit() -> Self {
        Self::new("submit", serde_json::Value::Null)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// `payload.value` as a string (input events)
    pub fn value(&self) -> Option<&str> {
        self.payload.get("value").and_then(serde_json::Value::as_str)
    }

    pub fn target(&self) -> Option<&NodePath> {
        self.target.as_ref()
    }

    pub fn current_target(&self) -> Option<&NodePath> {
        self.current_target.as_ref()
    }

    pub(crate) fn routed(mut self, target: NodePath, current: NodePath) -> Self {
        self.target = Some(target);
        self.current_target = Some(current);
        self
    }
}

/// Property name a handler for `kind` is bound under (`click` -> `onClick`)
pub fn handler_prop(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_uppercase(), chars.as_str()),
        None => "on".to_string(),
    }
}

/// A rendered node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    tag: String,
    props: Props,
    children: Vec<Node>,
}

impl Node {
    /// Element node with no props or children
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    /// Text node
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            tag: TEXT_TAG.to_string(),
            props: Props::new().with(TEXT_PROP, Value::Str(content.into())),
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key, value);
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Append a text child
    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.child(Node::text(content))
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn is_text(&self) -> bool {
        self.tag == TEXT_TAG
    }

    /// Content of a text node, `None` for elements
    pub fn as_text(&self) -> Option<&str> {
        if self.is_text() {
            self.props.get_str(TEXT_PROP)
        } else {
            None
        }
    }

    /// Concatenated text of this node and all descendants, in document order
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = self.as_text() {
            out.push_str(text);
            return;
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_prop_name() {
        assert_eq!(handler_prop("click"), "onClick");
        assert_eq!(handler_prop("input"), "onInput");
        assert_eq!(handler_prop(""), "on");
    }

    #[test]
    fn test_text_content_concatenates_in_order() {
        let node = Node::element("ul")
            .child(Node::element("li").with_text("John Doe"))
            .child(Node::element("li").with_text("Kevin Mitnick"));
        assert_eq!(node.text_content(), "John DoeKevin Mitnick");
    }

    #[test]
    fn test_props_merge_last_writer_wins() {
        let mut state = Props::new().with("a", 1).with("b", "x");
        state.merge(Props::new().with("b", "y").with("c", true));
        assert_eq!(state.get_int("a"), Some(1));
        assert_eq!(state.get_str("b"), Some("y"));
        assert_eq!(state.get("c"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_value_from_json() {
        let value = Value::from(serde_json::json!([{ "name": "John Doe", "age": 42 }]));
        let first = &value.as_list().unwrap()[0];
        let map = first.as_map().unwrap();
        assert_eq!(map["name"], Value::Str("John Doe".into()));
        assert_eq!(map["age"], Value::Int(42));
    }

    #[test]
    fn test_handler_equality_is_identity() {
        let h = Handler::new(|_| {});
        let same = h.clone();
        let other = Handler::new(|_| {});
        assert_eq!(h, same);
        assert_ne!(h, other);
    }

    #[test]
    fn test_input_event_value() {
        let event = Event::input("hello");
        assert_eq!(event.kind(), "input");
        assert_eq!(event.value(), Some("hello"));
    }
}
