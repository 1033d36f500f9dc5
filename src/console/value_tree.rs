// tui-devconsole/src/console/value_tree.rs
use serde_json::Value;

use super::{NodeRole, RenderNode};

const CHILD_INDENT: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    Object,
    Array,
}

impl CompositeKind {
    pub fn placeholder(self) -> &'static str {
        match self {
            CompositeKind::Object => "{...}",
            CompositeKind::Array => "[...]",
        }
    }
}

/// A composite value whose children are only built the first time it is
/// expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    kind: CompositeKind,
    source: Option<Value>,
    expanded: bool,
    children: Option<Vec<(String, ValueNode)>>,
}

impl Composite {
    pub fn kind(&self) -> CompositeKind {
        self.kind
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// `None` until the first expansion.
    pub fn children(&self) -> Option<&[(String, ValueNode)]> {
        self.children.as_deref()
    }

    fn build_children(&mut self) {
        if self.children.is_some() {
            return;
        }
        let children = match self.source.take() {
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(key, value)| (key, ValueNode::from_value(value)))
                .collect(),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(idx, value)| (idx.to_string(), ValueNode::from_value(value)))
                .collect(),
            _ => Vec::new(),
        };
        self.children = Some(children);
    }
}

/// Evaluation result as a lazily expanded tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode {
    Primitive(String),
    Composite(Composite),
}

impl ValueNode {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => Self::composite(CompositeKind::Object, value),
            Value::Array(_) => Self::composite(CompositeKind::Array, value),
            Value::String(text) => ValueNode::Primitive(text),
            other => ValueNode::Primitive(other.to_string()),
        }
    }

    fn composite(kind: CompositeKind, source: Value) -> Self {
        ValueNode::Composite(Composite {
            kind,
            source: Some(source),
            expanded: false,
            children: None,
        })
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, ValueNode::Composite(_))
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&ValueNode> {
        match path.split_first() {
            None => Some(self),
            Some((&idx, rest)) => match self {
                ValueNode::Composite(composite) => composite
                    .children
                    .as_ref()?
                    .get(idx)
                    .and_then(|(_, child)| child.node_at(rest)),
                ValueNode::Primitive(_) => None,
            },
        }
    }

    /// Flips the expanded flag of the composite at `path`, building its
    /// children on first expansion. Returns false if `path` does not lead
    /// to a composite.
    pub fn toggle(&mut self, path: &[usize]) -> bool {
        let ValueNode::Composite(composite) = self else {
            return false;
        };
        match path.split_first() {
            None => {
                composite.expanded = !composite.expanded;
                if composite.expanded {
                    composite.build_children();
                }
                true
            }
            Some((&idx, rest)) => composite
                .children
                .as_mut()
                .and_then(|children| children.get_mut(idx))
                .is_some_and(|(_, child)| child.toggle(rest)),
        }
    }

    pub fn render(&self) -> RenderNode {
        let mut path = Vec::new();
        RenderNode::block(0, self.render_at(&mut path, 0))
    }

    fn render_at(&self, path: &mut Vec<usize>, indent: u16) -> Vec<RenderNode> {
        match self {
            ValueNode::Primitive(text) => vec![RenderNode::labeled(NodeRole::Result, text.clone())],
            ValueNode::Composite(composite) => {
                let mut nodes = vec![RenderNode::labeled(
                    NodeRole::Toggle {
                        path: path.clone(),
                        expanded: composite.expanded,
                    },
                    composite.kind.placeholder(),
                )];
                if !composite.expanded {
                    return nodes;
                }
                let child_indent = indent + CHILD_INDENT;
                for (idx, (key, child)) in composite.children().unwrap_or_default().iter().enumerate() {
                    path.push(idx);
                    let mut line = vec![RenderNode::labeled(NodeRole::Key, format!("{key}: "))];
                    line.extend(child.render_at(path, child_indent));
                    nodes.push(RenderNode::block(child_indent, line));
                    path.pop();
                }
                nodes
            }
        }
    }
}
