//! JSON interchange for document trees.
//!
//! Every node is an object `{type, attrs?, content?, text?, marks?}` with
//! camelCase type names; the root is `{"type": "document", "content": [...]}`.
//! Marks are objects `{type, attrs?}` listed outermost first.
//!
//! Trees arriving over this boundary are validated while they are converted
//! and shape violations are reported as [`FormatError::MalformedTree`] with
//! the path of the offending node (`document.content[2].content[0]`). Unknown
//! node types are carried as [`NodeKind::Unknown`]; unknown mark types are
//! dropped with a warning.
//!
//! Both directions walk the tree with an explicit stack.

use crate::error::FormatError;
use crate::ir::nodes::{normalize_time, Alignment, Document, Mark, Node, NodeKind, TaskState};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

impl Document {
    /// Parse and validate a JSON document tree.
    pub fn from_json(source: &str) -> Result<Self, FormatError> {
        let value: Value = serde_json::from_str(source)?;
        Self::from_value(value)
    }

    /// Validate and convert an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, FormatError> {
        let Value::Object(mut root) = value else {
            return Err(FormatError::malformed("document: expected an object"));
        };
        match root.remove("type") {
            Some(Value::String(type_name)) if type_name == "document" => {}
            Some(Value::String(type_name)) => {
                return Err(FormatError::malformed(format!(
                    "document: root type is \"{type_name}\", expected \"document\""
                )));
            }
            _ => return Err(FormatError::malformed("document: missing \"type\"")),
        }
        let content = content_array(root.remove("content"), &"document")?;
        Ok(Document::new(nodes_from_values(content, "document")?))
    }

    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("type".into(), Value::String("document".into()));
        object.insert("content".into(), Value::Array(values_from_nodes(&self.content)));
        Value::Object(object)
    }

    pub fn to_json_pretty(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }
}

impl Node {
    pub fn to_value(&self) -> Value {
        values_from_nodes(std::slice::from_ref(self))
            .pop()
            .unwrap_or(Value::Null)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Document::from_value(value).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// JSON → tree
// ---------------------------------------------------------------------------

/// A node whose children are still being converted.
struct Pending {
    kind: NodeKind,
    marks: Vec<Mark>,
    children: std::iter::Enumerate<std::vec::IntoIter<Value>>,
    done: Vec<Node>,
    /// Position of this node in its parent's content
    index: usize,
}

/// Location of the node being converted. Only rendered for error messages,
/// so deep trees do not carry a path string per level.
struct NodePath<'a> {
    root: &'a str,
    stack: &'a [Pending],
    index: usize,
}

impl fmt::Display for NodePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root)?;
        for frame in self.stack {
            write!(f, ".content[{}]", frame.index)?;
        }
        write!(f, ".content[{}]", self.index)
    }
}

fn nodes_from_values(values: Vec<Value>, root: &str) -> Result<Vec<Node>, FormatError> {
    let mut roots = Vec::new();
    let mut stack: Vec<Pending> = Vec::new();
    let mut top_level = values.into_iter().enumerate();

    loop {
        let next = match stack.last_mut() {
            Some(frame) => frame.children.next(),
            None => top_level.next(),
        };

        match next {
            Some((index, value)) => {
                let path = NodePath {
                    root,
                    stack: &stack,
                    index,
                };
                let (kind, marks, content) = parse_node(value, &path)?;
                if content.is_empty() {
                    attach(&mut stack, &mut roots, Node { kind, content: Vec::new(), marks });
                } else {
                    stack.push(Pending {
                        kind,
                        marks,
                        children: content.into_iter().enumerate(),
                        done: Vec::new(),
                        index,
                    });
                }
            }
            None => match stack.pop() {
                Some(frame) => {
                    let node = Node {
                        kind: frame.kind,
                        content: frame.done,
                        marks: frame.marks,
                    };
                    attach(&mut stack, &mut roots, node);
                }
                None => return Ok(roots),
            },
        }
    }
}

fn attach(stack: &mut [Pending], roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.done.push(node),
        None => roots.push(node),
    }
}

/// Splits one node object into its kind, marks and unconverted children.
fn parse_node(
    value: Value,
    path: &dyn fmt::Display,
) -> Result<(NodeKind, Vec<Mark>, Vec<Value>), FormatError> {
    let Value::Object(mut object) = value else {
        return Err(FormatError::malformed(format!("{path}: expected an object")));
    };
    let type_name = match object.remove("type") {
        Some(Value::String(type_name)) => type_name,
        _ => return Err(FormatError::malformed(format!("{path}: missing \"type\""))),
    };
    let attrs = match object.remove("attrs") {
        Some(Value::Object(attrs)) => attrs,
        None | Some(Value::Null) => Map::new(),
        Some(_) => {
            return Err(FormatError::malformed(format!(
                "{path}: \"attrs\" must be an object"
            )))
        }
    };
    let content = content_array(object.remove("content"), path)?;
    let marks = match object.remove("marks") {
        Some(Value::Array(marks)) => parse_marks(marks, path)?,
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            return Err(FormatError::malformed(format!(
                "{path}: \"marks\" must be an array"
            )))
        }
    };

    let kind = parse_kind(type_name, attrs, object.remove("text"), path)?;
    if (kind.is_atomic() || matches!(kind, NodeKind::Text(_))) && !content.is_empty() {
        return Err(FormatError::malformed(format!(
            "{path}: {} node cannot have content",
            kind.type_name()
        )));
    }
    Ok((kind, marks, content))
}

fn content_array(
    content: Option<Value>,
    path: &dyn fmt::Display,
) -> Result<Vec<Value>, FormatError> {
    match content {
        Some(Value::Array(content)) => Ok(content),
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(_) => Err(FormatError::malformed(format!(
            "{path}: \"content\" must be an array"
        ))),
    }
}

fn parse_kind(
    type_name: String,
    attrs: Map<String, Value>,
    text: Option<Value>,
    path: &dyn fmt::Display,
) -> Result<NodeKind, FormatError> {
    let kind = match type_name.as_str() {
        "paragraph" => NodeKind::Paragraph,
        "heading" => {
            let level = match attrs.get("level") {
                None | Some(Value::Null) => 1,
                Some(level) => level
                    .as_u64()
                    .filter(|level| (1..=6).contains(level))
                    .ok_or_else(|| {
                        FormatError::malformed(format!("{path}: heading level must be 1-6"))
                    })? as u8,
            };
            NodeKind::Heading { level }
        }
        "bulletList" => NodeKind::BulletList,
        "orderedList" => {
            let start = match attrs.get("start") {
                None | Some(Value::Null) => 1,
                Some(start) => start.as_u64().ok_or_else(|| {
                    FormatError::malformed(format!(
                        "{path}: list start must be a non-negative integer"
                    ))
                })?,
            };
            NodeKind::OrderedList { start }
        }
        "taskList" => NodeKind::TaskList,
        "listItem" => NodeKind::ListItem,
        "taskItem" => NodeKind::TaskItem {
            state: state_attr(&attrs, path)?,
        },
        "blockquote" => NodeKind::Blockquote,
        "codeBlock" => {
            let language = match attrs.get("language") {
                None | Some(Value::Null) => None,
                Some(Value::String(language)) => Some(language.clone()),
                Some(_) => {
                    return Err(FormatError::malformed(format!(
                        "{path}: code block language must be a string or null"
                    )))
                }
            };
            NodeKind::CodeBlock { language }
        }
        "table" => NodeKind::Table,
        "tableRow" => NodeKind::TableRow,
        "tableHeaderCell" => NodeKind::TableHeaderCell {
            align: align_attr(&attrs),
        },
        "tableDataCell" => NodeKind::TableDataCell {
            align: align_attr(&attrs),
        },
        "horizontalRule" => NodeKind::HorizontalRule,
        "hardBreak" => NodeKind::HardBreak,
        "text" => match text {
            Some(Value::String(text)) => NodeKind::Text(text),
            _ => {
                return Err(FormatError::malformed(format!(
                    "{path}: text node without a string \"text\""
                )))
            }
        },
        "image" => NodeKind::Image {
            src: required_string(&attrs, "src", path)?,
            alt: optional_string(&attrs, "alt").unwrap_or_default(),
            title: optional_string(&attrs, "title"),
        },
        "taskMarker" => NodeKind::TaskMarker {
            state: state_attr(&attrs, path)?,
        },
        "timestamp" => {
            let raw = required_string(&attrs, "time", path)?;
            let time = normalize_time(&raw).ok_or_else(|| {
                FormatError::malformed(format!("{path}: \"{raw}\" is not an HH:MM time"))
            })?;
            NodeKind::Timestamp { time }
        }
        "noteLink" => NodeKind::NoteLink {
            title: required_string(&attrs, "title", path)?,
            note_id: optional_string(&attrs, "noteId"),
        },
        "document" => {
            return Err(FormatError::malformed(format!(
                "{path}: document node below the root"
            )))
        }
        _ => NodeKind::Unknown { type_name, attrs },
    };
    Ok(kind)
}

fn state_attr(
    attrs: &Map<String, Value>,
    path: &dyn fmt::Display,
) -> Result<TaskState, FormatError> {
    let raw = required_string(attrs, "state", path)?;
    TaskState::from_keyword(&raw)
        .ok_or_else(|| FormatError::malformed(format!("{path}: unknown task state \"{raw}\"")))
}

fn align_attr(attrs: &Map<String, Value>) -> Alignment {
    attrs
        .get("align")
        .and_then(Value::as_str)
        .and_then(Alignment::from_name)
        .unwrap_or_default()
}

fn optional_string(attrs: &Map<String, Value>, key: &str) -> Option<String> {
    attrs.get(key).and_then(Value::as_str).map(str::to_string)
}

fn required_string(
    attrs: &Map<String, Value>,
    key: &str,
    path: &dyn fmt::Display,
) -> Result<String, FormatError> {
    optional_string(attrs, key)
        .ok_or_else(|| FormatError::malformed(format!("{path}: missing string attr \"{key}\"")))
}

fn parse_marks(values: Vec<Value>, path: &dyn fmt::Display) -> Result<Vec<Mark>, FormatError> {
    let mut marks = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        let Value::Object(object) = value else {
            return Err(FormatError::malformed(format!(
                "{path}.marks[{index}]: expected an object"
            )));
        };
        let Some(type_name) = object.get("type").and_then(Value::as_str) else {
            return Err(FormatError::malformed(format!(
                "{path}.marks[{index}]: missing \"type\""
            )));
        };
        let empty = Map::new();
        let attrs = object
            .get("attrs")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let mark = match type_name {
            "bold" => Mark::Bold,
            "italic" => Mark::Italic,
            "strike" => Mark::Strike,
            "code" => Mark::Code,
            "highlight" => Mark::Highlight,
            "link" => Mark::Link {
                href: required_string(attrs, "href", &format!("{path}.marks[{index}]"))?,
                title: optional_string(attrs, "title"),
            },
            other => {
                warn!("{path}: dropping unknown mark type \"{other}\"");
                continue;
            }
        };
        marks.push(mark);
    }
    Ok(marks)
}

// ---------------------------------------------------------------------------
// tree → JSON
// ---------------------------------------------------------------------------

fn values_from_nodes(nodes: &[Node]) -> Vec<Value> {
    struct Frame<'a> {
        node: Option<&'a Node>,
        children: std::slice::Iter<'a, Node>,
        done: Vec<Value>,
    }

    let mut stack = vec![Frame {
        node: None,
        children: nodes.iter(),
        done: Vec::new(),
    }];

    while let Some(top) = stack.last_mut() {
        if let Some(child) = top.children.next() {
            stack.push(Frame {
                node: Some(child),
                children: child.content.iter(),
                done: Vec::new(),
            });
            continue;
        }
        let Some(frame) = stack.pop() else {
            break;
        };
        match (frame.node, stack.last_mut()) {
            (Some(node), Some(parent)) => parent.done.push(node_value(node, frame.done)),
            _ => return frame.done,
        }
    }
    Vec::new()
}

fn node_value(node: &Node, content: Vec<Value>) -> Value {
    let mut object = Map::new();
    object.insert("type".into(), Value::String(node.kind.type_name().to_string()));
    let attrs = kind_attrs(&node.kind);
    if !attrs.is_empty() {
        object.insert("attrs".into(), Value::Object(attrs));
    }
    if let NodeKind::Text(text) = &node.kind {
        object.insert("text".into(), Value::String(text.clone()));
    }
    if !content.is_empty() {
        object.insert("content".into(), Value::Array(content));
    }
    if !node.marks.is_empty() {
        let marks = node.marks.iter().map(mark_value).collect();
        object.insert("marks".into(), Value::Array(marks));
    }
    Value::Object(object)
}

fn kind_attrs(kind: &NodeKind) -> Map<String, Value> {
    let mut attrs = Map::new();
    let mut put = |key: &str, value: Value| {
        attrs.insert(key.to_string(), value);
    };
    match kind {
        NodeKind::Heading { level } => put("level", Value::from(*level)),
        NodeKind::OrderedList { start } => put("start", Value::from(*start)),
        NodeKind::TaskItem { state } | NodeKind::TaskMarker { state } => {
            put("state", Value::from(state.as_str()))
        }
        NodeKind::CodeBlock { language } => {
            put("language", language.clone().map_or(Value::Null, Value::String))
        }
        NodeKind::TableHeaderCell { align } | NodeKind::TableDataCell { align } => {
            if let Some(align) = align.as_str() {
                put("align", Value::from(align));
            }
        }
        NodeKind::Image { src, alt, title } => {
            put("src", Value::from(src.as_str()));
            put("alt", Value::from(alt.as_str()));
            if let Some(title) = title {
                put("title", Value::from(title.as_str()));
            }
        }
        NodeKind::Timestamp { time } => put("time", Value::from(time.as_str())),
        NodeKind::NoteLink { title, note_id } => {
            put("title", Value::from(title.as_str()));
            if let Some(note_id) = note_id {
                put("noteId", Value::from(note_id.as_str()));
            }
        }
        NodeKind::Unknown { attrs: extra, .. } => {
            for (key, value) in extra {
                put(key.as_str(), value.clone());
            }
        }
        _ => {}
    }
    attrs
}

fn mark_value(mark: &Mark) -> Value {
    let mut object = Map::new();
    object.insert("type".into(), Value::String(mark.type_name().to_string()));
    if let Mark::Link { href, title } = mark {
        let mut attrs = Map::new();
        attrs.insert("href".into(), Value::String(href.clone()));
        if let Some(title) = title {
            attrs.insert("title".into(), Value::String(title.clone()));
        }
        object.insert("attrs".into(), Value::Object(attrs));
    }
    Value::Object(object)
}
