//! Arena-backed XML document tree
//!
//! Every node lives in a single `Vec` owned by [`Document`] and is addressed by a
//! [`NodeId`]. Removing a node only detaches it from its parent, so ids held by
//! callers never dangle; detached subtrees are simply not serialized.
//!
//! Element names keep their namespace prefix as written (`kml:Placemark`); all
//! lookups compare local names.

use crate::{KmlError, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::collections::{BTreeMap, HashMap};

/// Index of a node in its document arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The invisible top-level container holding the root element
    Document,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An editable XML document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip a namespace prefix from a qualified name
#[inline]
pub(crate) fn local_part(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Document {
    /// Create an empty document with only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Parse XML text into a document
    ///
    /// Whitespace-only text between elements is dropped; it is regenerated by
    /// pretty printing on output. Other text is kept as written, including the
    /// spaces around inline markup.
    pub fn parse(text: &str) -> Result<Self> {
        let mut doc = Document::new();
        let mut stack = vec![doc.document_node()];

        let mut reader = Reader::from_str(text);

        loop {
            let parent = stack.last().copied().unwrap_or(NodeId(0));
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let id = doc.push_element(parent, &e)?;
                    stack.push(id);
                }
                Ok(Event::Empty(e)) => {
                    doc.push_element(parent, &e)?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape()?;
                    if !text.trim().is_empty() {
                        doc.push_node(parent, NodeKind::Text(text.into_owned()));
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    doc.push_node(parent, NodeKind::CData(text));
                }
                Ok(Event::Comment(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    doc.push_node(parent, NodeKind::Comment(text));
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    tracing::warn!(
                        "XML parse error at position {}: {e}",
                        reader.buffer_position()
                    );
                    return Err(KmlError::Xml(e));
                }
                // Declarations, processing instructions and doctypes are regenerated or dropped
                _ => {}
            }
        }

        if doc.root_element().is_none() {
            return Err(KmlError::UnsupportedRoot);
        }

        Ok(doc)
    }

    /// Read and parse a file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    fn push_element(&mut self, parent: NodeId, e: &BytesStart<'_>) -> Result<NodeId> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(self.push_node(parent, NodeKind::Element { name, attributes }))
    }

    fn push_node(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.alloc(kind);
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Serialize the attached part of the document
    pub fn to_xml(&self, pretty: bool) -> Result<String> {
        let mut writer = if pretty {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        for &child in self.children(self.document_node()) {
            self.write_node(&mut writer, child)?;
        }

        let mut xml = String::from_utf8(writer.into_inner())?;
        xml.push('\n');
        Ok(xml)
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<()> {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Document => {}
            NodeKind::Element { name, attributes } => {
                let mut start = BytesStart::new(name.as_str());
                for (key, value) in attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                if node.children.is_empty() {
                    writer.write_event(Event::Empty(start))?;
                } else {
                    writer.write_event(Event::Start(start))?;
                    for &child in &node.children {
                        self.write_node(writer, child)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
                }
            }
            NodeKind::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            NodeKind::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
            NodeKind::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
            }
        }
        Ok(())
    }

    /// The document node (parent of the root element)
    #[inline]
    pub fn document_node(&self) -> NodeId {
        NodeId(0)
    }

    /// The outermost element (`kml`)
    pub fn root_element(&self) -> Option<NodeId> {
        self.child_elements(self.document_node()).next()
    }

    /// The `Document` (or top-level `Folder`) element that holds the features
    pub fn container_element(&self) -> Result<NodeId> {
        let root = self.root_element().ok_or(KmlError::UnsupportedRoot)?;
        if matches!(self.local_name(root), Some("Document" | "Folder")) {
            return Ok(root);
        }
        self.child_element(root, "Document")
            .or_else(|| self.child_element(root, "Folder"))
            .ok_or(KmlError::UnsupportedRoot)
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Qualified element name, `None` for non-elements
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Element name without namespace prefix
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.name(id).map(local_part)
    }

    #[inline]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element { .. })
    }

    /// Element children in order
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.is_element(c))
    }

    /// First element child with the given local name
    pub fn child_element(&self, id: NodeId, local_name: &str) -> Option<NodeId> {
        self.child_elements(id)
            .find(|&c| self.local_name(c) == Some(local_name))
    }

    /// All element descendants in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.is_element(node) {
                out.push(node);
                stack.extend(self.children(node).iter().rev().copied());
            }
        }
        out
    }

    /// Element descendants with the given local name, in document order
    pub fn descendants_named(&self, id: NodeId, local_name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&d| self.local_name(d) == Some(local_name))
            .collect()
    }

    /// Concatenated direct text and CDATA content, `None` if there is none
    pub fn text(&self, id: NodeId) -> Option<String> {
        let mut text: Option<String> = None;
        for &child in self.children(id) {
            if let NodeKind::Text(t) | NodeKind::CData(t) = &self.nodes[child.0].kind {
                text.get_or_insert_with(String::new).push_str(t);
            }
        }
        text
    }

    /// Trimmed text of the first child element with the given local name
    pub fn child_text(&self, id: NodeId, local_name: &str) -> Option<String> {
        self.child_element(id, local_name)
            .and_then(|c| self.text(c))
            .map(|t| t.trim().to_string())
    }

    /// Replace all direct text content with `text`
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let old: Vec<NodeId> = self
            .children(id)
            .iter()
            .copied()
            .filter(|&c| matches!(self.nodes[c.0].kind, NodeKind::Text(_) | NodeKind::CData(_)))
            .collect();
        for child in old {
            self.remove(child);
        }
        let text_node = self.alloc(NodeKind::Text(text.to_string()));
        self.insert_child(id, 0, text_node);
    }

    /// Set the text of a child element, creating the element when missing
    pub fn set_child_text(&mut self, id: NodeId, local_name: &str, text: &str) -> NodeId {
        let child = match self.child_element(id, local_name) {
            Some(child) => child,
            None => {
                let name = self.prefixed_name_like(id, local_name);
                let child = self.create_element(&name);
                self.insert_child(id, 0, child);
                child
            }
        };
        self.set_text(child, text);
        child
    }

    /// Build a qualified name using the same prefix as `sibling_of`
    fn prefixed_name_like(&self, sibling_of: NodeId, local_name: &str) -> String {
        match self.name(sibling_of).and_then(|n| n.split_once(':')) {
            Some((prefix, _)) => format!("{prefix}:{local_name}"),
            None => local_name.to_string(),
        }
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, key: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind {
            match attributes.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value.to_string(),
                None => attributes.push((key.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, key: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind {
            attributes.retain(|(k, _)| k != key);
        }
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            name: name.to_string(),
            attributes: Vec::new(),
        })
    }

    /// Append `child` to `parent`, detaching it from its current parent first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.remove(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` at `index` among `parent`'s children (clamped to the end)
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.remove(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Detach a node from its parent; the subtree stays addressable
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Position of `child` among `parent`'s children
    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    /// True when the node is reachable from the document node
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            current = parent;
        }
        current == self.document_node()
    }

    /// Deep copy of a subtree, returned detached
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let copy = self.alloc(self.nodes[id.0].kind.clone());
        let children = self.nodes[id.0].children.clone();
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// Deep copy of a subtree from another document, returned detached
    pub fn import_subtree(&mut self, other: &Document, id: NodeId) -> NodeId {
        let copy = self.alloc(other.nodes[id.0].kind.clone());
        for &child in other.children(id) {
            let child_copy = self.import_subtree(other, child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// Position of every attached element in document order
    pub fn document_order(&self) -> HashMap<NodeId, usize> {
        self.descendants(self.document_node())
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect()
    }

    /// Map of every attached `id` attribute to its element (first occurrence wins)
    pub fn id_index(&self) -> HashMap<String, NodeId> {
        let mut index = HashMap::new();
        for node in self.descendants(self.document_node()) {
            if let Some(id) = self.attribute(node, "id") {
                index.entry(id.to_string()).or_insert(node);
            }
        }
        index
    }

    /// Location path such as `/kml/Document/Folder[2]/Placemark`
    pub fn path_of(&self, id: NodeId) -> String {
        let mut steps = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let Some(name) = self.name(current) else {
                break;
            };
            let siblings: Vec<NodeId> = self
                .child_elements(parent)
                .filter(|&s| self.name(s) == Some(name))
                .collect();
            if siblings.len() > 1 {
                let position = siblings.iter().position(|&s| s == current).unwrap_or(0) + 1;
                steps.push(format!("{name}[{position}]"));
            } else {
                steps.push(name.to_string());
            }
            current = parent;
        }
        steps.reverse();
        format!("/{}", steps.join("/"))
    }

    /// Namespace declarations on the root element, keyed by prefix (`None` = default)
    pub fn namespaces(&self) -> BTreeMap<Option<String>, String> {
        let mut map = BTreeMap::new();
        let Some(root) = self.root_element() else {
            return map;
        };
        if let NodeKind::Element { attributes, .. } = self.kind(root) {
            for (key, value) in attributes {
                if key == "xmlns" {
                    map.insert(None, value.clone());
                } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                    map.insert(Some(prefix.to_string()), value.clone());
                }
            }
        }
        map
    }
}
