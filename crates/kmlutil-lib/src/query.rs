//! Element queries and feature selectors
//!
//! [`PathExpr`] is a small location-path language over local element names:
//!
//! - `/kml/Document/Folder` child steps, `//Placemark` descendant steps
//! - `*` any element, `.` the context node, `..` its parent
//! - predicates `[name]`, `[name='Trail']`, `[@id]`, `[@id='S1']`, `[2]`
//!
//! [`Selector`] is the command-line feature addressing scheme built on top of it.

use crate::tree::local_part;
use crate::{Document, KmlError, NodeId, Result};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    Any,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasChild(String),
    ChildText(String, String),
    HasAttribute(String),
    AttributeEquals(String, String),
    /// 1-based position among the candidates of one context node
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

/// A compiled location path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    absolute: bool,
    steps: Vec<Step>,
}

impl PathExpr {
    /// Compile a location path
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = |reason: &str| KmlError::InvalidSelector {
            selector: path.to_string(),
            reason: reason.to_string(),
        };

        let path = path.trim();
        if path.is_empty() {
            return Err(invalid("empty path"));
        }

        let absolute = path.starts_with('/');
        let mut steps = Vec::new();
        let mut rest = path;
        let mut first = true;

        while !rest.is_empty() {
            let axis = if let Some(r) = rest.strip_prefix("//") {
                rest = r;
                Axis::Descendant
            } else if let Some(r) = rest.strip_prefix('/') {
                rest = r;
                Axis::Child
            } else if first {
                Axis::Child
            } else {
                return Err(invalid("expected '/' between steps"));
            };
            first = false;

            let end = step_end(rest).ok_or_else(|| invalid("unbalanced brackets or quotes"))?;
            let text = &rest[..end];
            rest = &rest[end..];

            if text.is_empty() {
                if rest.is_empty() && axis == Axis::Child && steps.is_empty() {
                    // The bare root path "/"
                    break;
                }
                return Err(invalid("empty step"));
            }

            steps.push(parse_step(axis, text).map_err(|reason| invalid(&reason))?);
        }

        Ok(Self { absolute, steps })
    }

    /// Evaluate against a context node, returning matches in document order
    pub fn evaluate(&self, doc: &Document, context: NodeId) -> Vec<NodeId> {
        let start = if self.absolute {
            doc.document_node()
        } else {
            context
        };

        let mut current = vec![start];
        for step in &self.steps {
            let mut next = Vec::new();
            let mut seen = HashSet::new();
            for &node in &current {
                for candidate in apply_step(doc, node, step) {
                    if seen.insert(candidate) {
                        next.push(candidate);
                    }
                }
            }
            current = next;
        }

        sort_document_order(doc, &mut current);
        current
    }
}

/// Byte offset of the next top-level `/`, or the end of the text
fn step_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.checked_sub(1)?,
            (None, '/') if depth == 0 => return Some(i),
            _ => {}
        }
    }
    (depth == 0 && quote.is_none()).then_some(text.len())
}

fn parse_step(axis: Axis, text: &str) -> std::result::Result<Step, String> {
    let (name, mut rest) = match text.find('[') {
        Some(i) => (&text[..i], &text[i..]),
        None => (text, ""),
    };

    let test = match name.trim() {
        "" => return Err("missing element name".to_string()),
        "*" => NodeTest::Any,
        "." => NodeTest::SelfNode,
        ".." => NodeTest::Parent,
        n => NodeTest::Name(local_part(n).to_string()),
    };

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let close = predicate_end(rest).ok_or("unterminated predicate")?;
        predicates.push(parse_predicate(&rest[1..close])?);
        rest = &rest[close + 1..];
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

/// Index of the `]` closing the predicate that opens at byte 0
fn predicate_end(text: &str) -> Option<usize> {
    if !text.starts_with('[') {
        return None;
    }
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices().skip(1) {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_predicate(text: &str) -> std::result::Result<Predicate, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty predicate".to_string());
    }

    if text.bytes().all(|b| b.is_ascii_digit()) {
        return match text.parse::<usize>() {
            Ok(0) | Err(_) => Err(format!("invalid position {text}")),
            Ok(n) => Ok(Predicate::Position(n)),
        };
    }

    let (key, value) = match text.split_once('=') {
        Some((key, value)) => (key.trim(), Some(unquote(value.trim())?)),
        None => (text, None),
    };

    match (key.strip_prefix('@'), value) {
        (Some(""), _) => Err("missing attribute name".to_string()),
        (Some(attr), None) => Ok(Predicate::HasAttribute(attr.to_string())),
        (Some(attr), Some(v)) => Ok(Predicate::AttributeEquals(attr.to_string(), v)),
        (None, None) => Ok(Predicate::HasChild(local_part(key).to_string())),
        (None, Some(v)) => Ok(Predicate::ChildText(local_part(key).to_string(), v)),
    }
}

fn unquote(value: &str) -> std::result::Result<String, String> {
    let quoted = (value.starts_with('\'') && value.ends_with('\''))
        || (value.starts_with('"') && value.ends_with('"'));
    if value.len() >= 2 && quoted {
        Ok(value[1..value.len() - 1].to_string())
    } else {
        Err(format!("expected a quoted value, found {value}"))
    }
}

fn apply_step(doc: &Document, node: NodeId, step: &Step) -> Vec<NodeId> {
    let mut candidates: Vec<NodeId> = match (&step.test, step.axis) {
        (NodeTest::SelfNode, _) => vec![node],
        (NodeTest::Parent, _) => doc.parent(node).into_iter().collect(),
        (NodeTest::Any, Axis::Child) => doc.child_elements(node).collect(),
        (NodeTest::Any, Axis::Descendant) => doc.descendants(node),
        (NodeTest::Name(name), Axis::Child) => doc
            .child_elements(node)
            .filter(|&c| doc.local_name(c) == Some(name.as_str()))
            .collect(),
        (NodeTest::Name(name), Axis::Descendant) => doc.descendants_named(node, name),
    };

    for predicate in &step.predicates {
        candidates = match predicate {
            Predicate::Position(n) => candidates.get(n - 1).copied().into_iter().collect(),
            other => candidates
                .into_iter()
                .filter(|&c| predicate_matches(doc, c, other))
                .collect(),
        };
    }

    candidates
}

fn predicate_matches(doc: &Document, node: NodeId, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::HasChild(name) => doc.child_element(node, name).is_some(),
        Predicate::ChildText(name, value) => doc
            .child_elements(node)
            .filter(|&c| doc.local_name(c) == Some(name.as_str()))
            .any(|c| doc.text(c).is_some_and(|t| normalize_space(&t) == *value)),
        Predicate::HasAttribute(attr) => doc.attribute(node, attr).is_some(),
        Predicate::AttributeEquals(attr, value) => doc.attribute(node, attr) == Some(value.as_str()),
        Predicate::Position(_) => true,
    }
}

/// Evaluate a location path from `context`
pub fn select(doc: &Document, context: NodeId, path: &str) -> Result<Vec<NodeId>> {
    Ok(PathExpr::parse(path)?.evaluate(doc, context))
}

/// Trim and collapse inner whitespace runs to single spaces
pub fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn sort_document_order(doc: &Document, nodes: &mut [NodeId]) {
    if nodes.len() < 2 {
        return;
    }
    let order = doc.document_order();
    // Detached nodes sort last, keeping their relative order
    nodes.sort_by_key(|n| order.get(n).copied().unwrap_or(usize::MAX));
}

/// Map a geometry type alias to its KML element name
///
/// Unknown names are returned unchanged so raw tags like `MultiGeometry` work.
pub fn type_alias(name: &str) -> &str {
    match name {
        "Point" | "Placemark" | "Waypoint" => "Point",
        "Path" | "Trail" | "LineString" => "LineString",
        "Polygon" | "Area" => "Polygon",
        other => other,
    }
}

/// Display alias for a KML geometry element name
pub fn display_alias(tag: &str) -> &str {
    match tag {
        "LineString" => "Path",
        other => other,
    }
}

/// A feature selector as given on the command line
///
/// - a leading `/` or `.` is a location path
/// - `&name` matches a Folder or Placemark name exactly
/// - `%pre*suf` matches names by prefix and suffix (one `*` at most)
/// - `@Type` matches Placemarks by geometry type (`@Path`, `@Point`, `@Area`, ...)
/// - anything else is an exact Folder or Placemark name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Path(PathExpr),
    Name(String),
    Pattern { prefix: String, suffix: String },
    Type(String),
}

impl Selector {
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: &str| KmlError::InvalidSelector {
            selector: text.to_string(),
            reason: reason.to_string(),
        };

        if text.starts_with('/') || text.starts_with('.') {
            return Ok(Selector::Path(PathExpr::parse(text)?));
        }
        if let Some(name) = text.strip_prefix('&') {
            return Ok(Selector::Name(normalize_space(name)));
        }
        if let Some(pattern) = text.strip_prefix('%') {
            let mut parts = pattern.split('*');
            let prefix = parts.next().unwrap_or_default().to_string();
            let suffix = parts.next().unwrap_or_default().to_string();
            if parts.next().is_some() {
                return Err(invalid("only one '*' is permitted in a name pattern"));
            }
            return Ok(Selector::Pattern { prefix, suffix });
        }
        if let Some(kind) = text.strip_prefix('@') {
            if kind.trim().is_empty() {
                return Err(invalid("missing geometry type"));
            }
            return Ok(Selector::Type(type_alias(kind.trim()).to_string()));
        }
        Ok(Selector::Name(normalize_space(text)))
    }

    /// All matching elements in document order
    pub fn select(&self, doc: &Document) -> Vec<NodeId> {
        match self {
            Selector::Path(expr) => expr.evaluate(doc, doc.document_node()),
            Selector::Type(tag) => doc
                .descendants_named(doc.document_node(), "Placemark")
                .into_iter()
                .filter(|&p| geometry_tag(doc, p) == Some(tag.as_str()))
                .collect(),
            Selector::Name(_) | Selector::Pattern { .. } => doc
                .descendants(doc.document_node())
                .into_iter()
                .filter(|&n| matches!(doc.local_name(n), Some("Folder" | "Placemark")))
                .filter(|&n| {
                    doc.child_text(n, "name")
                        .is_some_and(|name| self.matches_name(&normalize_space(&name)))
                })
                .collect(),
        }
    }

    fn matches_name(&self, name: &str) -> bool {
        match self {
            Selector::Name(expected) => name == expected,
            Selector::Pattern { prefix, suffix } => {
                name.starts_with(prefix.as_str()) && name.ends_with(suffix.as_str())
            }
            Selector::Path(_) | Selector::Type(_) => false,
        }
    }
}

/// Geometry element name of a Placemark, looking through one MultiGeometry level
pub fn geometry_tag(doc: &Document, placemark: NodeId) -> Option<&str> {
    const TAGS: [&str; 3] = ["Polygon", "Point", "LineString"];
    for child in doc.child_elements(placemark) {
        let name = doc.local_name(child)?;
        if TAGS.contains(&name) {
            return Some(name);
        }
        if name == "MultiGeometry" {
            if let Some(inner) = doc
                .child_elements(child)
                .filter_map(|c| doc.local_name(c))
                .find(|n| TAGS.contains(n))
            {
                return Some(inner);
            }
        }
    }
    None
}

/// Resolve several selectors into one de-duplicated list in document order
pub fn select_features(doc: &Document, selectors: &[String]) -> Result<Vec<NodeId>> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    for text in selectors {
        let selector = Selector::parse(text)?;
        let found = selector.select(doc);
        tracing::debug!("Selector '{text}' matched {} element(s)", found.len());
        for node in found {
            if seen.insert(node) {
                nodes.push(node);
            }
        }
    }
    sort_document_order(doc, &mut nodes);
    Ok(nodes)
}
