//! Document statistics, feature listing and coordinate dumps

use crate::feature::coordinate_nodes;
use crate::geometry::path_length;
use crate::query::{display_alias, geometry_tag, select_features, type_alias};
use crate::{Coordinate, Document, FeatureArena, NodeId, PathStyle, Result, parse_coordinates};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Element tags whose coordinate points are counted
const POINT_COUNT_TAGS: [&str; 4] = ["Document", "LineString", "Polygon", "Point"];

/// Element and point counts of a document at one moment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    /// Number of elements per capitalised tag (`Placemark`, `Folder`, ...)
    pub elements: BTreeMap<String, usize>,
    /// Number of coordinate points below each `Document`, `LineString`, `Polygon`, `Point`
    pub points: BTreeMap<String, usize>,
}

impl Snapshot {
    pub fn capture(doc: &Document) -> Self {
        Self {
            elements: element_counts(doc),
            points: point_counts(doc),
        }
    }
}

/// Count attached elements by local name, for names starting with an uppercase letter
pub fn element_counts(doc: &Document) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for node in doc.descendants(doc.document_node()) {
        if let Some(name) = doc.local_name(node) {
            if name.chars().next().is_some_and(char::is_uppercase) {
                *counts.entry(name.to_string()).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Count coordinate tuples below each element of the counted tags
pub fn point_counts(doc: &Document) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for node in doc.descendants(doc.document_node()) {
        let Some(name) = doc.local_name(node) else {
            continue;
        };
        if !POINT_COUNT_TAGS.contains(&name) {
            continue;
        }
        let points: usize = coordinate_nodes(doc, node)
            .into_iter()
            .filter_map(|c| doc.text(c))
            .map(|t| t.split_whitespace().count())
            .sum();
        if points > 0 {
            *counts.entry(name.to_string()).or_insert(0) += points;
        }
    }
    counts
}

/// Before/after comparison of one counter
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CountDelta {
    pub tag: String,
    pub before: usize,
    pub after: usize,
    /// Share of `before` that is gone, negative when the count grew
    pub reduction: f64,
}

/// Compare two counters, largest `before` first
///
/// Tags that only appear in `after` are listed last with a `before` of 0.
pub fn count_deltas(before: &BTreeMap<String, usize>, after: &BTreeMap<String, usize>) -> Vec<CountDelta> {
    let mut deltas: Vec<CountDelta> = before
        .iter()
        .map(|(tag, &b)| {
            let a = after.get(tag).copied().unwrap_or(0);
            let reduction = if b == 0 {
                0.0
            } else {
                (b as f64 - a as f64) / b as f64
            };
            CountDelta {
                tag: tag.clone(),
                before: b,
                after: a,
                reduction,
            }
        })
        .collect();
    deltas.sort_by(|x, y| y.before.cmp(&x.before).then_with(|| x.tag.cmp(&y.tag)));

    for (tag, &a) in after {
        if !before.contains_key(tag) {
            deltas.push(CountDelta {
                tag: tag.clone(),
                before: 0,
                after: a,
                reduction: 0.0,
            });
        }
    }
    deltas
}

/// Number of paths sharing one resolved line style
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathStyleCount {
    /// `<color>-<width>-<opacity>`
    pub signature: String,
    pub count: usize,
    pub style: PathStyle,
}

/// Format a number with at most two decimals, trailing zeros removed
fn compact(value: f64) -> String {
    let fixed = format!("{value:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Group paths with coordinates by their resolved line style, most common first
pub fn path_style_counts(doc: &Document) -> Vec<PathStyleCount> {
    let ids = doc.id_index();
    let arena = FeatureArena::from_nodes(
        doc,
        doc.descendants_named(doc.document_node(), "Placemark")
            .into_iter()
            .filter(|&p| geometry_tag(doc, p) == Some("LineString")),
    );

    let mut counts: Vec<PathStyleCount> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    for feature in &arena {
        if feature.coordinates().is_empty() {
            continue;
        }
        let style = PathStyle::resolve(doc, feature.node, &ids);
        let signature = format!(
            "{}-{}-{}",
            style.color,
            compact(style.width),
            compact(style.opacity)
        );
        match position.get(&signature) {
            Some(&i) => counts[i].count += 1,
            None => {
                position.insert(signature.clone(), counts.len());
                counts.push(PathStyleCount {
                    signature,
                    count: 1,
                    style,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Number of MultiGeometry elements holding paths
pub fn multi_geometry_paths(doc: &Document) -> usize {
    doc.descendants_named(doc.document_node(), "MultiGeometry")
        .into_iter()
        .filter(|&m| doc.child_element(m, "LineString").is_some())
        .count()
}

/// One row of a feature listing
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ListEntry {
    pub name: String,
    /// `Document`, `Folder`, `Point`, `Path`, `Polygon` or `UNKNOWN`
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    /// Nesting depth below the document container
    pub indent: usize,
    /// Number of points of a path, or of all paths below a folder
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub count: Option<usize>,
    /// Length in kilometers, same scope as `count`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub length: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub xpath: Option<String>,
}

/// Options for [`list_features`]
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Comma separated type names or aliases (`Path,Point`); `None` lists everything
    pub filter: Option<String>,
    /// Add point counts and lengths
    pub detail: bool,
    /// Add the location path of every entry
    pub xpaths: bool,
}

/// List the Documents, Folders and Placemarks below the document container
pub fn list_features(doc: &Document, options: &ListOptions) -> Result<Vec<ListEntry>> {
    let filter: Option<HashSet<String>> = options.filter.as_ref().map(|f| {
        f.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| type_alias(t).to_string())
            .collect()
    });

    let root = doc.container_element()?;
    let mut entries = Vec::new();
    list_children(doc, root, filter.as_ref(), options, 0, &mut entries);
    Ok(entries)
}

/// Append entries for the feature children of `parent`, returning their path totals
fn list_children(
    doc: &Document,
    parent: NodeId,
    filter: Option<&HashSet<String>>,
    options: &ListOptions,
    indent: usize,
    entries: &mut Vec<ListEntry>,
) -> (usize, f64) {
    let mut total = (0usize, 0.0f64);

    for node in doc.child_elements(parent).collect::<Vec<_>>() {
        let Some(tag) = doc.local_name(node) else {
            continue;
        };
        if !matches!(tag, "Document" | "Folder" | "Placemark") {
            continue;
        }

        let type_tag = match tag {
            "Document" | "Folder" => tag,
            _ => geometry_tag(doc, node).unwrap_or("UNKNOWN"),
        };
        let included = filter.is_none_or(|f| f.contains(type_tag));

        let slot = included.then(|| {
            entries.push(ListEntry {
                name: doc
                    .child_text(node, "name")
                    .unwrap_or_else(|| "UNNAMED".to_string()),
                kind: display_alias(type_tag).to_string(),
                indent,
                count: None,
                length: None,
                xpath: options.xpaths.then(|| doc.path_of(node)),
            });
            entries.len() - 1
        });

        let (count, length) = if tag == "Placemark" {
            if type_tag == "LineString" {
                first_path_totals(doc, node)
            } else {
                (0, 0.0)
            }
        } else {
            list_children(doc, node, filter, options, indent + 1, entries)
        };

        total.0 += count;
        total.1 += length;

        if let Some(i) = slot {
            if options.detail && (tag != "Placemark" || count > 0) {
                entries[i].count = Some(count);
                entries[i].length = Some(length);
            }
        }
    }

    total
}

/// Point count and length of the first `coordinates` list of a path, when it has two points
fn first_path_totals(doc: &Document, placemark: NodeId) -> (usize, f64) {
    let coords = coordinate_nodes(doc, placemark)
        .first()
        .and_then(|&c| doc.text(c))
        .map(|t| parse_coordinates(&t));
    match coords {
        Some(Ok(coords)) if coords.len() > 1 => (coords.len(), path_length(&coords)),
        Some(Err(e)) => {
            tracing::warn!("Cannot measure path at {}: {e}", doc.path_of(placemark));
            (0, 0.0)
        }
        _ => (0, 0.0),
    }
}

/// Coordinates of one selected element
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DumpEntry {
    pub name: Option<String>,
    pub coordinates: Vec<Coordinate>,
}

/// Collect every coordinate below each selected element
///
/// Elements with an unreadable coordinate list are logged and left out.
pub fn dump_coordinates(doc: &Document, selectors: &[String]) -> Result<Vec<DumpEntry>> {
    let mut entries = Vec::new();
    for node in select_features(doc, selectors)? {
        let parsed: Result<Vec<Vec<Coordinate>>> = coordinate_nodes(doc, node)
            .into_iter()
            .map(|c| parse_coordinates(&doc.text(c).unwrap_or_default()))
            .collect();
        match parsed {
            Ok(lists) => entries.push(DumpEntry {
                name: doc.child_text(node, "name"),
                coordinates: lists.into_iter().flatten().collect(),
            }),
            Err(e) => tracing::warn!("Skipping dump of {}: {e}", doc.path_of(node)),
        }
    }
    Ok(entries)
}
