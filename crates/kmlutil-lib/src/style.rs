//! Style signatures, de-duplication and resolution
//!
//! Two `Style` elements are interchangeable when they agree on every field of a
//! fixed comparison schema. The signature of a style is the concatenation of the
//! fields it actually sets, so styles are grouped by string equality. `StyleMap`
//! signatures are composed from the signatures of the styles their pairs point
//! at, which makes maps over equivalent styles equivalent too.

use crate::{Document, NodeId, StyleConfig, StyleIdPolicy};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A field of the comparison schema
struct SchemaNode {
    name: &'static str,
    kind: SchemaKind,
}

enum SchemaKind {
    /// Compared by trimmed text content
    Text,
    Children(&'static [SchemaNode]),
}

const fn text(name: &'static str) -> SchemaNode {
    SchemaNode {
        name,
        kind: SchemaKind::Text,
    }
}

const fn group(name: &'static str, children: &'static [SchemaNode]) -> SchemaNode {
    SchemaNode {
        name,
        kind: SchemaKind::Children(children),
    }
}

const STYLE_SCHEMA: &[SchemaNode] = &[
    group("LineStyle", &[text("color"), text("width")]),
    group("PolyStyle", &[text("color"), text("fill"), text("outline")]),
    group("IconStyle", &[text("scale"), group("Icon", &[text("href")])]),
    group("LabelStyle", &[text("color"), text("scale")]),
];

/// Style element flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StyleKind {
    Style,
    StyleMap,
}

/// An identified `Style` or `StyleMap` element
#[derive(Debug, Clone)]
pub struct StyleRecord {
    pub id: String,
    pub node: NodeId,
    pub kind: StyleKind,
    pub signature: String,
}

/// A local `styleUrl` element and the id it points at (without `#`)
#[derive(Debug, Clone)]
pub struct StyleReference {
    pub node: NodeId,
    pub target: String,
}

/// Outcome of [`deduplicate_styles`]
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StyleRemap {
    /// Every id that was renamed or merged, mapped to its surviving id
    pub old_to_new: BTreeMap<String, String>,
    pub duplicates_removed: usize,
    pub orphans_removed: usize,
    /// Referenced ids with no matching style, in order of first appearance
    pub unresolved: Vec<String>,
}

/// Style records and references of one document
///
/// Built fresh for every run; it borrows nothing, so the document can be mutated
/// while the index is held, with node ids staying valid.
#[derive(Debug, Clone, Default)]
pub struct StyleIndex {
    /// Styles in document order, then StyleMaps in document order
    pub records: Vec<StyleRecord>,
    pub references: Vec<StyleReference>,
    by_id: HashMap<String, usize>,
    other_ids: HashSet<String>,
    /// Records whose id was already taken by an earlier record
    duplicate_records: Vec<usize>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl StyleIndex {
    pub fn build(doc: &Document) -> Self {
        let elements = doc.descendants(doc.document_node());

        let mut style_nodes = Vec::new();
        let mut map_nodes = Vec::new();
        let mut other_ids = HashSet::new();
        let mut references = Vec::new();

        for &node in &elements {
            let local = doc.local_name(node);
            match (local, doc.attribute(node, "id")) {
                (Some("Style"), Some(_)) => style_nodes.push(node),
                (Some("StyleMap"), Some(_)) => map_nodes.push(node),
                (Some("Style" | "StyleMap"), None) => {}
                (_, Some(id)) => {
                    other_ids.insert(id.to_string());
                }
                _ => {}
            }
            if local == Some("styleUrl") {
                if let Some(target) = doc.text(node).as_deref().and_then(local_target) {
                    references.push(StyleReference {
                        node,
                        target: target.to_string(),
                    });
                }
            }
        }

        let mut lookup: HashMap<String, NodeId> = HashMap::new();
        for &node in style_nodes.iter().chain(&map_nodes) {
            if let Some(id) = doc.attribute(node, "id") {
                lookup.entry(id.to_string()).or_insert(node);
            }
        }

        let mut records = Vec::new();
        let mut by_id = HashMap::new();
        let mut duplicate_records = Vec::new();

        for (kind, nodes) in [(StyleKind::Style, &style_nodes), (StyleKind::StyleMap, &map_nodes)] {
            for &node in nodes {
                let id = doc.attribute(node, "id").unwrap_or_default().to_string();
                let signature = compute_signature(doc, node, &lookup, &mut Vec::new());
                let index = records.len();
                if by_id.contains_key(&id) {
                    tracing::warn!("Two or more styles exist with the id '{id}'");
                    duplicate_records.push(index);
                } else {
                    by_id.insert(id.clone(), index);
                }
                tracing::trace!("{id:>30} - {signature}");
                records.push(StyleRecord {
                    id,
                    node,
                    kind,
                    signature,
                });
            }
        }

        tracing::debug!(
            "Indexed {} styles and {} style references",
            records.len(),
            references.len()
        );

        Self {
            records,
            references,
            by_id,
            other_ids,
            duplicate_records,
        }
    }

    /// Record with the given id (the first one when ids are duplicated)
    pub fn get(&self, id: &str) -> Option<&StyleRecord> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    /// True when a non-style element carries this id
    pub fn is_other_id(&self, id: &str) -> bool {
        self.other_ids.contains(id)
    }

    /// Number of distinct signatures
    pub fn unique_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.signature.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Id of a local `#id` reference, `None` for external or empty references
fn local_target(url: &str) -> Option<&str> {
    url.trim().strip_prefix('#').filter(|id| !id.is_empty())
}

/// Deterministic signature of a `Style` or `StyleMap` element
///
/// Referenced styles are looked up by id in the same document.
pub fn signature(doc: &Document, node: NodeId) -> String {
    let mut lookup = HashMap::new();
    for element in doc.descendants(doc.document_node()) {
        if matches!(doc.local_name(element), Some("Style" | "StyleMap")) {
            if let Some(id) = doc.attribute(element, "id") {
                lookup.entry(id.to_string()).or_insert(element);
            }
        }
    }
    compute_signature(doc, node, &lookup, &mut Vec::new())
}

fn compute_signature(
    doc: &Document,
    node: NodeId,
    lookup: &HashMap<String, NodeId>,
    visiting: &mut Vec<NodeId>,
) -> String {
    match doc.local_name(node) {
        Some("StyleMap") => {
            if visiting.contains(&node) {
                return "StyleMap|<cycle>".to_string();
            }
            visiting.push(node);

            let mut sig = String::from("StyleMap|[");
            for pair in doc.child_elements(node) {
                if doc.local_name(pair) != Some("Pair") {
                    continue;
                }
                let Some(key) = doc.child_text(pair, "key") else {
                    continue;
                };
                sig.push('#');
                sig.push_str(&key);
                sig.push('=');

                if let Some(inline) = doc.child_element(pair, "Style") {
                    sig.push_str(&compute_signature(doc, inline, lookup, visiting));
                } else if let Some(url) = doc.child_text(pair, "styleUrl") {
                    match local_target(&url).and_then(|id| lookup.get(id)) {
                        Some(&target) => {
                            sig.push_str(&compute_signature(doc, target, lookup, visiting))
                        }
                        None => {
                            tracing::warn!("Style not found with id '{}'", url.trim_start_matches('#'));
                            sig.push_str("<missing:");
                            sig.push_str(&url);
                            sig.push('>');
                        }
                    }
                }
            }
            sig.push(']');

            visiting.pop();
            sig
        }
        _ => {
            let mut sig = String::from("Style|");
            schema_signature(doc, node, STYLE_SCHEMA, &mut sig);
            sig
        }
    }
}

fn schema_signature(doc: &Document, node: NodeId, schema: &[SchemaNode], sig: &mut String) {
    for field in schema {
        let Some(child) = doc.child_element(node, field.name) else {
            continue;
        };
        sig.push('-');
        sig.push_str(field.name);
        match field.kind {
            SchemaKind::Text => {
                sig.push('=');
                if let Some(text) = doc.text(child) {
                    sig.push_str(text.trim());
                }
            }
            SchemaKind::Children(children) => schema_signature(doc, child, children, sig),
        }
    }
}

/// Merge equivalent styles, rewrite references and drop unreferenced styles
///
/// The first style of each signature group survives. Under
/// [`StyleIdPolicy::Preserve`] it keeps its id unless a non-style element uses
/// the same id; under [`StyleIdPolicy::Renumber`] survivors become `S1`, `S2`, ...
/// References to ids that do not exist are reported, not fatal.
pub fn deduplicate_styles(doc: &mut Document, config: &StyleConfig) -> StyleRemap {
    #[cfg(feature = "profiling")]
    profiling::scope!("style::deduplicate_styles");

    let index = StyleIndex::build(doc);
    let mut remap = StyleRemap::default();

    // Group by signature in insertion order
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of: HashMap<&str, usize> = HashMap::new();
    for (i, record) in index.records.iter().enumerate() {
        if index.duplicate_records.contains(&i) {
            continue;
        }
        let g = *group_of.entry(record.signature.as_str()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[g].push(i);
    }

    let mut taken: HashSet<String> = index.other_ids.clone();
    if config.id_policy == StyleIdPolicy::Preserve {
        taken.extend(index.records.iter().map(|r| r.id.clone()));
    }
    let mut counter = 0usize;
    let mut fresh_id = |taken: &mut HashSet<String>| loop {
        counter += 1;
        let candidate = format!("S{counter}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
    };

    for members in &groups {
        let survivor = &index.records[members[0]];
        let new_id = match config.id_policy {
            StyleIdPolicy::Preserve if !index.is_other_id(&survivor.id) => survivor.id.clone(),
            _ => fresh_id(&mut taken),
        };

        if new_id != survivor.id {
            doc.set_attribute(survivor.node, "id", &new_id);
        }

        for &m in members {
            let record = &index.records[m];
            if record.id != new_id {
                remap.old_to_new.insert(record.id.clone(), new_id.clone());
            }
        }
        for &m in &members[1..] {
            doc.remove(index.records[m].node);
            remap.duplicates_removed += 1;
        }
    }

    // Records sharing an id with an earlier record are unreachable by reference
    for &d in &index.duplicate_records {
        doc.remove(index.records[d].node);
        remap.duplicates_removed += 1;
    }

    // Reference fixup over the live tree
    let live_ids: HashSet<String> = doc.id_index().into_keys().collect();
    let mut seen_unresolved = HashSet::new();
    for reference in StyleIndex::build(doc).references {
        let target = match remap.old_to_new.get(&reference.target) {
            Some(new_id) => {
                doc.set_text(reference.node, &format!("#{new_id}"));
                new_id.clone()
            }
            None => reference.target,
        };
        if !live_ids.contains(&target) && seen_unresolved.insert(target.clone()) {
            tracing::warn!("{}", crate::KmlError::UnresolvedReference(target.clone()));
            remap.unresolved.push(target);
        }
    }

    remap.orphans_removed = remove_orphans(doc);

    tracing::info!(
        "Styles: {} records, {} unique, {} duplicates removed, {} orphans removed",
        index.records.len(),
        groups.len(),
        remap.duplicates_removed,
        remap.orphans_removed
    );

    remap
}

/// Remove identified styles nobody references, until nothing changes
fn remove_orphans(doc: &mut Document) -> usize {
    let mut removed = 0;
    loop {
        let index = StyleIndex::build(doc);
        let referenced: HashSet<&str> = index.references.iter().map(|r| r.target.as_str()).collect();
        let orphans: Vec<&StyleRecord> = index
            .records
            .iter()
            .filter(|r| !referenced.contains(r.id.as_str()))
            .collect();
        if orphans.is_empty() {
            return removed;
        }
        for orphan in orphans {
            tracing::debug!("Removing orphaned {:?} '{}'", orphan.kind, orphan.id);
            doc.remove(orphan.node);
            removed += 1;
        }
    }
}

/// Reference counts and consistency problems of a document's styles
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StyleValidation {
    /// Every style id with the number of references to it (0 for orphans)
    pub targets: BTreeMap<String, usize>,
    /// Referenced ids with no style, with their reference counts
    pub missing: BTreeMap<String, usize>,
    /// Ids carried by more than one style element
    pub duplicate_ids: BTreeSet<String>,
}

impl StyleValidation {
    pub fn orphans(&self) -> impl Iterator<Item = &str> {
        self.targets
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| id.as_str())
    }

    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.duplicate_ids.is_empty() && self.orphans().next().is_none()
    }
}

/// Check style references against style definitions
pub fn validate_styles(doc: &Document) -> StyleValidation {
    let index = StyleIndex::build(doc);

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for reference in &index.references {
        *counts.entry(reference.target.as_str()).or_default() += 1;
    }

    let mut validation = StyleValidation::default();
    for record in &index.records {
        let count = counts.get(record.id.as_str()).copied().unwrap_or(0);
        if validation.targets.insert(record.id.clone(), count).is_some() {
            validation.duplicate_ids.insert(record.id.clone());
        }
    }
    for (id, count) in counts {
        if !validation.targets.contains_key(id) {
            validation.missing.insert(id.to_string(), count);
        }
    }
    validation
}

/// Resolved line style of a path, as used by reports and GeoJSON export
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathStyle {
    /// `rrggbb` hex colour
    pub color: String,
    pub width: f64,
    /// 0..=1
    pub opacity: f64,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: "000000".to_string(),
            width: 3.0,
            opacity: 1.0,
        }
    }
}

impl PathStyle {
    /// Resolve the line style of a Placemark
    ///
    /// Looks at an inline `Style`, then the normal pair of an inline `StyleMap`,
    /// then whatever the `styleUrl` points at (a `Style`, or a `StyleMap` whose
    /// normal pair holds or references a `Style`). Missing fields keep defaults.
    pub fn resolve(doc: &Document, placemark: NodeId, ids: &HashMap<String, NodeId>) -> Self {
        let candidates = line_style_candidates(doc, placemark, ids);
        let mut style = PathStyle::default();

        if let Some((color, opacity)) = candidates
            .iter()
            .filter_map(|&ls| doc.child_text(ls, "color"))
            .find_map(|c| kml_color_to_rgb(&c))
        {
            style.color = color;
            style.opacity = opacity;
        }
        if let Some(width) = candidates
            .iter()
            .filter_map(|&ls| doc.child_text(ls, "width"))
            .find_map(|w| w.parse::<f64>().ok())
        {
            style.width = width;
        }

        style
    }
}

fn normal_pair(doc: &Document, style_map: NodeId) -> Option<NodeId> {
    doc.child_elements(style_map).find(|&pair| {
        doc.local_name(pair) == Some("Pair") && doc.child_text(pair, "key").as_deref() == Some("normal")
    })
}

fn line_style_candidates(
    doc: &Document,
    placemark: NodeId,
    ids: &HashMap<String, NodeId>,
) -> Vec<NodeId> {
    let mut out = Vec::new();
    let resolve = |url: Option<String>| url.as_deref().and_then(local_target).and_then(|id| ids.get(id)).copied();

    if let Some(ls) = doc
        .child_element(placemark, "Style")
        .and_then(|s| doc.child_element(s, "LineStyle"))
    {
        out.push(ls);
    }
    if let Some(ls) = doc
        .child_element(placemark, "StyleMap")
        .and_then(|m| normal_pair(doc, m))
        .and_then(|p| doc.child_element(p, "Style"))
        .and_then(|s| doc.child_element(s, "LineStyle"))
    {
        out.push(ls);
    }

    if let Some(target) = resolve(doc.child_text(placemark, "styleUrl")) {
        match doc.local_name(target) {
            Some("Style") => out.extend(doc.child_element(target, "LineStyle")),
            Some("StyleMap") => {
                if let Some(pair) = normal_pair(doc, target) {
                    out.extend(
                        doc.child_element(pair, "Style")
                            .and_then(|s| doc.child_element(s, "LineStyle")),
                    );
                    out.extend(
                        resolve(doc.child_text(pair, "styleUrl"))
                            .and_then(|s| doc.child_element(s, "LineStyle")),
                    );
                }
            }
            _ => {}
        }
    }

    out
}

/// Convert a KML `aabbggrr` colour to `rrggbb` and an opacity in 0..=1
fn kml_color_to_rgb(color: &str) -> Option<(String, f64)> {
    let color = color.trim();
    if color.len() != 8 || !color.bytes().all(|b| b.is_ascii_hexdigit()) {
        tracing::debug!("Ignoring malformed colour '{color}'");
        return None;
    }
    let alpha = u8::from_str_radix(&color[0..2], 16).ok()?;
    let rgb = format!("{}{}{}", &color[6..8], &color[4..6], &color[2..4]).to_lowercase();
    Some((rgb, f64::from(alpha) / 255.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Document {
        Document::parse(&format!(
            r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document>{body}</Document></kml>"#
        ))
        .unwrap()
    }

    fn style_ids(doc: &Document) -> Vec<String> {
        StyleIndex::build(doc).records.into_iter().map(|r| r.id).collect()
    }

    fn style_urls(doc: &Document) -> Vec<String> {
        doc.descendants_named(doc.document_node(), "styleUrl")
            .into_iter()
            .filter_map(|n| doc.text(n))
            .collect()
    }

    const TWIN_STYLES: &str = r#"
<Style id="S1"><LineStyle><color>ff0000ff</color><width>2</width></LineStyle></Style>
<Style id="S2"><LineStyle><color>ff0000ff</color><width>2</width></LineStyle></Style>
<Placemark><name>a</name><styleUrl>#S1</styleUrl></Placemark>
<Placemark><name>b</name><styleUrl>#S2</styleUrl></Placemark>"#;

    #[test]
    fn test_signature_present_fields_only() {
        let d = doc(r#"<Style id="x"><IconStyle><scale>1.1</scale><Icon><href>pin.png</href></Icon></IconStyle><LineStyle><width> 4 </width></LineStyle></Style>"#);
        let node = d.descendants_named(d.document_node(), "Style")[0];
        assert_eq!(
            signature(&d, node),
            "Style|-LineStyle-width=4-IconStyle-scale=1.1-Icon-href=pin.png"
        );
    }

    #[test]
    fn test_style_map_signature_resolves_pairs() {
        let d = doc(r##"
<Style id="n"><LineStyle><color>ff00ff00</color></LineStyle></Style>
<Style id="h"><LineStyle><width>5</width></LineStyle></Style>
<StyleMap id="m"><Pair><key>normal</key><styleUrl>#n</styleUrl></Pair><Pair><key>highlight</key><styleUrl>#h</styleUrl></Pair></StyleMap>"##);
        let node = d.descendants_named(d.document_node(), "StyleMap")[0];
        assert_eq!(
            signature(&d, node),
            "StyleMap|[#normal=Style|-LineStyle-color=ff00ff00#highlight=Style|-LineStyle-width=5]"
        );
    }

    #[test]
    fn test_style_map_cycle_terminates() {
        let d = doc(r##"
<StyleMap id="a"><Pair><key>normal</key><styleUrl>#b</styleUrl></Pair></StyleMap>
<StyleMap id="b"><Pair><key>normal</key><styleUrl>#a</styleUrl></Pair></StyleMap>"##);
        let node = d.descendants_named(d.document_node(), "StyleMap")[0];
        assert!(signature(&d, node).contains("<cycle>"));
    }

    #[test]
    fn test_deduplicate_twin_styles() {
        let mut d = doc(TWIN_STYLES);
        let remap = deduplicate_styles(&mut d, &StyleConfig::default());

        assert_eq!(style_ids(&d), vec!["S1"]);
        assert_eq!(style_urls(&d), vec!["#S1", "#S1"]);
        assert_eq!(remap.old_to_new.get("S2").map(String::as_str), Some("S1"));
        assert_eq!(remap.duplicates_removed, 1);
        assert_eq!(remap.orphans_removed, 0);
        assert!(remap.unresolved.is_empty());
    }

    #[test]
    fn test_deduplicate_renumber_policy() {
        let mut d = doc(r#"
<Style id="red"><LineStyle><color>ff0000ff</color></LineStyle></Style>
<Style id="blue"><LineStyle><color>ffff0000</color></LineStyle></Style>
<Style id="red2"><LineStyle><color>ff0000ff</color></LineStyle></Style>
<Placemark id="S1"><styleUrl>#red</styleUrl></Placemark>
<Placemark><styleUrl>#blue</styleUrl></Placemark>
<Placemark><styleUrl>#red2</styleUrl></Placemark>"#);
        let config = StyleConfig {
            id_policy: StyleIdPolicy::Renumber,
        };
        let remap = deduplicate_styles(&mut d, &config);

        // S1 belongs to a Placemark, so numbering skips it
        assert_eq!(style_ids(&d), vec!["S2", "S3"]);
        assert_eq!(style_urls(&d), vec!["#S2", "#S3", "#S2"]);
        assert_eq!(remap.old_to_new.len(), 3);
    }

    #[test]
    fn test_preserve_renames_on_collision() {
        let mut d = doc(r#"
<Style id="p1"><LineStyle><width>1</width></LineStyle></Style>
<Placemark id="p1"><styleUrl>#p1</styleUrl></Placemark>"#);
        let remap = deduplicate_styles(&mut d, &StyleConfig::default());
        assert_eq!(style_ids(&d), vec!["S1"]);
        assert_eq!(style_urls(&d), vec!["#S1"]);
        assert_eq!(remap.old_to_new.get("p1").map(String::as_str), Some("S1"));
    }

    #[test]
    fn test_orphan_pass_reaches_fixpoint() {
        let mut d = doc(r##"
<Style id="used"><LineStyle><width>1</width></LineStyle></Style>
<Style id="n"><LineStyle><width>2</width></LineStyle></Style>
<StyleMap id="unused-map"><Pair><key>normal</key><styleUrl>#n</styleUrl></Pair></StyleMap>
<Placemark><styleUrl>#used</styleUrl></Placemark>"##);
        let remap = deduplicate_styles(&mut d, &StyleConfig::default());
        assert_eq!(style_ids(&d), vec!["used"]);
        assert_eq!(remap.orphans_removed, 2);
    }

    #[test]
    fn test_unresolved_reference_is_reported() {
        let mut d = doc(r#"
<Style id="a"><LineStyle><width>1</width></LineStyle></Style>
<Placemark><styleUrl>#a</styleUrl></Placemark>
<Placemark><styleUrl>#ghost</styleUrl></Placemark>
<Placemark><styleUrl>#ghost</styleUrl></Placemark>
<Placemark><styleUrl>other.kml#remote</styleUrl></Placemark>"#);
        let remap = deduplicate_styles(&mut d, &StyleConfig::default());
        assert_eq!(remap.unresolved, vec!["ghost"]);
        assert_eq!(style_ids(&d), vec!["a"]);
    }

    #[test]
    fn test_duplicate_ids_are_merged() {
        let mut d = doc(r#"
<Style id="a"><LineStyle><width>1</width></LineStyle></Style>
<Style id="a"><LineStyle><width>9</width></LineStyle></Style>
<Placemark><styleUrl>#a</styleUrl></Placemark>"#);
        let validation = validate_styles(&d);
        assert!(validation.duplicate_ids.contains("a"));

        let remap = deduplicate_styles(&mut d, &StyleConfig::default());
        assert_eq!(remap.duplicates_removed, 1);
        assert_eq!(style_ids(&d), vec!["a"]);
    }

    #[test]
    fn test_validate_styles() {
        let d = doc(r#"
<Style id="a"/>
<Style id="b"/>
<Placemark><styleUrl>#a</styleUrl></Placemark>
<Placemark><styleUrl>#a</styleUrl></Placemark>
<Placemark><styleUrl>#c</styleUrl></Placemark>"#);
        let validation = validate_styles(&d);
        assert_eq!(validation.targets.get("a"), Some(&2));
        assert_eq!(validation.orphans().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(validation.missing.get("c"), Some(&1));
        assert!(!validation.is_clean());
    }

    #[test]
    fn test_path_style_resolution() {
        let d = doc(r##"
<Style id="line"><LineStyle><color>7f00ff00</color><width>4</width></LineStyle></Style>
<StyleMap id="map"><Pair><key>normal</key><styleUrl>#line</styleUrl></Pair></StyleMap>
<Placemark><name>direct</name><styleUrl>#line</styleUrl></Placemark>
<Placemark><name>mapped</name><styleUrl>#map</styleUrl></Placemark>
<Placemark><name>inline</name><Style><LineStyle><color>ff0000ff</color></LineStyle></Style></Placemark>
<Placemark><name>plain</name></Placemark>"##);
        let ids = d.id_index();
        let placemarks = d.descendants_named(d.document_node(), "Placemark");
        let resolved: Vec<PathStyle> = placemarks
            .iter()
            .map(|&p| PathStyle::resolve(&d, p, &ids))
            .collect();

        assert_eq!(resolved[0].color, "00ff00");
        assert_eq!(resolved[0].width, 4.0);
        assert!((resolved[0].opacity - 127.0 / 255.0).abs() < 1e-12);
        assert_eq!(resolved[1], resolved[0]);
        assert_eq!(resolved[2].color, "ff0000");
        assert_eq!(resolved[2].width, 3.0);
        assert_eq!(resolved[3], PathStyle::default());
    }
}
