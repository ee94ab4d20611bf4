//! Document edit operations
//!
//! Each operation mutates a [`Document`] in place and returns a small report
//! describing what it did. Features that cannot be read are logged and left
//! untouched; only document-level problems (a missing region, an invalid
//! selector, an unsupported root) are returned as errors.

use crate::feature::coordinate_nodes;
use crate::query::{geometry_tag, normalize_space, select_features};
use crate::{
    Document, Feature, FeatureId, FolderizeConfig, KmlError, NodeId, Region, RegionMatcher,
    Result, SimplifyConfig, classify, format_coordinates, optimize_coordinate_text,
    parse_coordinates, simplify,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of [`crop_to_region`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CropReport {
    pub examined: usize,
    pub kept: usize,
    pub removed: usize,
    /// Placemarks that could not be read and were left in place
    pub skipped: usize,
}

/// Outcome of path simplification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimplifyReport {
    pub paths: usize,
    pub points_before: usize,
    pub points_after: usize,
}

/// One feature moved by [`folderize`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FolderMove {
    pub feature: String,
    pub folder: String,
    pub ratio: f64,
}

/// Outcome of [`folderize`]
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FolderizeReport {
    pub boundaries: Vec<String>,
    pub examined: usize,
    pub moves: Vec<FolderMove>,
}

/// Outcome of [`combine`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CombineReport {
    pub features: usize,
    pub styles: usize,
    /// Style ids renamed on import because the target document already used them
    pub renamed_styles: Vec<(String, String)>,
}

fn is_feature(doc: &Document, node: NodeId) -> bool {
    matches!(doc.local_name(node), Some("Folder" | "Placemark"))
}

/// Folder and Placemark children of the document container
fn top_level_features(doc: &Document, container: NodeId) -> Vec<NodeId> {
    doc.child_elements(container)
        .filter(|&c| is_feature(doc, c))
        .collect()
}

fn placemarks(doc: &Document) -> Vec<NodeId> {
    doc.descendants_named(doc.document_node(), "Placemark")
}

fn is_path_placemark(doc: &Document, placemark: NodeId) -> bool {
    geometry_tag(doc, placemark) == Some("LineString")
}

/// Replace the top level of the container with `nodes`, in order
fn replace_top_level(doc: &mut Document, nodes: &[NodeId]) -> Result<()> {
    let container = doc.container_element()?;
    for node in top_level_features(doc, container) {
        doc.remove(node);
    }
    for &node in nodes {
        doc.append_child(container, node);
    }
    Ok(())
}

/// Remove every selected Folder or Placemark
pub fn delete_features(doc: &mut Document, selectors: &[String]) -> Result<usize> {
    let nodes = select_features(doc, selectors)?;
    tracing::info!("Deleting {} item(s)", nodes.len());
    for &node in nodes.iter().rev() {
        tracing::debug!("Deleting '{}'", doc.child_text(node, "name").unwrap_or_default());
        doc.remove(node);
    }
    Ok(nodes.len())
}

/// Keep only the selected features, moved to the top level of the document
pub fn extract_features(doc: &mut Document, selectors: &[String]) -> Result<usize> {
    let nodes = select_features(doc, selectors)?;
    tracing::info!("Located {} features to extract", nodes.len());
    replace_top_level(doc, &nodes)?;
    Ok(nodes.len())
}

/// Keep only path Placemarks, flattened to the top level of the document
pub fn paths_only(doc: &mut Document) -> Result<usize> {
    let paths: Vec<NodeId> = placemarks(doc)
        .into_iter()
        .filter(|&p| is_path_placemark(doc, p))
        .collect();
    tracing::info!("Located {} paths", paths.len());
    replace_top_level(doc, &paths)?;
    Ok(paths.len())
}

/// Set the name of every feature matched by each selector
pub fn rename_features(doc: &mut Document, renames: &[(String, String)]) -> Result<usize> {
    let mut renamed = 0;
    for (selector, new_name) in renames {
        let nodes = select_features(doc, std::slice::from_ref(selector))?;
        tracing::info!("Renaming {} item(s) to '{new_name}'", nodes.len());
        for node in nodes {
            doc.set_child_text(node, "name", new_name);
            renamed += 1;
        }
    }
    Ok(renamed)
}

/// Number paths named "Path" or "Untitled Path" as "Path 0", "Path 1", ...
pub fn serialize_path_names(doc: &mut Document) -> usize {
    let targets: Vec<NodeId> = placemarks(doc)
        .into_iter()
        .filter(|&p| doc.child_element(p, "LineString").is_some())
        .filter(|&p| {
            matches!(
                doc.child_text(p, "name").as_deref(),
                Some("Path" | "Untitled Path")
            )
        })
        .collect();

    for (i, &node) in targets.iter().enumerate() {
        doc.set_child_text(node, "name", &format!("Path {i}"));
    }
    tracing::info!("Serialized {} path name(s)", targets.len());
    targets.len()
}

/// Split MultiGeometry paths into one Placemark per LineString
///
/// The first part stays in the original Placemark; the others are copies placed
/// right after it and named "<name> part N". Copies drop the `id` attribute.
/// Returns the number of Placemarks that were split.
pub fn demulti_paths(doc: &mut Document) -> usize {
    let multis: Vec<(NodeId, NodeId)> = placemarks(doc)
        .into_iter()
        .filter_map(|p| {
            doc.child_elements(p)
                .find(|&g| {
                    doc.local_name(g) == Some("MultiGeometry")
                        && doc.child_element(g, "LineString").is_some()
                })
                .map(|g| (p, g))
        })
        .collect();

    for &(placemark, geometry) in &multis {
        let segments = doc.descendants_named(geometry, "LineString");
        doc.remove(geometry);

        let template = doc.clone_subtree(placemark);
        doc.remove_attribute(template, "id");
        let base_name = doc
            .child_text(placemark, "name")
            .unwrap_or_else(|| "Untitled Path".to_string());

        let Some(parent) = doc.parent(placemark) else {
            continue;
        };
        let mut position = doc.index_of(parent, placemark).unwrap_or(0);

        for (i, &segment) in segments.iter().enumerate() {
            if i == 0 {
                doc.append_child(placemark, segment);
                continue;
            }
            let copy = doc.clone_subtree(template);
            doc.append_child(copy, segment);
            doc.set_child_text(copy, "name", &format!("{base_name} part {}", i + 1));
            position += 1;
            doc.insert_child(parent, position, copy);
        }

        tracing::debug!("Split '{base_name}' into {} path(s)", segments.len());
    }

    tracing::info!("Split {} MultiGeometry path(s)", multis.len());
    multis.len()
}

/// Remove every Style and StyleMap element and every Placemark `styleUrl`
pub fn remove_all_styles(doc: &mut Document) -> usize {
    let root = doc.document_node();
    let mut nodes: Vec<NodeId> = doc
        .descendants(root)
        .into_iter()
        .filter(|&n| matches!(doc.local_name(n), Some("Style" | "StyleMap")))
        .collect();
    for placemark in placemarks(doc) {
        nodes.extend(
            doc.child_elements(placemark)
                .filter(|&c| doc.local_name(c) == Some("styleUrl")),
        );
    }

    tracing::info!("Deleting {} style related item(s)", nodes.len());
    for &node in nodes.iter().rev() {
        doc.remove(node);
    }
    nodes.len()
}

/// Simplify every `coordinates` list of one Placemark
///
/// Lists with at most `config.min_points` points are left as they are.
/// Returns the point counts before and after. Nothing is rewritten when any
/// list of the Placemark cannot be read.
pub fn simplify_placemark(
    doc: &mut Document,
    placemark: NodeId,
    config: &SimplifyConfig,
) -> Result<(usize, usize)> {
    let mut lists = Vec::new();
    for node in coordinate_nodes(doc, placemark) {
        lists.push((node, parse_coordinates(&doc.text(node).unwrap_or_default())?));
    }

    let mut before = 0;
    let mut after = 0;
    for (node, coords) in lists {
        before += coords.len();
        if coords.len() > config.min_points {
            let simplified = simplify(&coords, config.tolerance, config.highest_quality);
            after += simplified.len();
            doc.set_text(node, &format_coordinates(&simplified, config.format));
        } else {
            after += coords.len();
        }
    }
    Ok((before, after))
}

/// Round the coordinates of one Placemark to six decimals
///
/// Nothing is rewritten when any list of the Placemark cannot be read.
pub fn optimize_placemark_coordinates(doc: &mut Document, placemark: NodeId) -> Result<()> {
    let mut lists = Vec::new();
    for node in coordinate_nodes(doc, placemark) {
        lists.push((node, optimize_coordinate_text(&doc.text(node).unwrap_or_default())?));
    }
    for (node, optimized) in lists {
        doc.set_text(node, &optimized);
    }
    Ok(())
}

/// Simplify every path Placemark of the document
pub fn simplify_paths(doc: &mut Document, config: &SimplifyConfig) -> SimplifyReport {
    let mut report = SimplifyReport::default();
    for placemark in placemarks(doc) {
        if !is_path_placemark(doc, placemark) {
            continue;
        }
        match simplify_placemark(doc, placemark, config) {
            Ok((before, after)) => {
                report.paths += 1;
                report.points_before += before;
                report.points_after += after;
            }
            Err(e) => tracing::warn!("Skipping path at {}: {e}", doc.path_of(placemark)),
        }
    }
    tracing::info!(
        "Simplified {} path(s): {} -> {} points",
        report.paths,
        report.points_before,
        report.points_after
    );
    report
}

/// Round the coordinates of every path Placemark to six decimals
pub fn optimize_coordinates(doc: &mut Document) -> usize {
    let mut optimized = 0;
    for placemark in placemarks(doc) {
        if !is_path_placemark(doc, placemark) {
            continue;
        }
        match optimize_placemark_coordinates(doc, placemark) {
            Ok(()) => optimized += 1,
            Err(e) => tracing::warn!("Skipping path at {}: {e}", doc.path_of(placemark)),
        }
    }
    optimized
}

/// How paths are rewritten while cropping
#[derive(Debug, Clone, Copy, Default)]
pub enum PathRewrite<'a> {
    #[default]
    None,
    Simplify(&'a SimplifyConfig),
    OptimizeCoordinates,
}

/// Remove every Placemark with no point inside `region`
///
/// Paths are rewritten first when requested. Placemarks without geometry are
/// removed; Placemarks that cannot be read are logged and kept.
pub fn crop_to_region(doc: &mut Document, region: &Region, rewrite: PathRewrite<'_>) -> CropReport {
    let mut report = CropReport::default();

    for placemark in placemarks(doc) {
        report.examined += 1;

        if is_path_placemark(doc, placemark) {
            let rewritten = match rewrite {
                PathRewrite::None => Ok(()),
                PathRewrite::Simplify(config) => simplify_placemark(doc, placemark, config).map(|_| ()),
                PathRewrite::OptimizeCoordinates => optimize_placemark_coordinates(doc, placemark),
            };
            if let Err(e) = rewritten {
                tracing::warn!("Could not rewrite path at {}: {e}", doc.path_of(placemark));
            }
        }

        let feature = match Feature::from_node(doc, placemark, FeatureId(report.examined - 1)) {
            Ok(feature) => feature,
            Err(e) => {
                tracing::warn!("Keeping unreadable feature at {}: {e}", doc.path_of(placemark));
                report.skipped += 1;
                continue;
            }
        };

        let verdict = classify(&feature.coordinates(), region);
        tracing::debug!(
            "Checking Placemark '{:>32}' against region: {}",
            feature.display_name(),
            verdict.map(|v| v.to_string()).unwrap_or_else(|| "no coordinates".to_string())
        );

        if verdict.is_some_and(|v| v.qualifies()) {
            report.kept += 1;
        } else {
            doc.remove(placemark);
            report.removed += 1;
        }
    }

    tracing::info!(
        "Region '{}': kept {} of {} placemarks, removed {}",
        region.name,
        report.kept,
        report.examined,
        report.removed
    );
    report
}

/// Find a Polygon Placemark by name, or the first Polygon inside a Folder of that name
pub fn find_region(doc: &Document, name: &str) -> Result<Region> {
    let wanted = normalize_space(name);
    let name_matches =
        |node: NodeId| doc.child_text(node, "name").is_some_and(|n| normalize_space(&n) == wanted);
    let has_polygon = |node: NodeId| doc.child_element(node, "Polygon").is_some();

    let all = doc.descendants(doc.document_node());

    let placemark = all
        .iter()
        .copied()
        .find(|&n| doc.local_name(n) == Some("Placemark") && has_polygon(n) && name_matches(n))
        .or_else(|| {
            let folder = all
                .iter()
                .copied()
                .find(|&n| doc.local_name(n) == Some("Folder") && name_matches(n))?;
            doc.descendants_named(folder, "Placemark")
                .into_iter()
                .find(|&p| has_polygon(p))
        })
        .ok_or_else(|| KmlError::RegionNotFound(name.to_string()))?;

    let feature = Feature::from_node(doc, placemark, FeatureId(0))?;
    let mut region = Region::from_feature(&feature)?;
    region.name = name.to_string();
    tracing::info!("Found region '{name}' with {} coordinates", region.ring.len());
    Ok(region)
}

/// A Polygon Placemark named like a folder boundary
fn is_boundary_placemark(doc: &Document, node: NodeId, config: &FolderizeConfig) -> bool {
    doc.local_name(node) == Some("Placemark")
        && doc.child_element(node, "Polygon").is_some()
        && doc
            .child_text(node, "name")
            .is_some_and(|n| config.is_boundary_name(&n))
}

/// Folders holding a boundary Polygon Placemark, with the first such Placemark
fn boundary_folders(doc: &Document, config: &FolderizeConfig) -> Vec<(NodeId, NodeId)> {
    doc.descendants_named(doc.document_node(), "Folder")
        .into_iter()
        .filter_map(|folder| {
            doc.child_elements(folder)
                .find(|&p| is_boundary_placemark(doc, p, config))
                .map(|p| (folder, p))
        })
        .collect()
}

/// Move every feature into the boundary folder that holds most of its points
///
/// A folder qualifies when its boundary holds strictly more than
/// `config.threshold` of the feature's points. Ties go to the smaller boundary.
/// Boundary polygons never move, including extra ones sharing a folder.
pub fn folderize(doc: &mut Document, config: &FolderizeConfig) -> FolderizeReport {
    let mut report = FolderizeReport::default();

    let mut folders = Vec::new();
    let mut regions = Vec::new();
    for (folder, placemark) in boundary_folders(doc, config) {
        let folder_name = doc.child_text(folder, "name").unwrap_or_default();
        let region = Feature::from_node(doc, placemark, FeatureId(0))
            .and_then(|f| Region::from_feature(&f));
        match region {
            Ok(mut region) => {
                region.name = folder_name.clone();
                report.boundaries.push(folder_name);
                folders.push(folder);
                regions.push(region);
            }
            Err(e) => tracing::warn!("Ignoring boundary of folder '{folder_name}': {e}"),
        }
    }
    tracing::info!("Found {} boundary folder(s)", regions.len());

    let matcher = RegionMatcher::new(regions, config.threshold);

    for placemark in placemarks(doc) {
        if is_boundary_placemark(doc, placemark, config) {
            continue;
        }
        let feature = match Feature::from_node(doc, placemark, FeatureId(report.examined)) {
            Ok(feature) => feature,
            Err(e) => {
                tracing::warn!("Skipping feature at {}: {e}", doc.path_of(placemark));
                continue;
            }
        };
        report.examined += 1;

        let coords = feature.coordinates();
        if tracing::enabled!(tracing::Level::TRACE) {
            for region in &matcher.regions {
                if let Some(verdict) = classify(&coords, region) {
                    tracing::trace!(
                        "{:20.20} {:20.20} {:>6.2}% {verdict}",
                        region.name,
                        feature.display_name(),
                        verdict.ratio() * 100.0
                    );
                }
            }
        }

        let Some((index, verdict)) = matcher.best_match(&coords) else {
            continue;
        };
        let folder = folders[index];
        if doc.parent(placemark) == Some(folder) {
            continue;
        }

        tracing::debug!(
            "Moving '{}' into '{}'",
            feature.display_name(),
            matcher.regions[index].name
        );
        doc.append_child(folder, placemark);
        report.moves.push(FolderMove {
            feature: feature.display_name().to_string(),
            folder: matcher.regions[index].name.clone(),
            ratio: verdict.ratio(),
        });
    }

    tracing::info!(
        "Folderized {} of {} feature(s)",
        report.moves.len(),
        report.examined
    );
    report
}

/// Import features and the styles they use from another document
///
/// Without selectors the top-level features of `other` are imported. Imported
/// styles go before the first feature of the target container; an id already
/// used in the target is renamed `<id>-001`, `<id>-002`, ...
pub fn combine(doc: &mut Document, other: &Document, selectors: &[String]) -> Result<CombineReport> {
    let nodes = if selectors.is_empty() {
        top_level_features(other, other.container_element()?)
    } else {
        select_features(other, selectors)?
    };
    if nodes.is_empty() {
        tracing::warn!("No features were found in the document to combine");
    } else {
        tracing::info!("{} features were found in the document to combine", nodes.len());
    }

    let container = doc.container_element()?;
    let mut style_position = doc
        .children(container)
        .iter()
        .position(|&c| is_feature(doc, c))
        .unwrap_or(doc.children(container).len());

    let source_ids = other.id_index();
    let mut imported_styles: HashMap<String, String> = HashMap::new();
    let mut report = CombineReport::default();

    for node in nodes {
        let imported = doc.import_subtree(other, node);
        doc.append_child(container, imported);
        report.features += 1;

        let mut pending = vec![imported];
        while let Some(subtree) = pending.pop() {
            for url in doc.descendants_named(subtree, "styleUrl") {
                let Some(text) = doc.text(url) else {
                    continue;
                };
                let Some(style_id) = text.trim().strip_prefix('#').map(str::to_string) else {
                    continue;
                };

                if let Some(new_id) = imported_styles.get(&style_id) {
                    doc.set_text(url, &format!("#{new_id}"));
                    continue;
                }

                let Some(&source) = source_ids.get(&style_id) else {
                    tracing::warn!("Style/StyleMap not found with id '{style_id}'");
                    continue;
                };

                let taken = doc.id_index();
                let mut new_id = style_id.clone();
                let mut i = 0;
                while taken.contains_key(&new_id) {
                    i += 1;
                    new_id = format!("{style_id}-{i:03}");
                }

                let style = doc.import_subtree(other, source);
                if new_id != style_id {
                    doc.set_attribute(style, "id", &new_id);
                    report.renamed_styles.push((style_id.clone(), new_id.clone()));
                }
                doc.set_text(url, &format!("#{new_id}"));
                doc.insert_child(container, style_position, style);
                style_position += 1;
                report.styles += 1;
                imported_styles.insert(style_id, new_id);

                // StyleMaps reference further styles
                pending.push(style);
            }
        }
    }

    tracing::info!(
        "Combined {} feature(s) and {} style(s)",
        report.features,
        report.styles
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoordinateFormat, FeatureArena, GeometryKind};

    fn doc(body: &str) -> Document {
        Document::parse(&format!(
            r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document><name>Test</name>{body}</Document></kml>"#
        ))
        .unwrap()
    }

    fn names(doc: &Document) -> Vec<String> {
        placemarks(doc)
            .into_iter()
            .filter_map(|p| doc.child_text(p, "name"))
            .collect()
    }

    fn top_names(doc: &Document) -> Vec<String> {
        let container = doc.container_element().unwrap();
        top_level_features(doc, container)
            .into_iter()
            .filter_map(|n| doc.child_text(n, "name"))
            .collect()
    }

    fn line(name: &str, coords: &str) -> String {
        format!("<Placemark><name>{name}</name><LineString><coordinates>{coords}</coordinates></LineString></Placemark>")
    }

    fn point(name: &str, coords: &str) -> String {
        format!("<Placemark><name>{name}</name><Point><coordinates>{coords}</coordinates></Point></Placemark>")
    }

    fn polygon(name: &str, coords: &str) -> String {
        format!(
            "<Placemark><name>{name}</name><Polygon><outerBoundaryIs><LinearRing><coordinates>{coords}</coordinates></LinearRing></outerBoundaryIs></Polygon></Placemark>"
        )
    }

    const SQUARE: &str = "0,0 10,0 10,10 0,10 0,0";

    #[test]
    fn test_delete_features() {
        let mut d = doc(&format!(
            "<Folder><name>F</name>{}{}</Folder>{}",
            line("a", "0,0 1,1"),
            line("b", "0,0 1,1"),
            point("c", "0,0")
        ));
        let deleted = delete_features(&mut d, &["b".to_string(), "c".to_string()]).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(names(&d), vec!["a"]);
    }

    #[test]
    fn test_extract_features() {
        let mut d = doc(&format!(
            "<Folder><name>F</name>{}{}</Folder>{}",
            line("a", "0,0 1,1"),
            line("b", "0,0 1,1"),
            point("c", "0,0")
        ));
        extract_features(&mut d, &["b".to_string()]).unwrap();
        assert_eq!(top_names(&d), vec!["b"]);
        assert_eq!(names(&d), vec!["b"]);
    }

    #[test]
    fn test_paths_only() {
        let mut d = doc(&format!(
            "<Folder><name>F</name>{}{}</Folder>{}",
            line("a", "0,0 1,1"),
            point("p", "0,0"),
            line("b", "0,0 1,1")
        ));
        assert_eq!(paths_only(&mut d).unwrap(), 2);
        assert_eq!(top_names(&d), vec!["a", "b"]);
    }

    #[test]
    fn test_rename_and_serialize() {
        let mut d = doc(&format!(
            "{}{}{}{}",
            line("Path", "0,0 1,1"),
            line("Untitled Path", "0,0 1,1"),
            point("Path", "0,0"),
            line("Keep", "0,0 1,1")
        ));
        assert_eq!(serialize_path_names(&mut d), 2);
        assert_eq!(names(&d), vec!["Path 0", "Path 1", "Path", "Keep"]);

        let renamed = rename_features(&mut d, &[("Keep".to_string(), "Kept".to_string())]).unwrap();
        assert_eq!(renamed, 1);
        assert_eq!(names(&d)[3], "Kept");
    }

    #[test]
    fn test_demulti_paths() {
        let mut d = doc(
            r#"<Placemark id="m"><name>Loop</name><MultiGeometry>
<LineString><coordinates>0,0 1,0</coordinates></LineString>
<LineString><coordinates>1,0 2,0</coordinates></LineString>
<LineString><coordinates>2,0 3,0</coordinates></LineString>
</MultiGeometry></Placemark>
<Placemark><name>Single</name><MultiGeometry><LineString><coordinates>5,5 6,6</coordinates></LineString></MultiGeometry></Placemark>"#,
        );
        assert_eq!(demulti_paths(&mut d), 2);
        assert_eq!(names(&d), vec!["Loop", "Loop part 2", "Loop part 3", "Single"]);

        let arena = FeatureArena::from_document(&d);
        assert_eq!(arena.len(), 4);
        assert!(arena.iter().all(|f| f.kind() == Some(GeometryKind::Path)));
        let ids: Vec<Option<&str>> = placemarks(&d).iter().map(|&p| d.attribute(p, "id")).collect();
        assert_eq!(ids, vec![Some("m"), None, None, None]);
    }

    #[test]
    fn test_remove_all_styles() {
        let mut d = doc(
            r##"<Style id="s"/><StyleMap id="m"/><Placemark><name>a</name><styleUrl>#s</styleUrl><Style><LineStyle/></Style></Placemark>"##,
        );
        assert_eq!(remove_all_styles(&mut d), 4);
        let xml = d.to_xml(false).unwrap();
        assert!(!xml.contains("Style"));
        assert!(!xml.contains("styleUrl"));
    }

    #[test]
    fn test_simplify_paths_threshold() {
        let straight: Vec<String> = (0..12).map(|i| format!("{i},0")).collect();
        let short: Vec<String> = (0..10).map(|i| format!("{i},0")).collect();
        let mut d = doc(&format!(
            "{}{}",
            line("long", &straight.join(" ")),
            line("short", &short.join(" "))
        ));

        let report = simplify_paths(&mut d, &SimplifyConfig::default());
        assert_eq!(report.paths, 2);
        assert_eq!(report.points_before, 22);
        assert_eq!(report.points_after, 12);

        let arena = FeatureArena::from_document(&d);
        assert_eq!(arena.get(FeatureId(0)).unwrap().coordinates().len(), 2);
        assert_eq!(arena.get(FeatureId(1)).unwrap().coordinates().len(), 10);
    }

    #[test]
    fn test_simplify_fixed_format() {
        let coords: Vec<String> = (0..12).map(|i| format!("{}.1234567,0.5", i)).collect();
        let mut d = doc(&line("long", &coords.join(" ")));
        let config = SimplifyConfig {
            format: CoordinateFormat::Fixed6,
            ..SimplifyConfig::default()
        };
        simplify_paths(&mut d, &config);
        let node = d.descendants_named(d.document_node(), "coordinates")[0];
        assert_eq!(d.text(node).as_deref(), Some("0.123457,0.5 11.123457,0.5"));
    }

    #[test]
    fn test_optimize_coordinates() {
        let mut d = doc(&format!(
            "{}{}",
            line("a", "1.123456789,2.5,0 3,4"),
            point("p", "1.123456789,2")
        ));
        assert_eq!(optimize_coordinates(&mut d), 1);
        let nodes = d.descendants_named(d.document_node(), "coordinates");
        assert_eq!(d.text(nodes[0]).as_deref(), Some("1.123457,2.5,0 3,4"));
        assert_eq!(d.text(nodes[1]).as_deref(), Some("1.123456789,2"));
    }

    #[test]
    fn test_unreadable_list_leaves_placemark_untouched() {
        let wiggle: Vec<String> = (0..20).map(|i| format!("{i},{}", i % 2)).collect();
        let wiggle = wiggle.join(" ");
        let mut d = doc(&format!(
            "<Placemark><name>split</name><MultiGeometry>\
             <LineString><coordinates>{wiggle}</coordinates></LineString>\
             <LineString><coordinates>1.123456789,2 x,y</coordinates></LineString>\
             </MultiGeometry></Placemark>"
        ));
        let placemark = placemarks(&d)[0];
        let config = SimplifyConfig {
            tolerance: 10.0,
            ..SimplifyConfig::default()
        };

        assert!(simplify_placemark(&mut d, placemark, &config).is_err());
        assert!(optimize_placemark_coordinates(&mut d, placemark).is_err());
        let nodes = d.descendants_named(d.document_node(), "coordinates");
        assert_eq!(d.text(nodes[0]).as_deref(), Some(wiggle.as_str()));
        assert_eq!(d.text(nodes[1]).as_deref(), Some("1.123456789,2 x,y"));
    }

    #[test]
    fn test_crop_to_region() {
        let mut d = doc(&format!(
            "{}{}{}{}<Placemark><name>bare</name></Placemark>{}",
            line("inside", "1,1 2,2"),
            line("crossing", "5,5 15,5"),
            line("outside", "20,20 30,30"),
            point("far", "50,50"),
            line("broken", "1,1 x,y")
        ));
        let region = Region::new("Box", parse_coordinates(SQUARE).unwrap()).unwrap();
        let report = crop_to_region(&mut d, &region, PathRewrite::None);

        assert_eq!(names(&d), vec!["inside", "crossing", "broken"]);
        assert_eq!(
            report,
            CropReport {
                examined: 6,
                kept: 2,
                removed: 3,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_find_region() {
        let d = doc(&format!(
            "{}<Folder><name>Park</name>{}{}</Folder>",
            polygon("Lake", "0,0 1,0 1,1 0,1"),
            line("trail", "0,0 1,1"),
            polygon("Outline", SQUARE)
        ));

        let lake = find_region(&d, "Lake").unwrap();
        assert_eq!(lake.area, 1.0);

        let park = find_region(&d, "Park").unwrap();
        assert_eq!(park.name, "Park");
        assert_eq!(park.area, 100.0);

        assert!(matches!(
            find_region(&d, "Nowhere"),
            Err(KmlError::RegionNotFound(_))
        ));
    }

    #[test]
    fn test_folderize() {
        let mut d = doc(&format!(
            "<Folder><name>West</name>{}</Folder><Folder><name>East</name>{}</Folder>{}{}{}",
            polygon("Boundary", SQUARE),
            polygon("Boundry", "10,0 20,0 20,10 10,10 10,0"),
            line("east trail", "9,5 12,5 14,5"),
            point("west spring", "3,3"),
            point("nowhere", "50,50")
        ));
        let report = folderize(&mut d, &FolderizeConfig::default());

        assert_eq!(report.boundaries, vec!["West", "East"]);
        assert_eq!(report.examined, 3);
        assert_eq!(report.moves.len(), 2);
        assert_eq!(report.moves[0].folder, "East");
        assert_eq!(report.moves[1].folder, "West");

        assert_eq!(top_names(&d), vec!["West", "East", "nowhere"]);
        let west = d
            .child_elements(d.container_element().unwrap())
            .find(|&n| d.child_text(n, "name").as_deref() == Some("West"))
            .unwrap();
        assert_eq!(
            d.descendants_named(west, "Placemark").len(),
            2,
            "boundary plus the spring"
        );
    }

    #[test]
    fn test_folderize_keeps_every_boundary_in_place() {
        let mut d = doc(&format!(
            "<Folder><name>West</name>{}{}</Folder><Folder><name>East</name>{}</Folder>",
            polygon("Boundary", SQUARE),
            polygon("Boundary", "12,2 18,2 18,8 12,8 12,2"),
            polygon("Boundary", "10,0 20,0 20,10 10,10 10,0"),
        ));
        let report = folderize(&mut d, &FolderizeConfig::default());

        assert_eq!(report.boundaries, vec!["West", "East"]);
        assert_eq!(report.examined, 0);
        assert!(report.moves.is_empty());
        let west = d
            .child_elements(d.container_element().unwrap())
            .find(|&n| d.child_text(n, "name").as_deref() == Some("West"))
            .unwrap();
        assert_eq!(d.descendants_named(west, "Placemark").len(), 2);
    }

    #[test]
    fn test_combine_imports_styles() {
        let mut d = doc(
            r##"<Style id="red"><LineStyle><color>ff0000ff</color></LineStyle></Style>
<Placemark><name>local</name><styleUrl>#red</styleUrl><LineString><coordinates>0,0 1,1</coordinates></LineString></Placemark>"##,
        );
        let other = doc(r##"
<Style id="red"><LineStyle><color>ff00ff00</color></LineStyle></Style>
<Style id="n"><LineStyle><width>2</width></LineStyle></Style>
<StyleMap id="map"><Pair><key>normal</key><styleUrl>#n</styleUrl></Pair></StyleMap>
<Placemark><name>a</name><styleUrl>#red</styleUrl><LineString><coordinates>0,0 1,1</coordinates></LineString></Placemark>
<Placemark><name>b</name><styleUrl>#map</styleUrl><LineString><coordinates>0,0 1,1</coordinates></LineString></Placemark>
<Placemark><name>c</name><styleUrl>#red</styleUrl><LineString><coordinates>0,0 1,1</coordinates></LineString></Placemark>"##);

        let report = combine(&mut d, &other, &[]).unwrap();
        assert_eq!(report.features, 3);
        assert_eq!(report.styles, 3);
        assert_eq!(report.renamed_styles, vec![("red".to_string(), "red-001".to_string())]);

        assert_eq!(names(&d), vec!["local", "a", "b", "c"]);
        let urls: Vec<String> = d
            .descendants_named(d.document_node(), "styleUrl")
            .into_iter()
            .filter_map(|n| d.text(n))
            .collect();
        assert_eq!(urls, vec!["#n", "#red", "#red-001", "#map", "#red-001"]);

        let validation = crate::validate_styles(&d);
        assert!(validation.is_clean(), "{validation:?}");
    }
}
