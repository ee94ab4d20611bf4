//! Placemark features extracted from the document tree
//!
//! A [`Feature`] is a read-only projection of one `Placemark` element: its name,
//! style reference and geometry. Features point back at their element through a
//! [`NodeId`] but own nothing in the tree; edits go through the [`Document`].

use crate::geometry::{bounding_rect, path_length};
use crate::{Coordinate, Document, KmlError, NodeId, Result, parse_coordinates};
use geo::Rect;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable index of a feature within its [`FeatureArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureId(pub usize);

/// Geometry type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GeometryKind {
    Point,
    Path,
    Polygon,
    MultiPath,
    MultiPolygon,
}

impl GeometryKind {
    /// Paths and multi-paths
    #[inline]
    pub fn is_path(self) -> bool {
        matches!(self, GeometryKind::Path | GeometryKind::MultiPath)
    }

    /// Polygons and multi-polygons
    #[inline]
    pub fn is_polygon(self) -> bool {
        matches!(self, GeometryKind::Polygon | GeometryKind::MultiPolygon)
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryKind::Point => "Point",
            GeometryKind::Path => "Path",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPath => "MultiPath",
            GeometryKind::MultiPolygon => "MultiPolygon",
        };
        f.write_str(name)
    }
}

/// Feature geometry
///
/// Polygons only carry their outer boundary; inner boundaries are ignored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Geometry {
    Point(Coordinate),
    Path(Vec<Coordinate>),
    Polygon(Vec<Coordinate>),
    MultiPath(Vec<Vec<Coordinate>>),
    MultiPolygon(Vec<Vec<Coordinate>>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::Path(_) => GeometryKind::Path,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPath(_) => GeometryKind::MultiPath,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    /// Every coordinate of every part, in document order
    pub fn coordinates(&self) -> Vec<Coordinate> {
        match self {
            Geometry::Point(c) => vec![*c],
            Geometry::Path(coords) | Geometry::Polygon(coords) => coords.clone(),
            Geometry::MultiPath(parts) | Geometry::MultiPolygon(parts) => {
                parts.iter().flatten().copied().collect()
            }
        }
    }

    /// Number of coordinates across all parts
    pub fn point_count(&self) -> usize {
        match self {
            Geometry::Point(_) => 1,
            Geometry::Path(coords) | Geometry::Polygon(coords) => coords.len(),
            Geometry::MultiPath(parts) | Geometry::MultiPolygon(parts) => {
                parts.iter().map(Vec::len).sum()
            }
        }
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        bounding_rect(&self.coordinates())
    }

    /// Great-circle length of the path parts in kilometers, 0 for other geometry
    pub fn length_km(&self) -> f64 {
        match self {
            Geometry::Path(coords) => path_length(coords),
            Geometry::MultiPath(parts) => parts.iter().map(|p| path_length(p)).sum(),
            Geometry::Point(_) | Geometry::Polygon(_) | Geometry::MultiPolygon(_) => 0.0,
        }
    }
}

/// A Placemark projected out of the document tree
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: FeatureId,
    /// The `Placemark` element this feature was read from
    pub node: NodeId,
    pub name: Option<String>,
    /// `None` for a placemark without any geometry element
    pub geometry: Option<Geometry>,
    pub style_url: Option<String>,
}

const GEOMETRY_TAGS: [&str; 4] = ["Point", "LineString", "Polygon", "MultiGeometry"];

impl Feature {
    /// Extract a feature from a `Placemark` element
    ///
    /// Fails with [`KmlError::Structural`] for a geometry without coordinates or a
    /// MultiGeometry mixing paths and polygons, and with
    /// [`KmlError::InvalidCoordinate`] for malformed coordinate text.
    pub fn from_node(doc: &Document, node: NodeId, id: FeatureId) -> Result<Self> {
        let name = doc.child_text(node, "name");
        let style_url = doc.child_text(node, "styleUrl");
        let label = name.clone().unwrap_or_else(|| "<unnamed>".to_string());

        let geometry_node = doc
            .child_elements(node)
            .find(|&c| doc.local_name(c).is_some_and(|n| GEOMETRY_TAGS.contains(&n)));

        let geometry = match geometry_node {
            Some(g) => Some(read_geometry(doc, g, &label)?),
            None => None,
        };

        Ok(Self {
            id,
            node,
            name,
            geometry,
            style_url,
        })
    }

    #[inline]
    pub fn kind(&self) -> Option<GeometryKind> {
        self.geometry.as_ref().map(Geometry::kind)
    }

    /// Flattened coordinates, empty when there is no geometry
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.geometry
            .as_ref()
            .map(Geometry::coordinates)
            .unwrap_or_default()
    }

    /// Name for messages
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

fn read_geometry(doc: &Document, node: NodeId, label: &str) -> Result<Geometry> {
    match doc.local_name(node) {
        Some("Point") => {
            let coords = read_coordinates(doc, node, label)?;
            Ok(Geometry::Point(coords[0]))
        }
        Some("LineString") => Ok(Geometry::Path(read_coordinates(doc, node, label)?)),
        Some("Polygon") => Ok(Geometry::Polygon(read_outer_ring(doc, node, label)?)),
        Some("MultiGeometry") => read_multi_geometry(doc, node, label),
        Some(other) => Err(KmlError::structural(
            label,
            format!("unsupported geometry element {other}"),
        )),
        None => Err(KmlError::structural(label, "geometry is not an element")),
    }
}

fn read_multi_geometry(doc: &Document, node: NodeId, label: &str) -> Result<Geometry> {
    let mut paths = Vec::new();
    let mut polygons = Vec::new();

    for part in doc.child_elements(node) {
        match doc.local_name(part) {
            Some("LineString") => paths.push(read_coordinates(doc, part, label)?),
            Some("Polygon") => polygons.push(read_outer_ring(doc, part, label)?),
            Some(other) if GEOMETRY_TAGS.contains(&other) => {
                return Err(KmlError::structural(
                    label,
                    format!("unsupported {other} inside MultiGeometry"),
                ));
            }
            _ => {}
        }
    }

    match (paths.is_empty(), polygons.is_empty()) {
        (false, true) => Ok(Geometry::MultiPath(paths)),
        (true, false) => Ok(Geometry::MultiPolygon(polygons)),
        (false, false) => Err(KmlError::structural(
            label,
            "MultiGeometry mixes paths and polygons",
        )),
        (true, true) => Err(KmlError::structural(label, "MultiGeometry is empty")),
    }
}

fn read_outer_ring(doc: &Document, polygon: NodeId, label: &str) -> Result<Vec<Coordinate>> {
    let ring = doc
        .child_element(polygon, "outerBoundaryIs")
        .and_then(|outer| doc.child_element(outer, "LinearRing"));
    match ring {
        Some(ring) => read_coordinates(doc, ring, label),
        None => Err(KmlError::structural(label, "polygon has no outer boundary")),
    }
}

/// Parse the joined text of every `coordinates` element below `node`
fn read_coordinates(doc: &Document, node: NodeId, label: &str) -> Result<Vec<Coordinate>> {
    let text = coordinate_nodes(doc, node)
        .into_iter()
        .filter_map(|c| doc.text(c))
        .collect::<Vec<_>>()
        .join(" ");
    let coords = parse_coordinates(&text)?;
    if coords.is_empty() {
        return Err(KmlError::structural(label, "no coordinates"));
    }
    Ok(coords)
}

/// All `coordinates` elements below a node, in document order
pub(crate) fn coordinate_nodes(doc: &Document, node: NodeId) -> Vec<NodeId> {
    doc.descendants_named(node, "coordinates")
}

/// All features of a document, indexed by [`FeatureId`]
#[derive(Debug, Clone, Default)]
pub struct FeatureArena {
    features: Vec<Feature>,
}

impl FeatureArena {
    /// Extract every attached Placemark in document order
    ///
    /// Placemarks that fail extraction are logged and skipped.
    pub fn from_document(doc: &Document) -> Self {
        Self::from_nodes(doc, doc.descendants_named(doc.document_node(), "Placemark"))
    }

    /// Extract the given Placemark elements
    pub fn from_nodes(doc: &Document, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        let mut features = Vec::new();
        for node in nodes {
            let id = FeatureId(features.len());
            match Feature::from_node(doc, node, id) {
                Ok(feature) => features.push(feature),
                Err(e) => tracing::warn!("Skipping feature at {}: {e}", doc.path_of(node)),
            }
        }
        tracing::debug!("Extracted {} features", features.len());
        Self { features }
    }

    #[inline]
    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn find_by_node(&self, node: NodeId) -> Option<&Feature> {
        self.features.iter().find(|f| f.node == node)
    }
}

impl<'a> IntoIterator for &'a FeatureArena {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
