//! KML Utility Library - Core Data Structures for KML Editing and Analysis
//!
//! This library parses KML documents into an editable tree, extracts geographic
//! features from it and runs the numerical parts of the toolkit over their
//! coordinates: great-circle lengths, planar areas, point-in-polygon containment,
//! path simplification and style de-duplication.
//!
//! # Architecture
//!
//! - **[`Document`]**: Arena-backed XML tree, the single owner of all nodes
//! - **[`FeatureArena`]**: Placemarks projected into tagged [`Geometry`] records
//! - **[`geometry`]**: Haversine distance, shoelace area and ray casting
//! - **[`simplify()`]**: Radial-distance pre-pass plus Douglas–Peucker reduction
//! - **[`Region`]**: Containment boundary producing a [`ContainmentVerdict`]
//! - **[`StyleIndex`]**: Per-run style index driving [`deduplicate_styles`]
//! - **[`edit`]**: Document mutations (crop, folderize, delete, combine, ...)
//!
//! # Processing Model
//!
//! - **Ownership**: one `Document` per run, mutated in place through `&mut`
//! - **Failures**: a feature that cannot be extracted is logged and skipped;
//!   the rest of the document is still processed

mod config;
mod coords;
pub mod edit;
mod feature;
pub mod geometry;
#[cfg(feature = "serde")]
pub mod geojson;
pub mod query;
mod region;
mod simplify;
pub mod stats;
mod style;
mod tree;

// Public API exports
pub use config::{
    Config, DEFAULT_FOLDERIZE_THRESHOLD, DEFAULT_MIN_POINTS_FOR_SIMPLIFY, DEFAULT_PATH_ERROR_LIMIT,
    FolderizeConfig, SimplifyConfig, StyleConfig, StyleIdPolicy,
};
pub use coords::{
    Coordinate, CoordinateFormat, format_coordinates, format_number, optimize_coordinate_text,
    parse_coordinates,
};
pub use feature::{Feature, FeatureArena, FeatureId, Geometry, GeometryKind};
pub use query::Selector;
pub use region::{ContainmentVerdict, Region, RegionMatcher, classify};
pub use simplify::{simplify, simplify_indices};
pub use style::{
    PathStyle, StyleIndex, StyleKind, StyleRecord, StyleReference, StyleRemap, StyleValidation,
    deduplicate_styles, signature, validate_styles,
};
pub use tree::{Document, NodeId, NodeKind};

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum KmlError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Feature '{feature}' is not usable: {reason}")]
    Structural { feature: String, reason: String },

    #[error("Invalid coordinate '{text}': {reason}")]
    InvalidCoordinate { text: String, reason: String },

    #[error("Unresolved style reference: #{0}")]
    UnresolvedReference(String),

    #[error("Region not found: {0}")]
    RegionNotFound(String),

    #[error("Region '{0}' has no coordinates")]
    EmptyRegion(String),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Unsupported document root, expected a kml element with a Document or Folder")]
    UnsupportedRoot,

    #[error("Serialized document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KmlError {
    pub(crate) fn structural(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        KmlError::Structural {
            feature: feature.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KmlError>;
