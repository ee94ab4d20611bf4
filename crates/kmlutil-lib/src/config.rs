//! Processing configuration
//!
//! Every knob of the editing pipeline lives here so a single [`Config`] value can be
//! built once (from the command line or a test) and passed by reference to the
//! operations that need it.

use crate::CoordinateFormat;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default simplification tolerance in degrees
pub const DEFAULT_PATH_ERROR_LIMIT: f64 = 0.00001;

/// Paths with this many points or fewer are left alone by the simplifier
pub const DEFAULT_MIN_POINTS_FOR_SIMPLIFY: usize = 10;

/// Minimum share of a feature's points that must fall inside a boundary for folderizing
pub const DEFAULT_FOLDERIZE_THRESHOLD: f64 = 0.35;

/// Top-level configuration for a processing run
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Path simplification settings
    pub simplify: SimplifyConfig,
    /// Boundary folder assignment settings
    pub folderize: FolderizeConfig,
    /// Style de-duplication settings
    pub style: StyleConfig,
}

/// Settings for path simplification and coordinate output
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimplifyConfig {
    /// Maximum allowed deviation, in coordinate units (degrees)
    pub tolerance: f64,
    /// Skip the radial-distance pre-pass and run Douglas–Peucker on every point
    pub highest_quality: bool,
    /// Paths with at most this many points are not simplified
    pub min_points: usize,
    /// Number formatting used when writing simplified coordinates back
    pub format: CoordinateFormat,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_PATH_ERROR_LIMIT,
            highest_quality: true,
            min_points: DEFAULT_MIN_POINTS_FOR_SIMPLIFY,
            format: CoordinateFormat::Shortest,
        }
    }
}

/// Settings for moving features into boundary folders
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FolderizeConfig {
    /// A boundary must contain strictly more than this share of a feature's points
    pub threshold: f64,
    /// Names of the Polygon Placemark that marks a folder as a boundary folder
    pub boundary_names: Vec<String>,
}

impl Default for FolderizeConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FOLDERIZE_THRESHOLD,
            boundary_names: vec!["Boundary".to_string(), "Boundry".to_string()],
        }
    }
}

impl FolderizeConfig {
    /// Check whether a placemark name marks a boundary polygon
    pub fn is_boundary_name(&self, name: &str) -> bool {
        self.boundary_names.iter().any(|n| n == name.trim())
    }
}

/// How surviving style records are identified after de-duplication
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StyleIdPolicy {
    /// Survivors keep their first-inserted id; a fresh one is only made on collision
    #[default]
    Preserve,
    /// Survivors are renamed `S1`, `S2`, ... in signature insertion order
    Renumber,
}

/// Settings for style de-duplication
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StyleConfig {
    pub id_policy: StyleIdPolicy,
}
