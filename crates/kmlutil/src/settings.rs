use clap::{ArgAction, Parser, ValueEnum};
use kmlutil_lib::{
    Config, CoordinateFormat, DEFAULT_FOLDERIZE_THRESHOLD, DEFAULT_PATH_ERROR_LIMIT, StyleIdPolicy,
};
use std::path::PathBuf;

/// Format of the reports written next to the document (stats, lists, tables)
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// kmlutil - Edit, crop, simplify and analyze KML files
pub struct Settings {
    /// KML file to process
    #[clap(value_name = "KMLFILE")]
    pub kmlfile: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides it
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    // === Region cropping ===
    /// Drop every Placemark with no point inside the named region polygon or folder
    #[clap(short, long, value_name = "NAME")]
    pub region: Option<String>,

    /// Read the region from this KML file instead of the input
    #[clap(long, value_name = "FILE", requires = "region")]
    pub region_file: Option<PathBuf>,

    // === Optimisation ===
    /// Simplify paths with more than 10 points
    #[clap(long)]
    pub optimize_paths: bool,

    /// Merge identical styles and drop unreferenced ones
    #[clap(long)]
    pub optimize_styles: bool,

    /// Round coordinates of paths to six decimals
    #[clap(long)]
    pub optimize_coordinates: bool,

    /// Maximum deviation allowed when simplifying paths, in degrees
    #[clap(long, value_name = "DEGREES", default_value_t = DEFAULT_PATH_ERROR_LIMIT)]
    pub path_error_limit: f64,

    /// Use the radial-distance pre-pass before Douglas-Peucker
    #[clap(long)]
    pub fast_simplify: bool,

    /// Rename merged styles S1, S2, ... instead of keeping their first id
    #[clap(long, requires = "optimize_styles")]
    pub renumber_styles: bool,

    // === Statistics ===
    /// Report element, point and path style counts before and after processing
    #[clap(short, long)]
    pub stats: bool,

    /// Include coordinate point counts even when paths are not simplified
    #[clap(long, requires = "stats")]
    pub stats_detail: bool,

    #[clap(long, value_enum, default_value_t = ReportFormat::Text)]
    pub stats_format: ReportFormat,

    // === Output ===
    /// Write the document here instead of standard output
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Do not write the document
    #[clap(long, conflicts_with = "output")]
    pub no_kml_out: bool,

    /// Indent the written document and JSON reports
    #[clap(short, long)]
    pub pretty_print: bool,

    /// Write the paths as GeoJSON instead of KML
    #[clap(long)]
    pub geojson: bool,

    // === Listing ===
    /// List Documents, Folders and Placemarks
    #[clap(short, long)]
    pub list: bool,

    /// Like --list, indented by nesting level
    #[clap(short, long)]
    pub tree: bool,

    #[clap(long, value_enum, default_value_t = ReportFormat::Text)]
    pub list_format: ReportFormat,

    /// Add point counts and lengths to the listing
    #[clap(long)]
    pub list_detail: bool,

    /// Add the location path of every listed element
    #[clap(long)]
    pub list_with_xpaths: bool,

    /// Only list these types (comma separated, aliases such as Path or Trail allowed)
    #[clap(short, long, value_name = "TYPES")]
    pub filter: Option<String>,

    /// Print the namespaces declared on the root element
    #[clap(long)]
    pub namespaces: bool,

    /// Print the coordinates of the selected features, one point per line
    #[clap(long, value_name = "SELECTOR")]
    pub dump: Vec<String>,

    // === Folderize ===
    /// Move features into the boundary folder that contains most of their points
    #[clap(long)]
    pub folderize: bool,

    /// Share of points a boundary must contain to receive a feature
    #[clap(long, value_name = "RATIO", default_value_t = DEFAULT_FOLDERIZE_THRESHOLD)]
    pub folderize_limit: f64,

    /// Name of the polygon that marks a boundary folder (repeatable)
    #[clap(long, value_name = "NAME")]
    pub boundary_name: Vec<String>,

    // === Edits ===
    /// Rename paths called "Path" or "Untitled Path" to "Path 0", "Path 1", ...
    #[clap(long)]
    pub serialize_names: bool,

    /// Remove all styles and style references
    #[clap(long)]
    pub delete_styles: bool,

    /// Remove every Placemark that is not a path
    #[clap(long)]
    pub paths_only: bool,

    /// Split MultiGeometry paths into one Placemark per line
    #[clap(long)]
    pub demulti_paths: bool,

    /// Keep only the selected features
    #[clap(short = 'x', long, value_name = "SELECTOR")]
    pub extract: Vec<String>,

    /// Remove the selected features
    #[clap(short, long, value_name = "SELECTOR")]
    pub delete: Vec<String>,

    /// Rename a Folder or Placemark
    #[clap(long, num_args = 2, value_names = ["OLD", "NEW"])]
    pub rename: Vec<String>,

    /// Import the features of another KML file, with the styles they use
    #[clap(short, long, value_name = "FILE")]
    pub combine: Vec<PathBuf>,

    /// Only import the selected features from --combine files
    #[clap(long, value_name = "SELECTOR", requires = "combine")]
    pub combine_filter: Vec<String>,

    /// Report style reference counts, orphans and missing styles
    #[clap(long)]
    pub validate_styles: bool,
}

impl Settings {
    /// Library configuration for this run
    pub fn config(&self) -> Config {
        let mut config = Config::default();

        config.simplify.tolerance = self.path_error_limit;
        config.simplify.highest_quality = !self.fast_simplify;
        if self.optimize_coordinates {
            config.simplify.format = CoordinateFormat::Fixed6;
        }

        config.folderize.threshold = self.folderize_limit;
        if !self.boundary_name.is_empty() {
            config.folderize.boundary_names = self.boundary_name.clone();
        }

        if self.renumber_styles {
            config.style.id_policy = StyleIdPolicy::Renumber;
        }
        config
    }

    /// `--rename` values as (old, new) pairs
    pub fn renames(&self) -> Vec<(String, String)> {
        self.rename
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect()
    }

    /// Whether the document is written to standard output
    pub fn kml_to_stdout(&self) -> bool {
        !self.no_kml_out && self.output.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::try_parse_from(["kmlutil", "in.kml"]).unwrap();
        assert_eq!(settings.kmlfile, PathBuf::from("in.kml"));
        assert_eq!(settings.verbose, 0);
        assert!(settings.kml_to_stdout());

        let config = settings.config();
        assert_eq!(config.simplify.tolerance, DEFAULT_PATH_ERROR_LIMIT);
        assert!(config.simplify.highest_quality);
        assert_eq!(config.simplify.format, CoordinateFormat::Shortest);
        assert_eq!(config.folderize.threshold, 0.35);
        assert_eq!(config.folderize.boundary_names, vec!["Boundary", "Boundry"]);
        assert_eq!(config.style.id_policy, StyleIdPolicy::Preserve);
    }

    #[test]
    fn test_flags_into_config() {
        let settings = Settings::try_parse_from([
            "kmlutil",
            "-vv",
            "in.kml",
            "--optimize-coordinates",
            "--fast-simplify",
            "--path-error-limit",
            "0.001",
            "--optimize-styles",
            "--renumber-styles",
            "--boundary-name",
            "Edge",
            "--folderize-limit",
            "0.5",
            "--no-kml-out",
        ])
        .unwrap();
        assert_eq!(settings.verbose, 2);
        assert!(!settings.kml_to_stdout());

        let config = settings.config();
        assert_eq!(config.simplify.tolerance, 0.001);
        assert!(!config.simplify.highest_quality);
        assert_eq!(config.simplify.format, CoordinateFormat::Fixed6);
        assert_eq!(config.folderize.threshold, 0.5);
        assert_eq!(config.folderize.boundary_names, vec!["Edge"]);
        assert_eq!(config.style.id_policy, StyleIdPolicy::Renumber);
    }

    #[test]
    fn test_rename_pairs() {
        let settings = Settings::try_parse_from([
            "kmlutil", "in.kml", "--rename", "A", "B", "--rename", "C", "D",
        ])
        .unwrap();
        assert_eq!(
            settings.renames(),
            vec![
                ("A".to_string(), "B".to_string()),
                ("C".to_string(), "D".to_string())
            ]
        );
    }

    #[test]
    fn test_dependent_flags() {
        assert!(Settings::try_parse_from(["kmlutil", "in.kml", "--region-file", "r.kml"]).is_err());
        assert!(Settings::try_parse_from(["kmlutil", "in.kml", "--combine-filter", "&A"]).is_err());
        assert!(
            Settings::try_parse_from(["kmlutil", "in.kml", "-o", "out.kml", "--no-kml-out"]).is_err()
        );
        assert!(Settings::try_parse_from(["kmlutil", "in.kml", "--stats-format", "yaml"]).is_err());
    }
}
