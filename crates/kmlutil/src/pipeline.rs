//! The processing pipeline of one run
//!
//! Steps run in a fixed order: combine, demulti, extract, paths-only, delete,
//! delete-styles, rename, serialize-names, region crop (or stand-alone path
//! rewriting), style optimisation, statistics, folderize, style validation,
//! dump or listing, namespaces and finally the document output.

use crate::error::Result;
use crate::report::{self, ListLayout};
use crate::settings::Settings;
use kmlutil_lib::edit::{self, PathRewrite};
use kmlutil_lib::stats::{self, ListOptions, Snapshot};
use kmlutil_lib::{Config, Document, deduplicate_styles, validate_styles};
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Run the whole pipeline: read the input, process it, write the document
pub fn run(settings: &Settings) -> Result<()> {
    let config = settings.config();
    tracing::debug!("Configuration: {config:?}");

    let mut doc = Document::from_file(&settings.kmlfile)?;
    tracing::info!("Parsed {}", settings.kmlfile.display());

    // Reports share stdout only when the document does not go there
    if settings.kml_to_stdout() {
        process(settings, &config, &mut doc, &mut io::stderr().lock())?;
    } else {
        process(settings, &config, &mut doc, &mut io::stdout().lock())?;
    }

    if settings.no_kml_out {
        return Ok(());
    }
    match &settings.output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            write_document(settings, &doc, &mut out)?;
            out.flush()?;
            tracing::info!("Wrote {}", path.display());
        }
        None => {
            let mut out = io::stdout().lock();
            write_document(settings, &doc, &mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}

/// Apply every requested operation to `doc`, writing reports to `reports`
pub fn process(
    settings: &Settings,
    config: &Config,
    doc: &mut Document,
    reports: &mut dyn Write,
) -> Result<()> {
    let before = settings.stats.then(|| Snapshot::capture(doc));

    for path in &settings.combine {
        tracing::debug!("Combining {}", path.display());
        let other = Document::from_file(path)?;
        let report = edit::combine(doc, &other, &settings.combine_filter)?;
        for (old, new) in &report.renamed_styles {
            tracing::debug!("Imported style '{old}' as '{new}'");
        }
    }

    if settings.demulti_paths {
        edit::demulti_paths(doc);
    }
    if !settings.extract.is_empty() {
        edit::extract_features(doc, &settings.extract)?;
    }
    if settings.paths_only {
        edit::paths_only(doc)?;
    }
    if !settings.delete.is_empty() {
        edit::delete_features(doc, &settings.delete)?;
    }
    if settings.delete_styles {
        edit::remove_all_styles(doc);
    }
    let renames = settings.renames();
    if !renames.is_empty() {
        edit::rename_features(doc, &renames)?;
    }
    if settings.serialize_names {
        edit::serialize_path_names(doc);
    }

    let rewrite = if settings.optimize_paths {
        PathRewrite::Simplify(&config.simplify)
    } else if settings.optimize_coordinates {
        PathRewrite::OptimizeCoordinates
    } else {
        PathRewrite::None
    };
    if let Some(name) = &settings.region {
        let region = match &settings.region_file {
            Some(path) => edit::find_region(&Document::from_file(path)?, name)?,
            None => edit::find_region(doc, name)?,
        };
        let report = edit::crop_to_region(doc, &region, rewrite);
        if report.skipped > 0 {
            tracing::warn!("{} unreadable Placemark(s) were kept as they are", report.skipped);
        }
    } else {
        match rewrite {
            PathRewrite::Simplify(simplify) => {
                edit::simplify_paths(doc, simplify);
            }
            PathRewrite::OptimizeCoordinates => {
                let optimized = edit::optimize_coordinates(doc);
                tracing::info!("Rounded coordinates of {optimized} path(s)");
            }
            PathRewrite::None => {}
        }
    }

    if settings.optimize_styles {
        let remap = deduplicate_styles(doc, &config.style);
        for (old, new) in &remap.old_to_new {
            tracing::debug!("Style '{old}' is now '{new}'");
        }
    }

    if let Some(before) = before {
        let after = Snapshot::capture(doc);
        report::stats(
            reports,
            settings.stats_format,
            settings.pretty_print,
            &before,
            &after,
            settings.optimize_paths || settings.stats_detail,
            &stats::path_style_counts(doc),
        )?;
    }

    if settings.folderize {
        let report = edit::folderize(doc, &config.folderize);
        for moved in &report.moves {
            tracing::debug!(
                "Moved '{}' into '{}' ({:.1}% inside)",
                moved.feature,
                moved.folder,
                moved.ratio * 100.0
            );
        }
    }

    if settings.validate_styles {
        let validation = validate_styles(doc);
        for id in &validation.duplicate_ids {
            tracing::error!("Two or more styles exist with the id '{id}'");
        }
        report::style_validation(reports, settings.list_format, settings.pretty_print, &validation)?;
    }

    let multi = stats::multi_geometry_paths(doc);
    if multi > 0 {
        tracing::warn!(
            "The document contains {multi} MultiGeometry path(s), which many KML applications \
             handle poorly; --demulti-paths converts them to simple paths"
        );
    }

    if !settings.dump.is_empty() {
        report::dump(reports, &stats::dump_coordinates(doc, &settings.dump)?)?;
    } else if settings.list || settings.tree {
        let options = ListOptions {
            filter: settings.filter.clone(),
            detail: settings.list_detail,
            xpaths: settings.list_with_xpaths,
        };
        let layout = ListLayout {
            format: settings.list_format,
            tree: settings.tree,
            pretty: settings.pretty_print,
        };
        report::list(reports, layout, &stats::list_features(doc, &options)?)?;
    }

    if settings.namespaces {
        let namespaces = doc.namespaces();
        if namespaces.is_empty() {
            tracing::info!("No namespaces declared");
        } else {
            report::namespaces(reports, settings.list_format, settings.pretty_print, &namespaces)?;
        }
    }

    reports.flush()?;
    Ok(())
}

/// Serialize the document as KML, or its paths as GeoJSON
pub fn write_document(settings: &Settings, doc: &Document, out: &mut dyn Write) -> Result<()> {
    if settings.geojson {
        let collection = kmlutil_lib::geojson::export_paths(doc);
        if settings.pretty_print {
            serde_json::to_writer_pretty(&mut *out, &collection)?;
        } else {
            serde_json::to_writer(&mut *out, &collection)?;
        }
        writeln!(out)?;
    } else {
        out.write_all(doc.to_xml(settings.pretty_print)?.as_bytes())?;
    }
    Ok(())
}
