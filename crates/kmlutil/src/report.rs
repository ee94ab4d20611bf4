//! Text and JSON rendering of the run reports

use crate::error::Result;
use crate::settings::ReportFormat;
use kmlutil_lib::stats::{CountDelta, DumpEntry, ListEntry, PathStyleCount, Snapshot, count_deltas};
use kmlutil_lib::{CoordinateFormat, StyleValidation, format_coordinates};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

fn write_json(out: &mut dyn Write, value: &impl Serialize, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Share as a right-aligned percentage, `  25.00%`
fn percentage(share: f64) -> String {
    format!("{:7.2}%", share * 100.0)
}

#[derive(Serialize)]
struct CountRow<'a> {
    tag: &'a str,
    pre_count: usize,
    post_count: usize,
    percentage: String,
}

impl<'a> From<&'a CountDelta> for CountRow<'a> {
    fn from(delta: &'a CountDelta) -> Self {
        Self {
            tag: &delta.tag,
            pre_count: delta.before,
            post_count: delta.after,
            percentage: percentage(delta.reduction),
        }
    }
}

#[derive(Serialize)]
struct StatsReport<'a> {
    element_counts: Vec<CountRow<'a>>,
    point_counts: Vec<CountRow<'a>>,
    path_style_counts: &'a [PathStyleCount],
}

fn write_count_table(out: &mut dyn Write, title: &str, width: usize, deltas: &[CountDelta]) -> Result<()> {
    writeln!(out, "=== {title} ===")?;
    writeln!(out, " {:>width$} {:>7} {:>7}  Delta", "Element", "Input", "Output")?;
    for delta in deltas {
        writeln!(
            out,
            " {:>width$} {:>7} {:>7}{:>8}",
            delta.tag,
            delta.before,
            delta.after,
            percentage(delta.reduction)
        )?;
    }
    Ok(())
}

/// Before/after statistics
///
/// Point counts are only included when `points` is set.
pub fn stats(
    out: &mut dyn Write,
    format: ReportFormat,
    pretty: bool,
    before: &Snapshot,
    after: &Snapshot,
    points: bool,
    styles: &[PathStyleCount],
) -> Result<()> {
    let elements = count_deltas(&before.elements, &after.elements);
    let point_deltas = if points {
        count_deltas(&before.points, &after.points)
    } else {
        Vec::new()
    };

    match format {
        ReportFormat::Json => write_json(
            out,
            &StatsReport {
                element_counts: elements.iter().map(CountRow::from).collect(),
                point_counts: point_deltas.iter().map(CountRow::from).collect(),
                path_style_counts: styles,
            },
            pretty,
        ),
        ReportFormat::Text => {
            let width = elements
                .iter()
                .chain(&point_deltas)
                .map(|d| d.tag.len())
                .max()
                .unwrap_or(0)
                .max("Element".len());

            write_count_table(out, "Counts by Element Type", width, &elements)?;
            if points {
                writeln!(out)?;
                write_count_table(out, "Coordinate Point Count by Element Type", width, &point_deltas)?;
            }
            writeln!(out)?;
            writeln!(out, "=== Path Style Counts === <color>-<width>-<opacity>")?;
            for style in styles {
                writeln!(out, "{:>24} {:>6}", style.signature, style.count)?;
            }
            Ok(())
        }
    }
}

/// Style reference counts, orphans and missing targets
pub fn style_validation(
    out: &mut dyn Write,
    format: ReportFormat,
    pretty: bool,
    validation: &StyleValidation,
) -> Result<()> {
    if format == ReportFormat::Json {
        return write_json(out, validation, pretty);
    }

    let width = validation
        .targets
        .keys()
        .chain(validation.missing.keys())
        .map(String::len)
        .max()
        .unwrap_or(0);
    for (id, count) in &validation.targets {
        if *count == 0 {
            writeln!(out, "{id:>width$} : 0 [orphan]")?;
        } else {
            writeln!(out, "{id:>width$} : {count}")?;
        }
    }
    for (id, count) in &validation.missing {
        writeln!(out, "{id:>width$} : {count} Style or StyleMap missing")?;
    }
    for id in &validation.duplicate_ids {
        writeln!(out, "{id:>width$} : defined more than once")?;
    }
    Ok(())
}

/// Writes lines, folding runs of identical lines into one with a repeat count
struct Collapser<'a> {
    out: &'a mut dyn Write,
    last: Option<String>,
    repeats: usize,
}

impl<'a> Collapser<'a> {
    fn new(out: &'a mut dyn Write) -> Self {
        Self {
            out,
            last: None,
            repeats: 0,
        }
    }

    fn push(&mut self, line: String) -> Result<()> {
        if self.last.as_ref() == Some(&line) {
            self.repeats += 1;
            return Ok(());
        }
        self.flush()?;
        self.last = Some(line);
        self.repeats = 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(line) = self.last.take() {
            if self.repeats > 1 {
                writeln!(self.out, "{line} [{} occurrences]", self.repeats)?;
            } else {
                writeln!(self.out, "{line}")?;
            }
        }
        Ok(())
    }
}

/// How a listing is laid out
#[derive(Debug, Clone, Copy, Default)]
pub struct ListLayout {
    pub format: ReportFormat,
    /// Indent names by nesting depth
    pub tree: bool,
    pub pretty: bool,
}

/// Feature listing, one line per entry
pub fn list(out: &mut dyn Write, layout: ListLayout, entries: &[ListEntry]) -> Result<()> {
    if layout.format == ReportFormat::Json {
        return write_json(out, &entries, layout.pretty);
    }

    let indent = |entry: &ListEntry| if layout.tree { "  ".repeat(entry.indent) } else { String::new() };
    let name_width = entries
        .iter()
        .map(|e| indent(e).len() + e.name.chars().count())
        .max()
        .unwrap_or(0);
    let type_width = entries.iter().map(|e| e.kind.len()).max().unwrap_or(0);

    let mut lines = Collapser::new(out);
    for entry in entries {
        let name = format!("{}{}", indent(entry), entry.name);
        let mut line = format!("{name:<name_width$} {:<type_width$}", entry.kind);
        if let (Some(count), Some(length)) = (entry.count, entry.length) {
            let rate = if count > 0 {
                length / count as f64 * 1000.0
            } else {
                0.0
            };
            line.push_str(&format!(" {count:6} {length:7.2}km {rate:7.2}m/pt"));
        }
        if let Some(xpath) = &entry.xpath {
            line.push(' ');
            line.push_str(xpath);
        }
        lines.push(line.trim_end().to_string())?;
    }
    lines.flush()
}

/// Coordinates of dumped features, one `lon,lat[,alt]` per line
pub fn dump(out: &mut dyn Write, entries: &[DumpEntry]) -> Result<()> {
    for entry in entries {
        tracing::info!("# {}", entry.name.as_deref().unwrap_or("<unnamed>"));
        for c in &entry.coordinates {
            let line = format_coordinates(std::slice::from_ref(c), CoordinateFormat::Shortest);
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct NamespaceRow<'a> {
    prefix: Option<&'a str>,
    url: &'a str,
}

/// Namespace declarations as a two-column table
pub fn namespaces(
    out: &mut dyn Write,
    format: ReportFormat,
    pretty: bool,
    namespaces: &BTreeMap<Option<String>, String>,
) -> Result<()> {
    const PREFIX_TITLE: &str = "Prefix";
    const URL_TITLE: &str = "Namespace URL";
    const NONE_TEXT: &str = "-none-";

    if format == ReportFormat::Json {
        let rows: Vec<NamespaceRow<'_>> = namespaces
            .iter()
            .map(|(prefix, url)| NamespaceRow {
                prefix: prefix.as_deref(),
                url,
            })
            .collect();
        return write_json(out, &rows, pretty);
    }

    let prefix_width = namespaces
        .keys()
        .map(|p| p.as_deref().map_or(0, str::len))
        .chain([PREFIX_TITLE.len(), NONE_TEXT.len()])
        .max()
        .unwrap_or(0);
    let url_width = namespaces
        .values()
        .map(String::len)
        .chain([URL_TITLE.len()])
        .max()
        .unwrap_or(0);

    writeln!(out, "{PREFIX_TITLE:<prefix_width$} {URL_TITLE}")?;
    writeln!(out, "{} {}", "-".repeat(prefix_width), "-".repeat(url_width))?;
    for (prefix, url) in namespaces {
        writeln!(out, "{:<prefix_width$} {url}", prefix.as_deref().unwrap_or(NONE_TEXT))?;
    }
    Ok(())
}
