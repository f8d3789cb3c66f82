//! Rendering of computed report rows.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::error::{Error, Result};
use crate::metrics::{Registry, ReportRow};

/// Output format for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Table,
    Json,
    Tsv,
    Html,
}

impl Format {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Format::Table),
            "json" => Ok(Format::Json),
            "tsv" => Ok(Format::Tsv),
            "html" => Ok(Format::Html),
            other => Err(Error::Config(format!("unknown output format: {other}"))),
        }
    }
}

/// Sort rows by iteration name.
pub fn sort_by_name(rows: &mut [ReportRow]) {
    rows.sort_by(|a, b| a.name().cmp(b.name()));
}

/// Resolve the columns to render. An empty selection means every metric.
pub fn select_columns<'a>(registry: &'a Registry, columns: &[String]) -> Result<Vec<&'a str>> {
    if columns.is_empty() {
        return Ok(registry.all().map(|t| t.id()).collect());
    }
    columns
        .iter()
        .map(|c| {
            registry
                .get(c)
                .map(|t| t.id())
                .ok_or_else(|| Error::Config(format!("unknown column: {c}")))
        })
        .collect()
}

pub fn to_json(rows: &[ReportRow]) -> Result<String> {
    let values: Vec<_> = rows.iter().map(|r| &r.metrics).collect();
    serde_json::to_string_pretty(&values).map_err(|e| Error::Other(e.to_string()))
}

/// Tab separated values with a header of metric ids.
pub fn to_tsv(rows: &[ReportRow], columns: &[&str]) -> String {
    let mut out = String::new();
    out.push_str(&columns.join("\t"));
    out.push('\n');
    for row in rows {
        let fields: Vec<String> = columns
            .iter()
            .map(|id| tsv_escape(&row.value(id).map(|v| v.to_string()).unwrap_or_default()))
            .collect();
        out.push_str(&fields.join("\t"));
        out.push('\n');
    }
    out
}

/// Plain text table for the terminal: value and, where present, the aggregate.
pub fn to_table(rows: &[ReportRow], columns: &[&str]) -> String {
    let mut grid: Vec<Vec<String>> = vec![columns.iter().map(|c| c.to_string()).collect()];
    for row in rows {
        grid.push(columns.iter().map(|id| cell_text(row, id)).collect());
    }

    let widths: Vec<usize> = (0..columns.len())
        .map(|i| grid.iter().map(|r| r[i].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for line in &grid {
        let padded: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(s, &w)| format!("{s:<w$}"))
            .collect();
        out.push_str(padded.join("  ").trim_end());
        out.push('\n');
    }
    out
}

/// Standalone HTML page with one table row per iteration.
pub fn to_html(rows: &[ReportRow], registry: &Registry, columns: &[&str], title: &str) -> String {
    let generated = chrono::Utc::now().to_rfc2822();
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", encode_text(title)));
    out.push_str("</head>\n<body>\n");
    out.push_str(&format!("<h1>{}</h1>\n", encode_text(title)));
    out.push_str("<table>\n<thead>\n<tr>");
    for id in columns {
        let (label, help) = registry
            .get(id)
            .map_or((*id, ""), |t| (t.title(), t.description()));
        out.push_str(&format!(
            "<th title=\"{}\">{}</th>",
            encode_double_quoted_attribute(help),
            encode_text(label)
        ));
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in rows {
        out.push_str("<tr>");
        for id in columns {
            let text = cell_text(row, id);
            let text = encode_text(&text);
            match row.cell(id).and_then(|c| c.link.as_deref()) {
                Some(link) => out.push_str(&format!(
                    "<td><a href=\"{}\">{text}</a></td>",
                    encode_double_quoted_attribute(link)
                )),
                None => out.push_str(&format!("<td>{text}</td>")),
            }
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
    out.push_str(&format!("<p>Generated {}</p>\n", encode_text(&generated)));
    out.push_str("</body>\n</html>\n");
    out
}

fn cell_text(row: &ReportRow, id: &str) -> String {
    let value = row.value(id).map(|v| v.to_string()).unwrap_or_default();
    match row.aggregate(id) {
        Some(agg) => format!("{value} ({agg})"),
        None => value,
    }
}

fn tsv_escape(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}
