//! Output rendering for command results
//!
//! Every writer takes `&mut impl Write` so commands print to stdout while tests
//! render into a buffer.

use std::io::{self, Write};

use chrono::{Local, TimeZone};
use colored::Colorize;
use serde::Serialize;

use crate::api::models::{
    ConstantsResponse, EditRequest, EditsResponse, PageResponse, SearchResponse,
    TypeaheadResponse,
};

/// Longest constant value shown in table output
pub const MAX_VALUE_WIDTH: usize = 80;

/// Left-aligned text table with padded columns
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }
        widths
    }

    /// Writes the table; the header is bold when `color` is set
    pub fn write(&self, out: &mut impl Write, color: bool) -> io::Result<()> {
        let widths = self.widths();

        let header = format_row(&self.headers, &widths);
        if color {
            writeln!(out, "{}", header.bold())?;
        } else {
            writeln!(out, "{}", header)?;
        }

        for row in &self.rows {
            writeln!(out, "{}", format_row(row, &widths))?;
        }
        Ok(())
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(0);
        if i + 1 == cells.len() {
            line.push_str(cell);
        } else {
            line.push_str(&format!("{:<width$}  ", cell, width = width));
        }
    }
    line
}

/// Pretty-printed JSON followed by a newline
pub fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

pub fn write_yaml<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> io::Result<()> {
    let text = serde_yaml::to_string(value).map_err(io::Error::other)?;
    out.write_all(text.as_bytes())
}

/// Unix seconds as `YYYY-MM-DD HH:MM` in local time
pub fn format_timestamp(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => secs.to_string(),
    }
}

/// Shortens `value` to at most `max` characters, ending in `...` when cut
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = value.chars().take(keep).collect();
    out.push_str("...");
    out
}

pub fn search_table(out: &mut impl Write, results: &SearchResponse, color: bool) -> io::Result<()> {
    if results.results.is_empty() {
        return writeln!(out, "No results found.");
    }

    let mut table = Table::new(&["Title", "Slug", "Score", "Views"]);
    for r in &results.results {
        table.add_row(vec![
            r.title.clone(),
            r.slug.clone(),
            format!("{:.2}", r.relevance_score),
            r.view_count.to_string(),
        ]);
    }
    table.write(out, color)
}

pub fn search_markdown(out: &mut impl Write, results: &SearchResponse) -> io::Result<()> {
    writeln!(out, "# Search Results")?;
    writeln!(out)?;
    if results.results.is_empty() {
        return writeln!(out, "No results found.");
    }

    for r in &results.results {
        writeln!(out, "- [{}]({})", r.title, r.slug)?;
        writeln!(out, "  Score: {:.2}, Views: {}", r.relevance_score, r.view_count)?;
        if !r.snippet.is_empty() {
            writeln!(out, "  {}", r.snippet)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Page as Markdown; content is included only when it was requested
pub fn page_markdown(out: &mut impl Write, response: &PageResponse, with_content: bool) -> io::Result<()> {
    let page = &response.page;
    writeln!(out, "# {}\n", page.title)?;

    if !page.description.is_empty() {
        writeln!(out, "{}\n", page.description)?;
    }
    if with_content && !page.content.is_empty() {
        writeln!(out, "{}\n", page.content)?;
    }

    writeln!(out, "**Slug:** {}", page.slug)?;
    writeln!(out, "**Views:** {}", page.stats.total_views)?;
    writeln!(out, "**Quality Score:** {:.2}", page.stats.quality_score)?;

    if !page.citations.is_empty() {
        writeln!(out, "\n## Citations")?;
        for c in &page.citations {
            writeln!(out, "- [{}]({})", c.title, c.url)?;
        }
    }
    Ok(())
}

pub fn page_plain(out: &mut impl Write, response: &PageResponse, with_content: bool) -> io::Result<()> {
    let page = &response.page;
    writeln!(out, "Title: {}", page.title)?;

    if !page.description.is_empty() {
        writeln!(out, "Description: {}", page.description)?;
    }
    if with_content && !page.content.is_empty() {
        writeln!(out, "\nContent:")?;
        writeln!(out, "{}", page.content)?;
    }

    writeln!(out, "\nSlug: {}", page.slug)?;
    writeln!(out, "Views: {}", page.stats.total_views)?;
    writeln!(out, "Quality Score: {:.2}", page.stats.quality_score)
}

/// Edit requests as a table.
///
/// # Arguments
/// * `with_slug` - include the Slug column (omitted when listing a single page)
/// * `with_totals` - append the `Total:` footer
pub fn edits_table(
    out: &mut impl Write,
    results: &EditsResponse,
    with_slug: bool,
    with_totals: bool,
    color: bool,
) -> io::Result<()> {
    if results.edit_requests.is_empty() {
        if with_slug {
            return writeln!(out, "No edit requests found.");
        }
        return writeln!(out, "No edit requests found for this page.");
    }

    let headers: &[&str] = if with_slug {
        &["ID", "Slug", "Status", "Editor", "Timestamp"]
    } else {
        &["ID", "Status", "Editor", "Timestamp"]
    };
    let mut table = Table::new(headers);
    for edit in &results.edit_requests {
        table.add_row(edit_row(edit, with_slug));
    }
    table.write(out, color)?;

    if with_totals {
        write!(out, "\nTotal: {}", results.total_count)?;
        if results.has_more {
            write!(out, " (more available)")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn edit_row(edit: &EditRequest, with_slug: bool) -> Vec<String> {
    let mut row = vec![edit.id.clone()];
    if with_slug {
        row.push(edit.slug.clone());
    }
    row.push(edit.short_status().to_string());
    row.push(edit.editor.clone());
    row.push(format_timestamp(edit.timestamp));
    row
}

/// One suggestion per line
pub fn typeahead_list(out: &mut impl Write, results: &TypeaheadResponse) -> io::Result<()> {
    for suggestion in &results.suggestions {
        writeln!(out, "{}", suggestion)?;
    }
    Ok(())
}

pub fn constants_table(out: &mut impl Write, constants: &ConstantsResponse, color: bool) -> io::Result<()> {
    if constants.is_empty() {
        return writeln!(out, "No constants found.");
    }

    let mut table = Table::new(&["Key", "Value"]);
    for (key, value) in constants {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        table.add_row(vec![key.clone(), truncate(&text, MAX_VALUE_WIDTH)]);
    }
    table.write(out, color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{Citation, SearchResult};

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    fn sample_search() -> SearchResponse {
        SearchResponse {
            results: vec![
                SearchResult {
                    title: "Rust".into(),
                    slug: "Rust_(programming_language)".into(),
                    snippet: "Systems language".into(),
                    relevance_score: 0.9234,
                    view_count: 1500,
                },
                SearchResult {
                    title: "Go".into(),
                    slug: "Go".into(),
                    snippet: String::new(),
                    relevance_score: 0.5,
                    view_count: 7,
                },
            ],
            total_count: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_table_pads_columns() {
        let mut table = Table::new(&["A", "Long"]);
        table.add_row(vec!["wide cell".into(), "x".into()]);
        let text = render(|out| table.write(out, false));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A          Long");
        assert_eq!(lines[1], "wide cell  x");
    }

    #[test]
    fn test_search_table() {
        let text = render(|out| search_table(out, &sample_search(), false));
        assert!(text.starts_with("Title"));
        assert!(text.contains("Rust_(programming_language)"));
        assert!(text.contains("0.92"));
        assert!(text.contains("1500"));
    }

    #[test]
    fn test_search_empty_results() {
        let empty = SearchResponse::default();
        assert_eq!(render(|out| search_table(out, &empty, false)), "No results found.\n");
        assert!(render(|out| search_markdown(out, &empty)).ends_with("No results found.\n"));
    }

    #[test]
    fn test_search_markdown_skips_empty_snippet() {
        let text = render(|out| search_markdown(out, &sample_search()));
        assert!(text.contains("- [Rust](Rust_(programming_language))\n  Score: 0.92, Views: 1500\n  Systems language\n"));
        assert!(text.contains("- [Go](Go)\n  Score: 0.50, Views: 7\n\n"));
    }

    #[test]
    fn test_page_markdown_and_plain() {
        let mut page = PageResponse {
            found: true,
            ..Default::default()
        };
        page.page.title = "Rust".into();
        page.page.slug = "Rust".into();
        page.page.content = "Body text".into();
        page.page.stats.quality_score = 0.875;
        page.page.citations.push(Citation {
            id: "1".into(),
            title: "Docs".into(),
            url: "https://doc.rust-lang.org".into(),
        });

        let md = render(|out| page_markdown(out, &page, false));
        assert!(md.starts_with("# Rust\n\n"));
        assert!(!md.contains("Body text"));
        assert!(md.contains("**Quality Score:** 0.88"));
        assert!(md.contains("## Citations\n- [Docs](https://doc.rust-lang.org)"));

        let plain = render(|out| page_plain(out, &page, true));
        assert!(plain.contains("\nContent:\nBody text\n"));
        assert!(plain.contains("Slug: Rust"));
    }

    #[test]
    fn test_edits_table_with_totals() {
        let results = EditsResponse {
            edit_requests: vec![EditRequest {
                id: "e1".into(),
                slug: "Rust".into(),
                status: "EDIT_REQUEST_STATUS_PENDING".into(),
                timestamp: 1_700_000_000,
                editor: "alice".into(),
            }],
            total_count: 4,
            has_more: true,
            ..Default::default()
        };

        let text = render(|out| edits_table(out, &results, true, true, false));
        assert!(text.starts_with("ID"));
        assert!(text.contains("Slug"));
        assert!(text.contains("PENDING"));
        assert!(!text.contains("EDIT_REQUEST_STATUS_"));
        assert!(text.contains(&format_timestamp(1_700_000_000)));
        assert!(text.ends_with("\nTotal: 4 (more available)\n"));

        let by_slug = render(|out| edits_table(out, &results, false, false, false));
        assert!(!by_slug.lines().next().unwrap_or_default().contains("Slug"));
        assert!(!by_slug.contains("Total"));
    }

    #[test]
    fn test_edits_empty_messages() {
        let empty = EditsResponse::default();
        assert_eq!(
            render(|out| edits_table(out, &empty, true, true, false)),
            "No edit requests found.\n"
        );
        assert_eq!(
            render(|out| edits_table(out, &empty, false, true, false)),
            "No edit requests found for this page.\n"
        );
    }

    #[test]
    fn test_format_timestamp_shape() {
        let text = format_timestamp(1_700_000_000);
        assert_eq!(text.len(), 16);
        assert_eq!(&text[4..5], "-");
        assert_eq!(&text[13..14], ":");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 80), "short");
        let long = "x".repeat(100);
        let cut = truncate(&long, 80);
        assert_eq!(cut.chars().count(), 80);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_constants_table_and_yaml() {
        let mut constants = ConstantsResponse::new();
        constants.insert("name".into(), serde_json::json!("grok"));
        constants.insert("limits".into(), serde_json::json!({"max": 100}));

        let table = render(|out| constants_table(out, &constants, false));
        assert!(table.contains("name    grok"));
        assert!(table.contains(r#"{"max":100}"#));

        let yaml = render(|out| write_yaml(out, &constants));
        assert!(yaml.contains("name: grok"));

        let json = render(|out| write_json(out, &constants));
        assert!(json.ends_with("}\n"));
        assert!(json.contains("\"name\": \"grok\""));
    }

    #[test]
    fn test_typeahead_list() {
        let results = TypeaheadResponse {
            suggestions: vec!["Rust".into(), "Ruby".into()],
        };
        assert_eq!(render(|out| typeahead_list(out, &results)), "Rust\nRuby\n");
    }
}
