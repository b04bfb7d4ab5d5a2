//! Excel and PDF rendering of a result set.

use chrono::Utc;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::collections::BTreeSet;
use std::io::BufWriter;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::db::{ColumnRecord, Store};
use crate::services::ai::MISSING_VALUE;
use crate::services::results::{ResultItem, load_items, load_owned_search};

/// Upper bound on rows exported across all of a user's searches.
const ALL_RESULTS_LIMIT: u64 = 1000;

const BASE_HEADERS: [&str; 11] = [
    "ID", "Title", "URL", "Snippet", "Country", "Language", "Date", "Category", "Status",
    "Source", "Score",
];

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 5.0;
const MAX_LINE_CHARS: usize = 95;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Failed to render export: {0}")]
    Render(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ExportError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<XlsxError> for ExportError {
    fn from(err: XlsxError) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<printpdf::Error> for ExportError {
    fn from(err: printpdf::Error) -> Self {
        Self::Render(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Excel,
    Pdf,
}

impl ExportFormat {
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pdf => "application/pdf",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Excel => "xlsx",
            Self::Pdf => "pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "excel" | "xlsx" => Ok(Self::Excel),
            "pdf" => Ok(Self::Pdf),
            other => Err(ExportError::Validation(format!(
                "Unsupported export format '{other}'. Expected 'excel' or 'pdf'"
            ))),
        }
    }
}

/// Everything a renderer needs.
#[derive(Debug, Clone)]
pub struct ExportData {
    pub title: String,
    pub items: Vec<ResultItem>,
    pub columns: Vec<ColumnRecord>,
}

#[derive(Debug, Clone)]
pub struct ExportFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

pub struct ExportService {
    store: Store,
}

impl ExportService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Exports one owned search, or every result of the user when `search_id` is absent.
    pub async fn export(
        &self,
        user_id: i32,
        search_id: Option<i32>,
        format: ExportFormat,
        include_columns: bool,
    ) -> Result<ExportFile, ExportError> {
        let mut data = if let Some(search_id) = search_id {
            let search = load_owned_search(&self.store, user_id, search_id)
                .await?
                .ok_or_else(|| ExportError::NotFound(format!("Search {search_id}")))?;
            ExportData {
                title: search.query,
                items: load_items(&self.store, search.id).await?,
                columns: self.store.list_columns(search.id).await?,
            }
        } else {
            ExportData {
                title: "All searches".to_string(),
                items: self
                    .store
                    .list_user_results(user_id, ALL_RESULTS_LIMIT)
                    .await?
                    .into_iter()
                    .map(ResultItem::from)
                    .collect(),
                columns: Vec::new(),
            }
        };

        if !include_columns {
            data.columns.clear();
        }

        let rows = data.items.len();
        let bytes = tokio::task::spawn_blocking(move || match format {
            ExportFormat::Excel => build_xlsx(&data),
            ExportFormat::Pdf => build_pdf(&data),
        })
        .await
        .map_err(|e| ExportError::Internal(format!("Export task panicked: {e}")))??;

        let filename = format!(
            "radar_export_{}.{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            format.extension()
        );

        info!(user_id, rows, bytes = bytes.len(), filename = %filename, "Export generated");

        Ok(ExportFile {
            bytes,
            content_type: format.content_type(),
            filename,
        })
    }
}

fn column_value<'a>(item: &'a ResultItem, column: &ColumnRecord) -> &'a str {
    item.columns
        .get(&column.name)
        .map_or(MISSING_VALUE, String::as_str)
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> BTreeSet<&'a str> {
    values.filter(|v| !v.is_empty()).collect()
}

/// Label/value rows of the "Summary" sheet.
fn summary_rows(data: &ExportData) -> Vec<(&'static str, String)> {
    let countries = distinct(data.items.iter().map(|i| i.country.as_str()));
    let sources = distinct(data.items.iter().map(|i| i.source.as_str()));
    let categories = distinct(data.items.iter().map(|i| i.category.as_str()));

    let join = |set: &BTreeSet<&str>| set.iter().copied().collect::<Vec<_>>().join(", ");
    vec![
        ("Query", data.title.clone()),
        ("Total results", data.items.len().to_string()),
        ("Unique countries", countries.len().to_string()),
        ("Unique sources", sources.len().to_string()),
        ("Unique categories", categories.len().to_string()),
        ("Countries", join(&countries)),
        ("Sources", join(&sources)),
        ("Categories", join(&categories)),
        ("Custom columns", data.columns.len().to_string()),
        ("Exported at", crate::models::now_timestamp()),
    ]
}

/// Workbook with "Results", "Summary" and, when there are custom columns, "Columns".
pub fn build_xlsx(data: &ExportData) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Results")?;

        let headers = BASE_HEADERS
            .iter()
            .map(|h| (*h).to_string())
            .chain(data.columns.iter().map(|c| c.name.clone()));
        for (col, header) in headers.enumerate() {
            sheet.write_string_with_format(0, to_col(col), header, &bold)?;
        }

        for (index, item) in data.items.iter().enumerate() {
            let row = u32::try_from(index + 1).unwrap_or(u32::MAX);
            if let Some(id) = item.id {
                sheet.write_number(row, 0, f64::from(id))?;
            }
            let text = [
                &item.title,
                &item.url,
                &item.snippet,
                &item.country,
                &item.language,
                &item.date,
                &item.category,
                &item.status,
                &item.source,
            ];
            for (offset, value) in text.iter().enumerate() {
                sheet.write_string(row, to_col(offset + 1), cell_text(value))?;
            }
            sheet.write_number(row, 10, f64::from(item.score))?;

            for (offset, column) in data.columns.iter().enumerate() {
                sheet.write_string(
                    row,
                    to_col(BASE_HEADERS.len() + offset),
                    cell_text(column_value(item, column)),
                )?;
            }
        }

        sheet.set_column_width(1, 50)?;
        sheet.set_column_width(2, 40)?;
        sheet.set_column_width(3, 60)?;
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;

        let rows = summary_rows(data);

        sheet.write_string_with_format(0, 0, "Metric", &bold)?;
        sheet.write_string_with_format(0, 1, "Value", &bold)?;
        for (index, (label, value)) in rows.iter().enumerate() {
            let row = u32::try_from(index + 1).unwrap_or(u32::MAX);
            sheet.write_string(row, 0, *label)?;
            sheet.write_string(row, 1, cell_text(value))?;
        }
        sheet.set_column_width(0, 20)?;
        sheet.set_column_width(1, 60)?;
    }

    if !data.columns.is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Columns")?;

        for (col, header) in ["Name", "Description", "AI generated", "Created"].iter().enumerate() {
            sheet.write_string_with_format(0, to_col(col), *header, &bold)?;
        }
        for (index, column) in data.columns.iter().enumerate() {
            let row = u32::try_from(index + 1).unwrap_or(u32::MAX);
            sheet.write_string(row, 0, column.name.as_str())?;
            sheet.write_string(row, 1, cell_text(column.description.as_deref().unwrap_or("")))?;
            sheet.write_string(row, 2, if column.generated_by_ai { "Yes" } else { "No" })?;
            sheet.write_string(row, 3, column.created_at.as_str())?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Excel rejects cells longer than this many characters.
const MAX_CELL_CHARS: usize = 32_767;

fn cell_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn to_col(index: usize) -> u16 {
    u16::try_from(index).unwrap_or(u16::MAX)
}

/// Builtin PDF fonts only cover Latin-1.
fn pdf_text(text: &str) -> String {
    let mut out: String = text
        .chars()
        .map(|c| if (c as u32) < 0x100 && !c.is_control() { c } else { '?' })
        .take(MAX_LINE_CHARS)
        .collect();
    if text.chars().count() > MAX_LINE_CHARS {
        out.push_str("...");
    }
    out
}

struct PdfCursor {
    layer: PdfLayerReference,
    y: f32,
}

/// A4 report: title, query, then one block of lines per result.
pub fn build_pdf(data: &ExportData) -> Result<Vec<u8>, ExportError> {
    let (doc, page, layer) = PdfDocument::new("RADAR export", PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    let mut cursor = PdfCursor {
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_HEIGHT.0 - MARGIN,
    };

    let line = |cursor: &mut PdfCursor, text: &str, size: f32, font: &IndirectFontRef| {
        if cursor.y < MARGIN {
            let (page, layer) = doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            cursor.layer = doc.get_page(page).get_layer(layer);
            cursor.y = PAGE_HEIGHT.0 - MARGIN;
        }
        cursor
            .layer
            .use_text(pdf_text(text), size, Mm(MARGIN), Mm(cursor.y), font);
        cursor.y -= LINE_HEIGHT;
    };

    line(&mut cursor, "RADAR - Search results", 16.0, &bold);
    cursor.y -= 2.0;
    line(&mut cursor, &format!("Query: {}", data.title), 11.0, &regular);
    line(
        &mut cursor,
        &format!(
            "Results: {}  |  Generated: {}",
            data.items.len(),
            crate::models::now_timestamp()
        ),
        9.0,
        &regular,
    );
    cursor.y -= LINE_HEIGHT;

    for (index, item) in data.items.iter().enumerate() {
        line(&mut cursor, &format!("{}. {}", index + 1, item.title), 10.0, &bold);
        line(&mut cursor, &item.url, 8.0, &regular);
        line(
            &mut cursor,
            &format!(
                "Source: {}  |  Status: {}  |  Score: {}",
                item.source, item.status, item.score
            ),
            8.0,
            &regular,
        );
        if !data.columns.is_empty() {
            let custom = data
                .columns
                .iter()
                .map(|c| format!("{}: {}", c.name, column_value(item, c)))
                .collect::<Vec<_>>()
                .join("; ");
            line(&mut cursor, &custom, 8.0, &regular);
        }
        cursor.y -= 2.0;
    }

    let mut writer = BufWriter::new(Vec::new());
    doc.save(&mut writer)?;
    writer
        .into_inner()
        .map_err(|e| ExportError::Render(e.to_string()))
}
