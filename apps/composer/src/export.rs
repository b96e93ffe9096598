//! Document export — a one-way consumer of the preview markup.

use serde::Serialize;
use thiserror::Error;

use crate::render::{escape_html, Style};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export: the preview is empty")]
    EmptyPreview,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

/// Turns rendered preview markup into a downloadable file. PDF rasterisers
/// plug in here; the built-in exporter writes standalone HTML.
pub trait DocumentExporter: Send + Sync {
    fn export(&self, markup: &str, style: Style, title: &str) -> Result<ExportedDocument, ExportError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExporter;

const PRINT_CSS: &str = "body{font-family:Helvetica,Arial,sans-serif;margin:0.5in;color:#222}\
h1{margin-bottom:0}h2{border-bottom:1px solid #ccc;font-size:1.1em}\
.modern .profile-picture{width:96px;height:96px;border-radius:50%;object-fit:cover}\
.modern .chip{display:inline-block;margin:2px 4px;padding:2px 8px;border-radius:12px;background:#eef}";

impl DocumentExporter for HtmlExporter {
    fn export(&self, markup: &str, style: Style, title: &str) -> Result<ExportedDocument, ExportError> {
        if markup.trim().is_empty() {
            return Err(ExportError::EmptyPreview);
        }
        let title = if title.trim().is_empty() { "CV" } else { title.trim() };
        let body = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{PRINT_CSS}</style>\n</head>\n<body class=\"{}\">\n{markup}\n</body>\n</html>\n",
            escape_html(title),
            style.as_str(),
        );
        Ok(ExportedDocument {
            filename: "cv.html".to_string(),
            content_type: "text/html; charset=utf-8",
            body,
        })
    }
}
