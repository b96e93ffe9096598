//! Preview Renderer — `Record` → preview markup for a chosen style.
//!
//! Pure and deterministic: the same record and style always produce the same
//! string, and the record is only ever borrowed immutably.

pub mod templates;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Record;

pub use templates::Template;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    Professional,
    /// Adds the profile picture to the header.
    Modern,
}

impl Style {
    pub const ALL: [Style; 2] = [Style::Professional, Style::Modern];

    pub fn as_str(self) -> &'static str {
        match self {
            Style::Professional => "professional",
            Style::Modern => "modern",
        }
    }

    pub fn template(self) -> &'static Template {
        match self {
            Style::Professional => &templates::PROFESSIONAL,
            Style::Modern => &templates::MODERN,
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown style '{0}' (expected professional or modern)")]
pub struct UnknownStyle(pub String);

impl FromStr for Style {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Style::ALL
            .into_iter()
            .find(|style| style.as_str() == wanted)
            .ok_or(UnknownStyle(wanted))
    }
}

/// Renders the preview document for `record` in `style`.
pub fn render(record: &Record, style: Style) -> String {
    style.template().render(record)
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
