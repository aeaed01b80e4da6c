//! Form-submission adapter for custom widgets.
//!
//! User-submitted form data replaces the stored webhook body. Transport
//! bookkeeping fields are stripped, and the remaining values either travel
//! verbatim over multipart (when a file upload is present, so values must
//! round-trip byte-for-byte) or sanitized as plain text over the JSON path.

use crate::client::OutboundBody;
use std::path::PathBuf;

/// Field names used purely for transport bookkeeping, never forwarded.
pub const RESERVED_FIELDS: [&str; 3] = ["nonce", "action", "widget_id"];

/// A user-submitted form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Field name.
    pub name: String,
    /// Submitted value.
    pub value: String,
}

impl FormField {
    /// Creates a form field.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A user-submitted file upload, spooled to temporary storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// Form field the file was submitted under.
    pub field_name: String,
    /// Original file name.
    pub file_name: String,
    /// Declared mime type.
    pub mime_type: String,
    /// Temporary storage location.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// Builds the outbound body for a custom-widget submission.
///
/// Reserved transport fields are always stripped. With at least one file
/// attachment the remaining fields are preserved verbatim alongside the file
/// metadata; without attachments every value is sanitized as plain text and
/// shipped as a JSON object.
#[must_use]
pub fn prepare(fields: Vec<FormField>, files: Vec<FileAttachment>) -> OutboundBody {
    let fields: Vec<FormField> = fields
        .into_iter()
        .filter(|field| !is_reserved(&field.name))
        .collect();

    if files.is_empty() {
        let map: serde_json::Map<String, serde_json::Value> = fields
            .into_iter()
            .map(|field| {
                (
                    field.name,
                    serde_json::Value::String(sanitize_text(&field.value)),
                )
            })
            .collect();
        OutboundBody::Json(serde_json::Value::Object(map))
    } else {
        OutboundBody::Multipart { fields, files }
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// Sanitizes a submitted value as plain text.
///
/// Strips tags and control characters, then collapses runs of whitespace
/// into single spaces and trims the ends.
#[must_use]
pub fn sanitize_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_tag = false;
    let mut last_was_space = true;

    for ch in value.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            c if c.is_control() || c.is_whitespace() => {
                if !last_was_space {
                    out.push(' ');
                    last_was_space = true;
                }
            }
            c => {
                out.push(c);
                last_was_space = false;
            }
        }
    }

    while out.ends_with(' ') {
        out.pop();
    }
    out
}
