//! Content-block validation and type conversion.
//!
//! Blocks arrive from the HTTP layer as untyped JSON (`{"type": ..., "value": ...}`).
//! [`validate_content_block`] is the only way to turn such a value into a typed
//! [`BlockContent`], so anything persisted has already passed the per-type limits below.
//! [`convert_block_value`] reshapes a value when an admin changes a block's type and
//! never fails: on anything it does not understand it hands the input back untouched.

use serde_json::{Map, Value, json};
use thiserror::Error;
use url::Url;

use crate::models::{BlockContent, BlockType, ImageValue, TableValue};

pub const MAX_TEXT_BYTES: usize = 100_000;
pub const MAX_CODE_BYTES: usize = 50_000;
pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_CAPTION_LENGTH: usize = 500;
pub const MAX_ALT_TEXT_LENGTH: usize = 500;
pub const MAX_TABLE_HEADERS: usize = 20;
pub const MAX_TABLE_ROWS: usize = 1000;
pub const MAX_CELL_LENGTH: usize = 1000;

/// Characters of the old value carried into a synthesized table/image.
const CONVERSION_PREVIEW_CHARS: usize = 100;

const ALLOWED_IMAGE_SCHEME: &str = "https";

/// BlockError
///
/// Why a block was rejected. `Display` yields the exact message shown to the admin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// Not an object, or `type`/`value` is absent.
    #[error("Missing required fields")]
    Structure,

    #[error("Invalid block type: {0}")]
    UnknownType(String),

    /// A per-type shape, length or count rule was violated.
    #[error("{0}")]
    Constraint(String),
}

fn constraint(message: impl Into<String>) -> BlockError {
    BlockError::Constraint(message.into())
}

/// validate_content_block
///
/// Validates an untyped block and, on success, returns its typed content.
/// Pure function: no I/O, no logging.
pub fn validate_content_block(block: &Value) -> Result<BlockContent, BlockError> {
    let Some(fields) = block.as_object() else {
        return Err(BlockError::Structure);
    };
    let (Some(kind), Some(value)) = (fields.get("type"), fields.get("value")) else {
        return Err(BlockError::Structure);
    };

    let block_type = kind
        .as_str()
        .and_then(BlockType::parse)
        .ok_or_else(|| BlockError::UnknownType(display_type(kind)))?;

    validate_value(block_type, value)
}

/// validate_value
///
/// Validates `value` against the constraints of an already-known block type.
pub fn validate_value(block_type: BlockType, value: &Value) -> Result<BlockContent, BlockError> {
    match block_type {
        BlockType::Text => validate_text(value, MAX_TEXT_BYTES).map(BlockContent::Text),
        BlockType::Code => validate_text(value, MAX_CODE_BYTES).map(BlockContent::Code),
        BlockType::Image => validate_image(value).map(BlockContent::Image),
        BlockType::Table => validate_table(value).map(BlockContent::Table),
    }
}

fn display_type(kind: &Value) -> String {
    match kind {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn validate_text(value: &Value, max_bytes: usize) -> Result<String, BlockError> {
    let text = value
        .as_str()
        .ok_or_else(|| constraint("Value must be a string"))?;

    // Limits are on the UTF-8 encoding, not on characters.
    if text.len() > max_bytes {
        return Err(constraint(format!(
            "Content exceeds maximum length of {max_bytes} bytes"
        )));
    }
    Ok(text.to_owned())
}

fn validate_image(value: &Value) -> Result<ImageValue, BlockError> {
    let fields = value
        .as_object()
        .ok_or_else(|| constraint("Image value must be an object"))?;

    let (Some(url), Some(caption), Some(alt_text)) = (
        fields.get("url"),
        fields.get("caption"),
        fields.get("alt_text"),
    ) else {
        return Err(constraint("Missing required image fields"));
    };
    let (Some(url), Some(caption), Some(alt_text)) = (url.as_str(), caption.as_str(), alt_text.as_str())
    else {
        return Err(constraint("Image fields must be strings"));
    };

    if !has_allowed_scheme(url) {
        return Err(constraint("Invalid URL scheme"));
    }
    if url.chars().count() > MAX_URL_LENGTH {
        return Err(constraint("URL too long"));
    }
    if caption.chars().count() > MAX_CAPTION_LENGTH {
        return Err(constraint("Caption too long"));
    }
    if alt_text.chars().count() > MAX_ALT_TEXT_LENGTH {
        return Err(constraint("Alt text too long"));
    }

    Ok(ImageValue {
        url: url.to_owned(),
        caption: caption.to_owned(),
        alt_text: alt_text.to_owned(),
    })
}

fn has_allowed_scheme(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| parsed.scheme() == ALLOWED_IMAGE_SCHEME)
        .unwrap_or(false)
}

fn validate_table(value: &Value) -> Result<TableValue, BlockError> {
    let fields = value
        .as_object()
        .ok_or_else(|| constraint("Table value must be an object"))?;

    let (Some(headers), Some(rows)) = (fields.get("headers"), fields.get("rows")) else {
        return Err(constraint("Missing required table fields"));
    };
    let (Some(headers), Some(rows)) = (headers.as_array(), rows.as_array()) else {
        return Err(constraint("Headers and rows must be lists"));
    };

    if headers.len() > MAX_TABLE_HEADERS {
        return Err(constraint("Too many headers"));
    }
    if rows.len() > MAX_TABLE_ROWS {
        return Err(constraint("Too many rows"));
    }

    let headers = headers
        .iter()
        .map(|header| checked_cell(header, "Header cell must be a scalar", "Header cell too long"))
        .collect::<Result<Vec<_>, _>>()?;

    let rows = rows
        .iter()
        .map(|row| {
            let cells = row
                .as_array()
                .ok_or_else(|| constraint("Row must be a list"))?;
            if cells.len() != headers.len() {
                return Err(constraint("Row length must match headers"));
            }
            cells
                .iter()
                .map(|cell| checked_cell(cell, "Row cell must be a scalar", "Row cell too long"))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TableValue { headers, rows })
}

fn checked_cell(
    cell: &Value,
    not_scalar: &'static str,
    too_long: &'static str,
) -> Result<String, BlockError> {
    let text = cell_text(cell).ok_or_else(|| constraint(not_scalar))?;
    if text.chars().count() > MAX_CELL_LENGTH {
        return Err(constraint(too_long));
    }
    Ok(text)
}

/// Strings pass through; numbers and booleans are stringified.
fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// convert_block_value
///
/// Reshapes `value` from `old_type`'s representation to `new_type`'s.
///
/// * text/code string → table/image: parsed as JSON if possible, otherwise wrapped in a
///   default structure that keeps the first 100 characters.
/// * table/image object → text/code: rendered as a readable string. The table form
///   (`" | "`-joined cells, one line per row) is lossy and is not parsed back.
/// * any other combination returns `value` unchanged.
pub fn convert_block_value(old_type: &str, new_type: &str, value: Value) -> Value {
    if old_type == new_type {
        return value;
    }
    let (Some(source), Some(target)) = (BlockType::parse(old_type), BlockType::parse(new_type))
    else {
        return value;
    };

    match value {
        Value::String(text) if !source.is_structured() && target.is_structured() => {
            parse_or_default(target, text)
        }
        Value::Object(fields) if source.is_structured() && !target.is_structured() => {
            let rendered = match source {
                BlockType::Table => table_to_text(&fields),
                BlockType::Image => image_to_text(&fields),
                BlockType::Text | BlockType::Code => None,
            };
            match rendered {
                Some(text) => Value::String(text),
                None => Value::Object(fields),
            }
        }
        other => other,
    }
}

fn parse_or_default(target: BlockType, text: String) -> Value {
    if let Ok(parsed) = serde_json::from_str::<Value>(&text) {
        return parsed;
    }

    let preview: String = text.chars().take(CONVERSION_PREVIEW_CHARS).collect();
    match target {
        BlockType::Table => json!({
            "headers": ["Column 1", "Column 2"],
            "rows": [["Data", preview]],
        }),
        BlockType::Image => json!({
            "url": "",
            "caption": preview,
            "alt_text": preview,
        }),
        BlockType::Text | BlockType::Code => Value::String(text),
    }
}

fn table_to_text(fields: &Map<String, Value>) -> Option<String> {
    let headers = match fields.get("headers") {
        None => Vec::new(),
        Some(headers) => string_list(headers)?,
    };
    let rows = match fields.get("rows") {
        None => Vec::new(),
        Some(rows) => rows
            .as_array()?
            .iter()
            .map(|row| string_list(row).map(|cells| cells.join(" | ")))
            .collect::<Option<Vec<_>>>()?,
    };

    Some(format!("{}\n{}", headers.join(" | "), rows.join("\n")))
}

fn image_to_text(fields: &Map<String, Value>) -> Option<String> {
    let caption = optional_str(fields, "caption")?;
    let url = optional_str(fields, "url")?;
    Some(format!("Image: {caption}\nURL: {url}"))
}

/// Missing keys read as ""; present keys must be strings.
fn optional_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    match fields.get(key) {
        None => Some(""),
        Some(value) => value.as_str(),
    }
}

fn string_list(value: &Value) -> Option<Vec<&str>> {
    value.as_array()?.iter().map(Value::as_str).collect()
}

/// revise_block
///
/// The edit pipeline behind the admin "edit content block" action: pick the incoming value
/// (or the stored one when none was sent), convert it if the type changed, decode JSON
/// strings submitted for structured types, then validate. On any error the caller must
/// leave the stored block as it was.
pub fn revise_block(
    current: &BlockContent,
    new_type: &str,
    value: Option<Value>,
) -> Result<BlockContent, BlockError> {
    let target = BlockType::parse(new_type)
        .ok_or_else(|| BlockError::UnknownType(new_type.to_owned()))?;
    let old_type = current.block_type();

    let value = match value {
        None | Some(Value::Null) => current.to_value(),
        Some(Value::String(s)) if s.is_empty() => return Err(BlockError::Structure),
        Some(value) => value,
    };

    let value = if target != old_type {
        convert_block_value(old_type.as_str(), target.as_str(), value)
    } else {
        value
    };

    let value = match value {
        Value::String(raw) if target.is_structured() => serde_json::from_str(&raw)
            .map_err(|_| constraint("Invalid format for content type"))?,
        other => other,
    };

    validate_value(target, &value)
}
