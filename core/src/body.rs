//! Request body encoding and response body decoding.
//!
//! Field maps keep insertion order (`serde_json` is built with
//! `preserve_order`), so both JSON objects and multipart parts come out in
//! the order the caller added them.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BuildError;
use crate::http::{ContentType, Part, RequestBody, OCTET_STREAM};

/// Key-value payload of a request body.
pub type Fields = serde_json::Map<String, Value>;

/// Encode `fields` as one JSON object sent with `content_type`'s media type.
/// `null` values are written out, not skipped.
pub fn encode_json(content_type: ContentType, fields: &Fields) -> Result<RequestBody, BuildError> {
    let bytes = serde_json::to_vec(fields).map_err(BuildError::Encode)?;
    Ok(RequestBody::Json {
        media_type: content_type.media_type(),
        bytes,
    })
}

/// A multipart body with one file part per entry.
pub fn encode_files(files: &[(String, PathBuf)]) -> RequestBody {
    RequestBody::Multipart(files.iter().map(|(name, path)| file_part(name, path)).collect())
}

/// A multipart body with a text part per field followed by a file part per
/// file.
pub fn encode_combined(fields: &Fields, files: &[(String, PathBuf)]) -> RequestBody {
    let text = fields.iter().map(|(name, value)| Part::Text {
        name: name.clone(),
        value: field_text(value),
    });
    let files = files.iter().map(|(name, path)| file_part(name, path));
    RequestBody::Multipart(text.chain(files).collect())
}

/// Decode a JSON body, replacing malformed UTF-8 instead of rejecting it.
pub fn decode<D: DeserializeOwned>(bytes: &[u8]) -> Result<D, serde_json::Error> {
    let text = String::from_utf8_lossy(bytes);
    serde_json::from_str(&text)
}

fn file_part(name: &str, path: &Path) -> Part {
    Part::File {
        name: name.to_string(),
        filename: path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default(),
        media_type: OCTET_STREAM,
        path: path.to_path_buf(),
    }
}

// Strings go out bare; everything else as its JSON text.
fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
