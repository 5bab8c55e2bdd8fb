//! # Change Messages
//!
//! Decoding of the server's push frames into typed change messages.
//!
//! A frame is one JSON document of the form
//! `{"type": "<kind>", "data": <payload>}`. The server sends payloads as an
//! object keyed by file id; arrays are accepted too. Delete payloads may be
//! given as an id-keyed object, an array of ids, or an array of objects that
//! carry an `id`. Any other top-level field (`must_send`, ...) is ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{FilesError, Result};
use crate::models::MediaFile;

/// Discriminant of a change message, with its wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "create_file")]
    Create,
    #[serde(rename = "update_file")]
    Update,
    #[serde(rename = "delete_file")]
    Delete,
    #[serde(rename = "refresh_files")]
    Refresh,
}

impl ChangeKind {
    pub fn wire_name(&self) -> &'static str {
        match self {
            ChangeKind::Create => "create_file",
            ChangeKind::Update => "update_file",
            ChangeKind::Delete => "delete_file",
            ChangeKind::Refresh => "refresh_files",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A decoded change message.
///
/// Create, update and refresh share upsert semantics; only the wire name
/// differs.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeMessage {
    Create(Vec<MediaFile>),
    Update(Vec<MediaFile>),
    Refresh(Vec<MediaFile>),
    Delete(Vec<String>),
}

/// Frame envelope before the payload is interpreted.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: ChangeKind,
    #[serde(default)]
    data: Value,
}

impl ChangeMessage {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeMessage::Create(_) => ChangeKind::Create,
            ChangeMessage::Update(_) => ChangeKind::Update,
            ChangeMessage::Refresh(_) => ChangeKind::Refresh,
            ChangeMessage::Delete(_) => ChangeKind::Delete,
        }
    }

    /// Number of entries in the payload.
    pub fn len(&self) -> usize {
        match self {
            ChangeMessage::Create(files)
            | ChangeMessage::Update(files)
            | ChangeMessage::Refresh(files) => files.len(),
            ChangeMessage::Delete(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode a text frame.
    ///
    /// A frame holding JSON `null` decodes to `Ok(None)`, which applies as a
    /// no-op.
    pub fn decode(text: &str) -> Result<Option<Self>> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| FilesError::decode(format!("frame is not JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Option<Self>> {
        if value.is_null() {
            return Ok(None);
        }

        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|e| FilesError::decode(format!("invalid change envelope: {}", e)))?;

        let message = match envelope.kind {
            ChangeKind::Create => ChangeMessage::Create(decode_files(envelope.data)?),
            ChangeKind::Update => ChangeMessage::Update(decode_files(envelope.data)?),
            ChangeKind::Refresh => ChangeMessage::Refresh(decode_files(envelope.data)?),
            ChangeKind::Delete => ChangeMessage::Delete(decode_ids(envelope.data)?),
        };
        Ok(Some(message))
    }

    /// Encode in the server's wire shape (id-keyed `data` object).
    pub fn to_value(&self) -> Value {
        let data = match self {
            ChangeMessage::Create(files)
            | ChangeMessage::Update(files)
            | ChangeMessage::Refresh(files) => {
                let mut map = Map::with_capacity(files.len());
                for file in files {
                    if let Ok(value) = serde_json::to_value(file) {
                        map.insert(file.id.clone(), value);
                    }
                }
                map
            }
            ChangeMessage::Delete(ids) => ids
                .iter()
                .map(|id| (id.clone(), Value::Object(Map::new())))
                .collect(),
        };

        serde_json::json!({
            "type": self.kind().wire_name(),
            "data": Value::Object(data),
        })
    }
}

/// Decode a list of files from an id-keyed object or an array.
///
/// Object keys are informational; each entry's own `id` is authoritative.
pub fn decode_files(data: Value) -> Result<Vec<MediaFile>> {
    let entries = match data {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect::<Vec<_>>(),
        Value::Array(items) => items,
        other => {
            return Err(FilesError::decode(format!(
                "expected file map or list, found {}",
                json_type(&other)
            )))
        }
    };

    entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value::<MediaFile>(entry)
                .map_err(|e| FilesError::decode(format!("invalid file entry: {}", e)))
        })
        .collect()
}

fn decode_ids(data: Value) -> Result<Vec<String>> {
    match data {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map.into_iter().map(|(id, _)| id).collect()),
        Value::Array(items) => items.into_iter().map(id_of).collect(),
        other => Err(FilesError::decode(format!(
            "expected id map or list, found {}",
            json_type(&other)
        ))),
    }
}

fn id_of(entry: Value) -> Result<String> {
    match entry {
        Value::String(id) => Ok(id),
        Value::Object(mut object) => match object.remove("id") {
            Some(Value::String(id)) => Ok(id),
            _ => Err(FilesError::decode("delete entry has no string id")),
        },
        other => Err(FilesError::decode(format!(
            "invalid delete entry: {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileStatus;
    use serde_json::json;

    #[test]
    fn test_decode_server_update() {
        let frame = json!({
            "type": "update_file",
            "must_send": true,
            "data": {
                "b1": { "id": "b1", "filePath": "/in/b.mkv", "status": "processing", "progress": 42.5 },
                "a1": { "id": "a1", "filePath": "/in/a.mkv", "status": "queued", "progress": 0 }
            }
        })
        .to_string();

        let message = ChangeMessage::decode(&frame).unwrap().unwrap();
        assert_eq!(message.kind(), ChangeKind::Update);
        match message {
            ChangeMessage::Update(files) => {
                assert_eq!(files.len(), 2);
                assert_eq!(files[0].id, "b1");
                assert_eq!(files[0].status, FileStatus::Processing);
                assert_eq!(files[1].id, "a1");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_array_payload() {
        let frame = json!({
            "type": "create_file",
            "data": [{ "id": "x", "filePath": "/x.mp4" }]
        })
        .to_string();

        let message = ChangeMessage::decode(&frame).unwrap().unwrap();
        assert_eq!(message, ChangeMessage::Create(vec![MediaFile::new("x", "/x.mp4")]));
    }

    #[test]
    fn test_decode_delete_shapes() {
        let keyed = json!({ "type": "delete_file", "data": { "a": {}, "b": { "id": "b" } } });
        let ids = json!({ "type": "delete_file", "data": ["a", "b"] });
        let objects = json!({ "type": "delete_file", "data": [{ "id": "a" }, { "id": "b", "filePath": "/b" }] });

        for frame in [keyed, ids, objects] {
            let message = ChangeMessage::from_value(frame).unwrap().unwrap();
            assert_eq!(
                message,
                ChangeMessage::Delete(vec!["a".to_string(), "b".to_string()])
            );
        }
    }

    #[test]
    fn test_null_frame_is_no_message() {
        assert_eq!(ChangeMessage::decode("null").unwrap(), None);
    }

    #[test]
    fn test_missing_data_is_empty() {
        let message = ChangeMessage::decode(r#"{"type":"refresh_files"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(message, ChangeMessage::Refresh(Vec::new()));
        assert!(message.is_empty());
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        let frames = [
            "not json",
            r#"{"data": {}}"#,
            r#"{"type": "rename_file", "data": {}}"#,
            r#"{"type": "update_file", "data": 5}"#,
            r#"{"type": "update_file", "data": {"a": {"filePath": "/a"}}}"#,
            r#"{"type": "delete_file", "data": [7]}"#,
            r#"{"type": "delete_file", "data": [{"name": "a"}]}"#,
        ];

        for frame in frames {
            let err = ChangeMessage::decode(frame).unwrap_err();
            assert!(matches!(err, FilesError::Decode(_)), "frame {} gave {:?}", frame, err);
        }
    }

    #[test]
    fn test_wire_shape_decodes_back() {
        let message = ChangeMessage::Update(vec![
            MediaFile::new("a", "/a.mp4").with_progress(10.0),
            MediaFile::new("b", "/b.mp4").with_status(FileStatus::Failed),
        ]);
        let value = message.to_value();
        assert_eq!(value["type"], "update_file");
        assert!(value["data"]["a"].is_object());

        assert_eq!(ChangeMessage::from_value(value).unwrap(), Some(message));
    }
}
