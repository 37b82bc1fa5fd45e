//! Key-path patching of the structured data file.
//!
//! Dot-delimited paths address into one JSON document: all-digit segments
//! index sequences, everything else addresses mapping fields. Setting a
//! value on an absent path materializes the intermediate containers, picking
//! a sequence or mapping by looking at the *next* segment. A patch only ever
//! sets values at the given paths — keys outside them survive untouched.

use crate::errors::GatewayError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Highest sequence slot a patch may address. Key paths come from rendered
/// pages, where sequences are short; anything past this is a bad request,
/// not a cue to allocate a huge null-padded vector.
pub const MAX_SEQUENCE_INDEX: usize = 10_000;

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn parse_index(segment: &str, path: &str) -> Result<usize, GatewayError> {
    segment
        .parse::<usize>()
        .ok()
        .filter(|i| *i <= MAX_SEQUENCE_INDEX)
        .ok_or_else(|| {
            GatewayError::MalformedRequest(format!("index {} out of range in {}", segment, path))
        })
}

fn container_for(segment: &str) -> Value {
    if is_index(segment) {
        Value::Array(Vec::new())
    } else {
        Value::Object(serde_json::Map::new())
    }
}

/// Set one value at a dot path, creating intermediate containers as needed.
pub fn set_by_path(doc: &mut Value, path: &str, value: Value) -> Result<(), GatewayError> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut cursor = doc;
    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        if is_index(segment) {
            let index = parse_index(segment, path)?;
            if !cursor.is_array() {
                *cursor = Value::Array(Vec::new());
            }
            let arr = cursor.as_array_mut().expect("just ensured array");
            while arr.len() <= index {
                arr.push(Value::Null);
            }
            if last {
                arr[index] = value;
                return Ok(());
            }
            if arr[index].is_null() {
                arr[index] = container_for(segments[i + 1]);
            }
            cursor = &mut arr[index];
        } else {
            if !cursor.is_object() {
                *cursor = Value::Object(serde_json::Map::new());
            }
            let obj = cursor.as_object_mut().expect("just ensured object");
            if last {
                obj.insert(segment.to_string(), value);
                return Ok(());
            }
            let next = segments[i + 1];
            cursor = obj
                .entry(segment.to_string())
                .or_insert_with(|| container_for(next));
        }
    }
    Ok(())
}

/// Apply a save payload's key-path changes to a document.
pub fn apply_changes(
    doc: &mut Value,
    changes: &BTreeMap<String, String>,
) -> Result<(), GatewayError> {
    for (path, markup) in changes {
        set_by_path(doc, path, Value::String(markup.clone()))?;
    }
    Ok(())
}

/// Read-modify-write the data file. A missing file starts from an empty
/// mapping; malformed JSON on read is fatal for the request.
pub fn patch_file(
    path: &Path,
    changes: &BTreeMap<String, String>,
) -> Result<(), GatewayError> {
    let mut doc = match std::fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw)
            .map_err(|e| GatewayError::MalformedRequest(format!("data file: {}", e)))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Value::Object(serde_json::Map::new()),
        Err(e) => return Err(e.into()),
    };

    apply_changes(&mut doc, changes)?;

    let pretty = serde_json::to_string_pretty(&doc)
        .map_err(|e| GatewayError::MalformedRequest(e.to_string()))?;
    std::fs::write(path, pretty + "\n")?;
    tracing::info!(file = %path.display(), keys = changes.len(), "patched data file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sets_nested_mapping_fields() {
        let mut doc = json!({ "site": { "title": "Old" } });
        set_by_path(&mut doc, "site.title", json!("New")).unwrap();
        assert_eq!(doc, json!({ "site": { "title": "New" } }));
    }

    #[test]
    fn numeric_segments_index_sequences() {
        let mut doc = json!({ "days": [{ "title": "a" }, { "title": "b" }] });
        set_by_path(&mut doc, "days.1.title", json!("B")).unwrap();
        assert_eq!(doc["days"][1]["title"], json!("B"));
        assert_eq!(doc["days"][0]["title"], json!("a"));
    }

    #[test]
    fn absent_paths_materialize_by_next_segment() {
        let mut doc = json!({});
        set_by_path(&mut doc, "days.2.title", json!("late")).unwrap();
        assert_eq!(
            doc,
            json!({ "days": [null, null, { "title": "late" }] })
        );
    }

    #[test]
    fn absurd_sequence_index_is_a_bad_request() {
        let mut doc = json!({ "days": [] });
        let err = set_by_path(&mut doc, "days.999999999.title", json!("x")).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedRequest(_)));
        // and nothing was padded in
        assert_eq!(doc, json!({ "days": [] }));

        // overflow-sized digit strings fail the same way
        let err =
            set_by_path(&mut doc, "days.99999999999999999999.title", json!("x")).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedRequest(_)));
    }

    #[test]
    fn patch_never_removes_unrelated_keys() {
        let mut doc = json!({
            "site": { "title": "T", "lang": "en" },
            "days": [{ "title": "a", "note": "n" }]
        });
        let mut changes = BTreeMap::new();
        changes.insert("days.0.title".to_string(), "A".to_string());
        apply_changes(&mut doc, &changes).unwrap();

        assert_eq!(doc["days"][0]["title"], json!("A"));
        assert_eq!(doc["days"][0]["note"], json!("n"));
        assert_eq!(doc["site"]["lang"], json!("en"));
        assert_eq!(doc["site"]["title"], json!("T"));
    }

    #[test]
    fn patch_file_round_trips_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("site.json");
        std::fs::write(&file, "{\"days\": [{\"title\": \"a\"}]}").unwrap();

        let mut changes = BTreeMap::new();
        changes.insert("days.0.title".to_string(), "patched".to_string());
        patch_file(&file, &changes).unwrap();

        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(doc["days"][0]["title"], json!("patched"));
    }

    #[test]
    fn malformed_data_file_is_fatal_for_the_request() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("site.json");
        std::fs::write(&file, "{ nope").unwrap();

        let mut changes = BTreeMap::new();
        changes.insert("x".to_string(), "y".to_string());
        let err = patch_file(&file, &changes).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedRequest(_)));
        // and the broken file was not clobbered
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "{ nope");
    }
}
