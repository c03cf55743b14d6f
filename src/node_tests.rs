use super::*;
use serde_json::json;
use tempfile::tempdir;

fn p(tokens: Vec<crate::path::PathToken>) -> JsonPath {
    JsonPath::from_tokens(tokens)
}

#[test]
fn inspect_container_reports_entry_count() {
    let doc = json!({"users": [{"id": 1}, {"id": 2}], "meta": {}});
    let info = inspect(&doc, &p(vec!["users".into()]), 120);
    assert_eq!(info.value_type, "array");
    assert_eq!(info.size, Some(2));
    assert_eq!(info.preview, "[…] 2 items");
    assert_eq!(info.display_path, "root.users");
    assert_eq!(info.pointer, "/users");

    let info = inspect(&doc, &p(vec!["meta".into()]), 120);
    assert_eq!(info.preview, "{} 0 keys");
}

#[test]
fn inspect_string_truncates_preview() {
    let doc = json!({"s": "abcdefghij"});
    let info = inspect(&doc, &p(vec!["s".into()]), 4);
    assert_eq!(info.value_type, "string");
    assert_eq!(info.size, Some(10));
    assert_eq!(info.preview, "abcd…");
}

#[test]
fn inspect_missing_path_is_undefined() {
    let doc = json!({"a": [1]});
    let info = inspect(&doc, &p(vec!["a".into(), 3.into(), "x".into()]), 120);
    assert_eq!(info.value_type, "undefined");
    assert_eq!(info.size, None);
}

#[test]
fn copy_node_value_writes_pretty_json() {
    let doc = json!({"a": {"b": [1, 2]}});
    let mut cb = MemoryClipboard::default();
    copy_node_value(&doc, &p(vec!["a".into()]), &mut cb).unwrap();
    assert_eq!(cb.contents.as_deref(), Some("{\n  \"b\": [\n    1,\n    2\n  ]\n}"));
}

#[test]
fn copy_failure_leaves_clipboard_untouched() {
    let doc = json!([1]);
    let mut cb = MemoryClipboard { contents: None, unavailable: true };
    assert!(matches!(copy_node_value(&doc, &JsonPath::root(), &mut cb), Err(Error::Clipboard(_))));
    assert!(cb.contents.is_none());

    let mut cb = MemoryClipboard::default();
    assert!(matches!(
        copy_node_value(&doc, &p(vec![4.into()]), &mut cb),
        Err(Error::InvalidPath(_))
    ));
}

#[test]
fn copy_path_uses_display_form() {
    let mut cb = MemoryClipboard::default();
    copy_path(&p(vec!["odd key".into(), 0.into()]), &mut cb).unwrap();
    assert_eq!(cb.contents.as_deref(), Some(r#"root["odd key"][0]"#));
}

#[test]
fn download_writes_timestamped_file() {
    let dir = tempdir().unwrap();
    let doc = json!({"x": 1});
    let path = download_document(&doc, dir.path(), 1_700_000_000_000).unwrap();
    assert_eq!(path.file_name().unwrap(), "data-1700000000000.json");
    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, doc);
}

#[test]
fn download_into_missing_dir_fails_cleanly() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");
    assert!(matches!(download_document(&json!([]), &missing, 1), Err(Error::Io { .. })));
    assert!(!missing.exists());
}

#[test]
fn stats_count_every_node() {
    let doc = json!({"a": 1, "b": [1, 2, 3]});
    // root + a + b + three items
    assert_eq!(count_nodes(&doc), 6);
    let s = stats(&doc);
    assert_eq!(s.complexity, "6 elements");
    assert_eq!(s.size, "19B");
}

#[test]
fn sizes_and_counts_are_human_readable() {
    assert_eq!(format_size(512), "512B");
    assert_eq!(format_size(1536), "1.5KB");
    assert_eq!(format_size(3 * 1024 * 1024), "3.0MB");
    assert_eq!(format_count(1234567), "1,234,567");
    assert_eq!(format_count(999), "999");
}
