use super::*;
use proptest::prelude::*;
use serde_json::json;

fn path(tokens: Vec<PathToken>) -> JsonPath {
    JsonPath::from_tokens(tokens)
}

#[test]
fn display_uses_dots_for_identifiers() {
    let p = path(vec!["foo".into(), 3.into(), "odd key".into()]);
    assert_eq!(p.display(), r#"root.foo[3]["odd key"]"#);
}

#[test]
fn display_brackets_structural_keys() {
    let p = path(vec!["a.b".into(), "c[0]".into(), "$ok".into(), "9lives".into()]);
    assert_eq!(p.display(), r#"root["a.b"]["c[0]"].$ok["9lives"]"#);
}

#[test]
fn display_escapes_quotes_inside_keys() {
    let p = path(vec![r#"say "hi""#.into()]);
    assert_eq!(p.display(), r#"root["say \"hi\""]"#);
}

#[test]
fn root_displays_as_root() {
    assert_eq!(JsonPath::root().display(), "root");
    assert_eq!(JsonPath::root().encode(), "[]");
}

#[test]
fn encode_keeps_numeric_keys_distinct_from_indices() {
    let p = path(vec!["0".into(), 0.into()]);
    assert_eq!(p.encode(), r#"["0",0]"#);
    let decoded = JsonPath::decode(&p.encode()).unwrap();
    assert_eq!(decoded, p);
}

#[test]
fn decode_rejects_garbage() {
    assert!(matches!(JsonPath::decode("root.a"), Err(Error::InvalidPath(_))));
    assert!(JsonPath::decode("[-1]").is_err());
    assert!(JsonPath::decode("[1.5]").is_err());
}

#[test]
fn resolve_walks_keys_and_indices() {
    let doc = json!({"a": {"b.c": [10, {"d": true}]}});
    let p = path(vec!["a".into(), "b.c".into(), 1.into(), "d".into()]);
    assert_eq!(p.resolve(&doc), Some(&json!(true)));
}

#[test]
fn resolve_short_circuits_on_missing_segment() {
    let doc = json!({"a": [1, 2]});
    assert_eq!(path(vec!["a".into(), 5.into()]).resolve(&doc), None);
    assert_eq!(path(vec!["missing".into(), 0.into()]).resolve(&doc), None);
    // index applied to an object, key applied to an array
    assert_eq!(path(vec![0.into()]).resolve(&doc), None);
    assert_eq!(path(vec!["a".into(), "0".into()]).resolve(&doc), None);
}

#[test]
fn pointer_escapes_slash_and_tilde() {
    let p = path(vec!["a/b".into(), "m~n".into(), 2.into()]);
    assert_eq!(p.pointer(), "/a~1b/m~0n/2");
    let doc = json!({"a/b": {"m~n": [0, 0, "hit"]}});
    assert_eq!(doc.pointer(&p.pointer()), Some(&json!("hit")));
}

fn token_strategy() -> impl Strategy<Value = PathToken> {
    prop_oneof![
        (0usize..10_000).prop_map(PathToken::Index),
        ".*".prop_map(PathToken::Key),
    ]
}

proptest! {
    #[test]
    fn display_survives_encode_decode(tokens in prop::collection::vec(token_strategy(), 0..8)) {
        let decoded = decode_path_tokens(&encode_path_tokens(&tokens)).unwrap();
        prop_assert_eq!(format_path_display(&decoded), format_path_display(&tokens));
        prop_assert_eq!(decoded, tokens);
    }
}
