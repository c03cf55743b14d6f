use super::*;

#[test]
fn io_error_mentions_path() {
    let err = Error::Io {
        path: PathBuf::from("/tmp/settings.json"),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
    };
    let msg = err.to_string();
    assert!(msg.contains("/tmp/settings.json"));
    assert!(msg.contains("denied"));
}

#[test]
fn json_error_converts_with_question_mark() {
    fn parse() -> Result<serde_json::Value> {
        Ok(serde_json::from_str("{not json")?)
    }
    assert!(matches!(parse(), Err(Error::Json(_))));
}

#[test]
fn delivery_errors_name_the_tab() {
    assert_eq!(
        DeliveryError::NoReceiver(7).to_string(),
        "no receiving renderer for tab 7"
    );
    assert!(DeliveryError::Timeout(3).to_string().contains("tab 3"));
}

#[test]
fn delivery_error_wraps_transparently() {
    let err: Error = DeliveryError::Dropped(2).into();
    assert_eq!(err.to_string(), "renderer for tab 2 dropped the request");
}
