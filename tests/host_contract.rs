use metasearch::host::contract::{
    CommandEnvelope, CommandName, ContractErrorKind, EVENT_VERSION, ResponseEnvelope,
};

#[test]
fn command_name_parse_known_and_unknown() {
    assert_eq!(CommandName::parse("search.run"), Some(CommandName::SearchRun));
    assert_eq!(CommandName::parse("cache.clear"), Some(CommandName::CacheClear));
    assert_eq!(
        CommandName::parse("engines.health"),
        Some(CommandName::EnginesHealth)
    );
    assert_eq!(
        CommandName::parse("preferences.update"),
        Some(CommandName::PreferencesUpdate)
    );
    assert_eq!(CommandName::parse("runtime.stop"), Some(CommandName::RuntimeStop));

    assert!(CommandName::parse("runtime.start").is_none());
    assert!(CommandName::parse("search.Run").is_none());

    assert_eq!(CommandName::EnginesList.as_str(), "engines.list");
    assert_eq!(CommandName::PreferencesGet.as_str(), "preferences.get");
}

#[test]
fn command_envelope_json_shape() {
    let envelope = CommandEnvelope::new(
        "req-123",
        CommandName::SearchRun,
        serde_json::json!({"query": "rust", "engine": "all"}),
    );

    let json = serde_json::to_value(&envelope).expect("serialize command envelope");
    assert_eq!(json["v"], EVENT_VERSION);
    assert_eq!(json["request_id"], "req-123");
    assert_eq!(json["command"], "search.run");
    assert_eq!(json["payload"]["query"], "rust");
    assert_eq!(json["payload"]["engine"], "all");
}

#[test]
fn command_envelope_rejects_wrong_version() {
    let mut envelope =
        CommandEnvelope::new("req-1", CommandName::EnginesList, serde_json::json!({}));
    envelope.v = EVENT_VERSION + 1;

    let err = envelope.validate().expect_err("version should be rejected");
    assert_eq!(err.kind, ContractErrorKind::UnsupportedVersion);
}

#[test]
fn unknown_command_fails_to_deserialize() {
    let parsed = serde_json::from_str::<CommandEnvelope>(
        r#"{"v":1,"request_id":"r","command":"device.move","payload":{}}"#,
    );
    assert!(parsed.is_err());
}

#[test]
fn response_envelope_json_shape() {
    let ok = ResponseEnvelope::ok("req-1", serde_json::json!({"cleared": true}));
    let ok_json = serde_json::to_value(&ok).expect("serialize ok response envelope");
    assert_eq!(ok_json["v"], EVENT_VERSION);
    assert_eq!(ok_json["request_id"], "req-1");
    assert_eq!(ok_json["ok"], true);
    assert_eq!(ok_json["payload"]["cleared"], true);
    assert!(ok_json["error"].is_null());

    let err = ResponseEnvelope::error("req-2", "bad payload");
    let err_json = serde_json::to_value(&err).expect("serialize error response envelope");
    assert_eq!(err_json["v"], EVENT_VERSION);
    assert_eq!(err_json["request_id"], "req-2");
    assert_eq!(err_json["ok"], false);
    assert_eq!(err_json["payload"], serde_json::Value::Null);
    assert_eq!(err_json["error"], "bad payload");
}
