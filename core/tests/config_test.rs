use freethinker_core::{AgentConfig, FreethinkerError, RawResult, ToolInvocation, Verifier};
use serde_json::json;
use serial_test::serial;
use std::io::Write;

const ENV_VARS: [&str; 4] = [
    "FREETHINKER_CONFIG",
    "FREETHINKER_PROVIDER",
    "FREETHINKER_MODEL",
    "FREETHINKER_TIMEOUT_MS",
];

fn clear_env() {
    for v in ENV_VARS {
        std::env::remove_var(v);
    }
}

#[test]
#[serial]
fn defaults_without_env_or_file() {
    clear_env();
    let cfg = AgentConfig::default();
    assert_eq!(cfg.default_provider, "groq");
    assert_eq!(cfg.default_model, None);
    assert_eq!(cfg.request_timeout_ms, 30_000);
    assert!(cfg.interpret_results);
    assert_eq!(cfg.penalties.missing_fields, 0.3);
    assert_eq!(cfg.penalties.invocation_failure, 0.6);
    assert_eq!(cfg.penalties.conflict, 0.2);
}

#[test]
#[serial]
fn env_overrides_defaults() {
    clear_env();
    std::env::set_var("FREETHINKER_PROVIDER", "mistral");
    std::env::set_var("FREETHINKER_MODEL", "open-mixtral-8x7b");
    std::env::set_var("FREETHINKER_TIMEOUT_MS", "1500");
    let cfg = AgentConfig::default();
    clear_env();

    assert_eq!(cfg.default_provider, "mistral");
    assert_eq!(cfg.default_model.as_deref(), Some("open-mixtral-8x7b"));
    assert_eq!(cfg.request_timeout_ms, 1500);
}

#[test]
#[serial]
fn toml_overlays_env_defaults() {
    clear_env();
    let cfg = AgentConfig::from_toml_str(
        r#"
        default_provider = "gemini"
        interpret_results = false

        [providers]
        gemini_base_url = "http://localhost:8080/v1beta"

        [tools]
        forum_limit = 10

        [verifier]
        conflict = 0.1
        "#,
    )
    .unwrap();

    assert_eq!(cfg.default_provider, "gemini");
    assert!(!cfg.interpret_results);
    assert_eq!(cfg.gemini_base_url, "http://localhost:8080/v1beta");
    assert_eq!(cfg.forum_limit, 10);
    assert_eq!(cfg.search_limit, 5);
    assert_eq!(cfg.penalties.conflict, 0.1);
    assert_eq!(cfg.penalties.missing_fields, 0.3);
}

#[test]
#[serial]
fn invalid_toml_is_config_error() {
    let err = AgentConfig::from_toml_str("default_provider = [").unwrap_err();
    assert!(matches!(err, FreethinkerError::Config(_)));
}

#[test]
#[serial]
fn load_reads_file_named_by_env() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "request_timeout_ms = 4200\nuser_agent = \"test-agent\"").unwrap();
    std::env::set_var("FREETHINKER_CONFIG", file.path());

    let cfg = AgentConfig::load();
    clear_env();

    assert_eq!(cfg.request_timeout_ms, 4200);
    assert_eq!(cfg.user_agent, "test-agent");
}

#[test]
#[serial]
fn load_falls_back_on_missing_or_broken_file() {
    clear_env();
    std::env::set_var("FREETHINKER_CONFIG", "/nonexistent/freethinker.toml");
    assert_eq!(AgentConfig::load(), AgentConfig::default());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "this is = = not toml").unwrap();
    std::env::set_var("FREETHINKER_CONFIG", file.path());
    let cfg = AgentConfig::load();
    clear_env();
    assert_eq!(cfg, AgentConfig::default());
}

#[test]
#[serial]
fn negative_verifier_penalties_are_rejected() {
    clear_env();
    for toml in [
        "[verifier]\nconflict = -0.2",
        "[verifier]\nmissing_fields = -0.5",
        "[verifier]\ninvocation_failure = -1.0",
        "[verifier]\ncross_validation_threshold = 1.5",
    ] {
        let err = AgentConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, FreethinkerError::Config(_)), "{} -> {}", toml, err);
    }
}

#[test]
#[serial]
fn lenient_failure_penalty_still_caps_failed_confidence() {
    clear_env();
    let cfg = AgentConfig::from_toml_str("[verifier]\ninvocation_failure = 0.2").unwrap();
    assert_eq!(cfg.penalties.invocation_failure, 0.2);

    let verifier = Verifier::new(cfg.penalties);
    let inv = ToolInvocation::new(
        "calculator",
        json!({}),
        RawResult::Failure {
            reason: "overflow".into(),
            partial: Some(json!({"num1": 1, "num2": 2, "operation": "add", "result": 3})),
        },
    );
    let v = verifier.verify(&inv);
    assert!(v.confidence <= 0.4, "scored {}", v.confidence);
    assert!(v.has_flag("invocation_failed"));
}
