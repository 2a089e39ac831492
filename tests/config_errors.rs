// tests/config_errors.rs

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use dagworker::config::{load_and_validate, parse_duration};
use dagworker::errors::DagworkerError;
use dagworker::types::Mode;

fn pipeline_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn demo_pipeline_loads() {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cfg = load_and_validate(manifest_dir.join("demos/photogrammetry.toml")).unwrap();

    assert_eq!(cfg.node.len(), 5);
    assert_eq!(cfg.config.mode, Mode::DryRun);
    assert_eq!(cfg.config.cache.as_deref(), Some("cache"));

    let remote = cfg.remote.as_ref().unwrap();
    assert_eq!(remote.poll_interval(), Duration::from_millis(250));

    let fe = cfg.node.get("FeatureExtraction").unwrap();
    assert_eq!(fe.after, vec!["CameraInit".to_string()]);
    assert_eq!(fe.params.get("describerTypes").map(String::as_str), Some("sift"));
}

#[test]
fn test_dag_cycle_returns_structured_error() {
    let file = pipeline_file(
        r#"
[node.A]
cmd = "echo A"
after = ["B"]

[node.B]
cmd = "echo B"
after = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagworkerError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains("A") || msg.contains("B"));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_dependency_returns_config_error() {
    let file = pipeline_file(
        r#"
[node.A]
cmd = "echo A"
after = ["NonExistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagworkerError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("NonExistent"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn self_dependency_is_rejected() {
    let file = pipeline_file(
        r#"
[node.A]
cmd = "echo A"
after = ["A"]
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, DagworkerError::ConfigError(ref m) if m.contains("itself")));
}

#[test]
fn empty_pipeline_is_rejected() {
    let file = pipeline_file("[config]\nmode = \"local\"\n");
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, DagworkerError::ConfigError(ref m) if m.contains("at least one")));
}

#[test]
fn node_names_must_be_path_safe() {
    let file = pipeline_file(
        r#"
[node."../escape"]
cmd = "echo nope"
"#,
    );
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, DagworkerError::ConfigError(ref m) if m.contains("invalid node name")));
}

#[test]
fn bad_poll_interval_is_rejected() {
    let file = pipeline_file(
        r#"
[remote]
spool = "spool"
poll_interval = "soon"

[node.A]
cmd = "echo A"
"#,
    );
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, DagworkerError::ConfigError(ref m) if m.contains("poll_interval")));
}

#[test]
fn oversized_poll_interval_is_rejected() {
    let file = pipeline_file(
        r#"
[remote]
spool = "spool"
poll_interval = "9999999999999999999h"

[node.A]
cmd = "echo A"
"#,
    );
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, DagworkerError::ConfigError(ref m) if m.contains("too large")));
}

#[test]
fn unknown_mode_is_a_toml_error() {
    let file = pipeline_file(
        r#"
[config]
mode = "cluster"

[node.A]
cmd = "echo A"
"#,
    );
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, DagworkerError::TomlError(_)));
}

#[test]
fn durations_and_modes_parse() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("5d").is_err());
    assert_eq!(
        parse_duration("18446744073709551615s"),
        Ok(Duration::from_secs(u64::MAX))
    );
    assert!(parse_duration("307445734561825861m").is_err());

    assert_eq!("dry-run".parse::<Mode>(), Ok(Mode::DryRun));
    assert_eq!("Local".parse::<Mode>(), Ok(Mode::Local));
    assert!("tractor".parse::<Mode>().is_err());
}
