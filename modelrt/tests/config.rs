mod common;

use std::io::Write;

use common::{init_tracing, two_input_model};
use giztoy_modelrt::mock::MockEngine;
use giztoy_modelrt::{DelegateKind, ModelRunner, RunnerConfig, RunnerError, register_model};

fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn load_yaml_by_extension() {
    let file = write_file(
        ".yaml",
        "model:\n  registered: config-yaml\nnum_threads: 2\ndelegates:\n  - kind: gpu\n",
    );
    let cfg = RunnerConfig::load(file.path()).unwrap();
    assert_eq!(cfg.num_threads, Some(2));
    assert_eq!(cfg.delegates[0].kind(), DelegateKind::Gpu);
}

#[test]
fn load_json_by_extension() {
    let file = write_file(
        ".json",
        r#"{"model": {"path": "m.tflite"}, "delegates": [{"kind": "nnapi", "cache_dir": "/data/cache"}]}"#,
    );
    let cfg = RunnerConfig::load(file.path()).unwrap();
    assert_eq!(cfg.num_threads, None);
    assert_eq!(cfg.delegates[0].kind(), DelegateKind::NnApi);
}

#[test]
fn load_missing_file() {
    let err = RunnerConfig::load("/nonexistent/runner.yaml").unwrap_err();
    assert!(matches!(err, RunnerError::Config(_)));
}

#[test]
fn runner_from_config() {
    init_tracing();
    let bytes: &'static [u8] = Box::leak(two_input_model().to_bytes().into_boxed_slice());
    register_model("config-two-input", bytes);

    let cfg = RunnerConfig::from_yaml_str(
        r#"
model:
  registered: config-two-input
num_threads: 3
delegates:
  - kind: nnapi
  - kind: gpu
    precision_loss_allowed: true
"#,
    )
    .unwrap();

    let engine = MockEngine::new();
    let runner = ModelRunner::from_config(engine.clone(), &cfg).unwrap();
    assert!(runner.is_built());
    assert_eq!(runner.delegate_kinds(), vec![DelegateKind::NnApi, DelegateKind::Gpu]);
    assert_eq!(
        engine.events_with_prefix("create interpreter"),
        vec!["create interpreter threads=3 delegates=[NNAPI,GPU]"]
    );
}

#[test]
fn runner_from_config_from_file_path() {
    let model_file = write_file(".json", &String::from_utf8(two_input_model().to_bytes()).unwrap());
    let cfg = RunnerConfig::from_json_str(&format!(
        r#"{{"model": {{"path": {:?}}}}}"#,
        model_file.path().display().to_string()
    ))
    .unwrap();
    let runner = ModelRunner::from_config(MockEngine::new(), &cfg).unwrap();
    assert_eq!(runner.input_tensor_count(), 2);
}

#[test]
fn config_without_model_fails() {
    let cfg = RunnerConfig::default();
    let err = ModelRunner::from_config(MockEngine::new(), &cfg).err().unwrap();
    assert!(matches!(err, RunnerError::Config(_)));
}

#[test]
fn duplicate_delegates_in_config_fail() {
    let bytes: &'static [u8] = Box::leak(two_input_model().to_bytes().into_boxed_slice());
    register_model("config-duplicate", bytes);
    let cfg = RunnerConfig::from_yaml_str(
        "model:\n  registered: config-duplicate\ndelegates:\n  - kind: gpu\n  - kind: gpu\n",
    )
    .unwrap();
    let err = ModelRunner::from_config(MockEngine::new(), &cfg).err().unwrap();
    assert!(matches!(err, RunnerError::DuplicateDelegate(DelegateKind::Gpu)));
}

#[test]
fn unregistered_model_in_config_fails_before_delegates() {
    let cfg = RunnerConfig::from_yaml_str(
        "model:\n  registered: config-missing\ndelegates:\n  - kind: gpu\n",
    )
    .unwrap();
    let engine = MockEngine::new();
    let err = ModelRunner::from_config(engine.clone(), &cfg).err().unwrap();
    assert!(matches!(err, RunnerError::ModelLoad(_)));
    assert!(engine.events_with_prefix("create delegate").is_empty());
}
