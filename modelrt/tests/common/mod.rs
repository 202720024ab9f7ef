#![allow(dead_code)]

use giztoy_modelrt::mock::{MockEngine, MockModel, MockTensor};
use giztoy_modelrt::{ElementType, ModelRunner};

/// Installs a test subscriber once; `RUST_LOG=giztoy_modelrt=trace` shows
/// the runner's lifecycle events.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Two inputs (12 and 8 bytes) and one FLOAT32 output of 5 elements.
pub fn two_input_model() -> MockModel {
    MockModel::new(
        vec![
            MockTensor::new("features", ElementType::Float32, &[1, 3]),
            MockTensor::new("mask", ElementType::Int32, &[2]),
        ],
        vec![MockTensor::new("scores", ElementType::Float32, &[5])],
    )
}

/// Returns a built runner for `model` and a handle to the engine journal.
pub fn built_runner(model: &MockModel) -> (ModelRunner<MockEngine>, MockEngine) {
    init_tracing();
    let engine = MockEngine::new();
    let mut runner = ModelRunner::new(engine.clone());
    runner.build_model_from_buffer(&model.to_bytes()).unwrap();
    runner.build_interpreter().unwrap();
    (runner, engine)
}
