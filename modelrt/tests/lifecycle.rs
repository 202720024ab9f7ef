mod common;

use std::io::Write;

use common::{built_runner, init_tracing, two_input_model};
use giztoy_modelrt::mock::MockEngine;
use giztoy_modelrt::{
    DelegateKind, GpuDelegateOptions, ModelRunner, ModelSource, NnApiDelegateOptions, RunnerError,
    register_model,
};

#[test]
fn valid_buffer_builds() {
    let (runner, _) = built_runner(&two_input_model());
    assert!(runner.is_built());
    assert_eq!(runner.input_tensor_count(), 2);
    assert_eq!(runner.output_tensor_count(), 1);
}

#[test]
fn zero_length_buffer_is_not_built() {
    init_tracing();
    let mut runner = ModelRunner::new(MockEngine::new());
    let err = runner.build_model_from_buffer(&[]).unwrap_err();
    assert!(matches!(err, RunnerError::ModelLoad(_)));
    assert!(!runner.is_built());

    let err = runner.build_interpreter().unwrap_err();
    assert!(matches!(err, RunnerError::InterpreterBuild(_)));
    assert!(!runner.is_built());
}

#[test]
fn malformed_buffer_is_not_built() {
    let mut runner = ModelRunner::new(MockEngine::new());
    assert!(matches!(
        runner.build_model_from_buffer(b"\x00\x01garbage").unwrap_err(),
        RunnerError::ModelLoad(_)
    ));
    assert!(runner.build_interpreter().is_err());
    assert!(!runner.is_built());
    assert_eq!(runner.input_tensor_count(), 0);
}

#[test]
fn failed_rebuild_leaves_runner_empty() {
    let (mut runner, _) = built_runner(&two_input_model());
    assert!(runner.build_model_from_buffer(b"junk").is_err());
    assert!(!runner.is_built());
    assert!(!runner.has_model());
}

#[test]
fn take_moves_everything() {
    let (mut a, _) = built_runner(&two_input_model());
    let b = a.take();
    assert!(!a.is_built());
    assert!(!a.has_model());
    assert!(b.is_built());
    assert_eq!(b.input_tensor_count(), 2);

    let mut empty = ModelRunner::new(MockEngine::new());
    let moved = empty.take();
    assert!(!moved.is_built());
    assert!(!empty.is_built());
}

#[test]
fn taken_source_can_be_rebuilt() {
    let model = two_input_model();
    let (mut a, _) = built_runner(&model);
    let _b = a.take();
    a.build_model_from_buffer(&model.to_bytes()).unwrap();
    a.build_interpreter().unwrap();
    assert!(a.is_built());
}

#[test]
fn drop_order_is_interpreter_options_model_delegates() {
    init_tracing();
    let engine = MockEngine::new();
    let mut runner = ModelRunner::new(engine.clone());
    runner.build_model_from_buffer(&two_input_model().to_bytes()).unwrap();
    runner.attach_delegate(GpuDelegateOptions::default()).unwrap();
    runner.attach_delegate(NnApiDelegateOptions::default()).unwrap();
    runner.build_interpreter().unwrap();

    engine.clear_events();
    drop(runner);
    assert_eq!(
        engine.events_with_prefix("drop"),
        vec![
            "drop interpreter",
            "drop options",
            "drop model",
            "drop delegate GPU",
            "drop delegate NNAPI",
        ]
    );
}

#[test]
fn assigning_over_live_runner_releases_it() {
    let (mut runner, engine) = built_runner(&two_input_model());
    engine.clear_events();
    runner = ModelRunner::new(engine.clone());
    assert!(!runner.is_built());
    assert_eq!(
        engine.events_with_prefix("drop"),
        vec!["drop interpreter", "drop options", "drop model"]
    );
}

#[test]
fn rebuild_releases_before_acquiring() {
    let model = two_input_model();
    let (mut runner, engine) = built_runner(&model);
    engine.clear_events();
    runner.build_model_from_buffer(&model.to_bytes()).unwrap();
    let events = engine.events();
    assert_eq!(
        &events[..4],
        &["drop interpreter", "drop options", "drop model", "create model"]
    );
    assert!(!runner.is_built());
    assert!(runner.has_model());
}

#[test]
fn gpu_delegate_skips_allocation() {
    init_tracing();
    let engine = MockEngine::new();
    let mut runner = ModelRunner::new(engine.clone());
    runner.build_model_from_buffer(&two_input_model().to_bytes()).unwrap();
    runner.attach_delegate(GpuDelegateOptions::default()).unwrap();
    // The mock fails allocate_tensors when a delegate already allocated.
    runner.build_interpreter().unwrap();
    assert!(runner.is_built());
    let events = engine.events();
    assert!(events.contains(&"allocate by delegate".to_string()));
    assert!(!events.contains(&"allocate".to_string()));
}

#[test]
fn nnapi_delegate_allocates_explicitly() {
    init_tracing();
    let engine = MockEngine::new();
    let mut runner = ModelRunner::new(engine.clone());
    runner.build_model_from_buffer(&two_input_model().to_bytes()).unwrap();
    runner.attach_delegate(NnApiDelegateOptions::default()).unwrap();
    runner.build_interpreter().unwrap();
    assert!(engine.events().contains(&"allocate".to_string()));
}

#[test]
fn duplicate_delegate_kind_is_rejected() {
    let mut runner = ModelRunner::new(MockEngine::new());
    runner.build_model_from_buffer(&two_input_model().to_bytes()).unwrap();
    runner.attach_delegate(GpuDelegateOptions::default()).unwrap();
    let err = runner.attach_delegate(GpuDelegateOptions::default()).unwrap_err();
    assert!(matches!(err, RunnerError::DuplicateDelegate(DelegateKind::Gpu)));
    assert_eq!(runner.delegate_kinds(), vec![DelegateKind::Gpu]);
}

#[test]
fn unavailable_delegate_fails_to_attach() {
    let mut runner = ModelRunner::new(MockEngine::new().without_delegate(DelegateKind::Gpu));
    runner.build_model_from_buffer(&two_input_model().to_bytes()).unwrap();
    let err = runner.attach_delegate(GpuDelegateOptions::default()).unwrap_err();
    assert!(matches!(err, RunnerError::Delegate(_)));
    assert!(runner.delegate_kinds().is_empty());
    runner.attach_delegate(NnApiDelegateOptions::default()).unwrap();
}

#[test]
fn settings_need_a_model() {
    let mut runner = ModelRunner::new(MockEngine::new());
    assert!(matches!(runner.set_num_threads(2).unwrap_err(), RunnerError::NoModel));
    assert!(matches!(
        runner.attach_delegate(GpuDelegateOptions::default()).unwrap_err(),
        RunnerError::NoModel
    ));
    assert_eq!(runner.num_threads(), None);
    assert!(runner.delegate_kinds().is_empty());
}

#[test]
fn model_rebuild_starts_from_default_options() {
    init_tracing();
    let model = two_input_model();
    let engine = MockEngine::new();
    let mut runner = ModelRunner::new(engine.clone());
    runner.build_model_from_buffer(&model.to_bytes()).unwrap();
    runner.set_num_threads(4).unwrap();
    runner.attach_delegate(NnApiDelegateOptions::default()).unwrap();
    runner.build_interpreter().unwrap();

    engine.clear_events();
    runner.build_model_from_buffer(&model.to_bytes()).unwrap();
    assert_eq!(
        engine.events_with_prefix("drop"),
        vec!["drop interpreter", "drop options", "drop model", "drop delegate NNAPI"]
    );
    assert_eq!(runner.num_threads(), None);
    assert!(runner.delegate_kinds().is_empty());
    assert_eq!(runner.summarize_options(), "Num Threads: default\nDelegates: 0\n");

    runner.build_interpreter().unwrap();
    assert_eq!(
        engine.events_with_prefix("create interpreter"),
        vec!["create interpreter threads=-1 delegates=[]"]
    );
}

#[test]
fn failed_build_gets_fresh_delegates_next_time() {
    let mut model = two_input_model();
    model.fail_build = true;
    let engine = MockEngine::new();
    let mut runner = ModelRunner::new(engine.clone());
    runner.build_model_from_buffer(&model.to_bytes()).unwrap();
    runner.attach_delegate(NnApiDelegateOptions::default()).unwrap();
    assert!(runner.build_interpreter().is_err());

    engine.clear_events();
    assert!(runner.build_interpreter().is_err());
    assert!(!runner.is_built());
    assert_eq!(
        engine.events_with_prefix("create"),
        vec!["create delegate NNAPI", "create options"]
    );
    assert_eq!(
        engine.events_with_prefix("drop"),
        vec!["drop options", "drop delegate NNAPI"]
    );
}

#[test]
fn failed_options_reset_is_retried() {
    let (mut runner, engine) = built_runner(&two_input_model());
    runner.attach_delegate(NnApiDelegateOptions::default()).unwrap();

    engine.set_delegate_available(DelegateKind::NnApi, false);
    let err = runner.build_interpreter().unwrap_err();
    assert!(matches!(err, RunnerError::Delegate(_)));
    assert!(runner.has_model());
    assert!(!runner.is_built());

    engine.set_delegate_available(DelegateKind::NnApi, true);
    engine.clear_events();
    runner.build_interpreter().unwrap();
    assert_eq!(
        engine.events_with_prefix("create interpreter"),
        vec!["create interpreter threads=-1 delegates=[NNAPI]"]
    );
}

#[test]
fn non_positive_threads_mean_default() {
    let model = two_input_model();
    let engine = MockEngine::new();
    let mut runner = ModelRunner::new(engine.clone());
    runner.build_model_from_buffer(&model.to_bytes()).unwrap();
    runner.set_num_threads(0).unwrap();
    assert_eq!(runner.num_threads(), None);
    runner.build_interpreter().unwrap();
    assert_eq!(
        engine.events_with_prefix("create interpreter"),
        vec!["create interpreter threads=-1 delegates=[]"]
    );
}

#[test]
fn threads_set_after_build_apply_to_next_build() {
    let (mut runner, engine) = built_runner(&two_input_model());
    runner.set_num_threads(3).unwrap();
    runner.build_interpreter().unwrap();
    let created = engine.events_with_prefix("create interpreter");
    assert_eq!(created.last().unwrap(), "create interpreter threads=3 delegates=[]");
}

#[test]
fn engine_rejecting_model_leaves_not_built() {
    let mut model = two_input_model();
    model.fail_build = true;
    let mut runner = ModelRunner::new(MockEngine::new());
    runner.build_model_from_buffer(&model.to_bytes()).unwrap();
    let err = runner.build_interpreter().unwrap_err();
    assert!(matches!(err, RunnerError::InterpreterBuild(_)));
    assert!(!runner.is_built());
}

#[test]
fn build_from_file() {
    let model = two_input_model();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&model.to_bytes()).unwrap();

    let mut runner = ModelRunner::new(MockEngine::new());
    runner.build_model_from_file(file.path()).unwrap();
    runner.build_interpreter().unwrap();
    assert!(runner.is_built());

    let err = runner.build_model_from_file("/nonexistent/model.json").unwrap_err();
    assert!(matches!(err, RunnerError::ModelLoad(_)));
    assert!(!runner.is_built());
}

#[test]
fn build_from_registry() {
    let bytes: &'static [u8] = Box::leak(two_input_model().to_bytes().into_boxed_slice());
    register_model("lifecycle-two-input", bytes);

    let mut runner = ModelRunner::new(MockEngine::new());
    runner
        .build_model(ModelSource::Registered("lifecycle-two-input"))
        .unwrap();
    runner.build_interpreter().unwrap();
    assert_eq!(runner.input_tensor_count(), 2);

    let err = runner
        .build_model(ModelSource::Registered("lifecycle-missing"))
        .unwrap_err();
    assert!(matches!(err, RunnerError::ModelLoad(_)));
}

#[test]
fn reset_clears_settings() {
    let (mut runner, _) = built_runner(&two_input_model());
    runner.set_num_threads(4).unwrap();
    runner.attach_delegate(GpuDelegateOptions::default()).unwrap();
    runner.reset();
    assert!(!runner.is_built());
    assert!(!runner.has_model());
    assert_eq!(runner.num_threads(), None);
    assert!(runner.delegate_kinds().is_empty());
}

#[test]
fn default_runner_is_empty() {
    let runner: ModelRunner<MockEngine> = ModelRunner::default();
    assert!(!runner.is_built());
    assert_eq!(runner.output_tensor_count(), 0);
    assert!(runner.input_tensor(0).is_none());
}
