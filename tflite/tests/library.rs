//! Tests against a real TensorFlow Lite C library.
//! Run with: TFLITE_LIB=/path/to/libtensorflowlite_c.so TFLITE_TEST_MODEL=model.tflite \
//!     cargo test -p giztoy-tflite --test library -- --ignored

use giztoy_tflite::{Interpreter, InterpreterOptions, Library, Model, TfliteError};

fn test_model() -> Option<Vec<u8>> {
    let path = std::env::var("TFLITE_TEST_MODEL").ok()?;
    std::fs::read(path).ok()
}

#[test]
fn empty_buffer_is_rejected() {
    // Skipped when the library is not installed.
    let Ok(lib) = Library::load_default() else {
        return;
    };
    assert!(matches!(Model::from_buffer(&lib, &[]), Err(TfliteError::EmptyData)));
}

#[test]
#[ignore]
fn version_is_reported() {
    let lib = Library::load_default().expect("TFLITE_LIB required");
    assert!(!lib.version().is_empty());
    assert_eq!(lib.type_name(1), "FLOAT32");
}

#[test]
#[ignore]
fn invoke_model_from_buffer() {
    let lib = Library::load_default().expect("TFLITE_LIB required");
    let data = test_model().expect("TFLITE_TEST_MODEL required");

    let model = Model::from_buffer(&lib, &data).unwrap();
    drop(data);
    let mut opts = InterpreterOptions::new(&lib).unwrap();
    opts.set_num_threads(1);

    let mut interp = Interpreter::new(&model, Some(&opts)).unwrap();
    interp.allocate_tensors().unwrap();
    assert!(interp.input_count() > 0);
    assert!(interp.input_tensor(interp.input_count()).is_none());

    for i in 0..interp.input_count() {
        let size = interp.input_tensor(i).unwrap().byte_size();
        interp.copy_to_input(i, &vec![0u8; size]).unwrap();
    }
    interp.invoke().unwrap();

    let out = interp.output_tensor(0).unwrap();
    let mut buf = vec![0u8; out.byte_size()];
    out.copy_to_buffer(&mut buf).unwrap();
    assert_eq!(buf, out.data());
}

#[test]
#[ignore]
fn copy_to_input_checks_size() {
    let lib = Library::load_default().expect("TFLITE_LIB required");
    let data = test_model().expect("TFLITE_TEST_MODEL required");
    let model = Model::from_buffer(&lib, &data).unwrap();
    let mut interp = Interpreter::new(&model, None).unwrap();
    interp.allocate_tensors().unwrap();

    let size = interp.input_tensor(0).unwrap().byte_size();
    let err = interp.copy_to_input(0, &vec![0u8; size + 1]).unwrap_err();
    assert!(matches!(err, TfliteError::SizeMismatch { .. }));
}
