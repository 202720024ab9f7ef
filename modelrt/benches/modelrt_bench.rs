use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use giztoy_modelrt::mock::{MockEngine, MockModel, MockTensor};
use giztoy_modelrt::{ElementType, GpuDelegateOptions, ModelRunner, NnApiDelegateOptions};

fn runner_for(elements: i32) -> ModelRunner<MockEngine> {
    let model = MockModel::new(
        vec![MockTensor::new("in0", ElementType::Float32, &[1, elements])],
        vec![MockTensor::new("out0", ElementType::Float32, &[1, elements])],
    );
    let mut runner = ModelRunner::new(MockEngine::new());
    runner.build_model_from_buffer(&model.to_bytes()).unwrap();
    runner.build_interpreter().unwrap();
    runner
}

fn bench_bind_invoke_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("modelrt_bind_invoke_read");
    for elements in [64, 4096, 65536] {
        let mut runner = runner_for(elements);
        let input: Vec<f32> = (0..elements).map(|i| (i % 100) as f32 * 0.01).collect();
        group.bench_with_input(BenchmarkId::from_parameter(elements), &input, |b, input| {
            b.iter(|| {
                runner.set_input(black_box(input.as_slice())).unwrap();
                runner.invoke().unwrap();
                let out: Vec<f32> = runner.output(0).unwrap();
                black_box(out);
                runner.engine().clear_events();
            });
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let model = MockModel::new(
        vec![MockTensor::new("in0", ElementType::Float32, &[1, 80, 300])],
        vec![MockTensor::new("out0", ElementType::Float32, &[1, 512])],
    )
    .to_bytes();
    c.bench_function("modelrt_build", |b| {
        b.iter(|| {
            let mut runner = ModelRunner::new(MockEngine::new());
            runner.build_model_from_buffer(black_box(&model)).unwrap();
            runner.build_interpreter().unwrap();
            black_box(runner.is_built());
        });
    });
}

fn bench_summary(c: &mut Criterion) {
    let mut runner = runner_for(256);
    runner.attach_delegate(GpuDelegateOptions::default()).unwrap();
    runner.attach_delegate(NnApiDelegateOptions::default()).unwrap();
    c.bench_function("modelrt_summary", |b| {
        b.iter(|| black_box(runner.summary()));
    });
    c.bench_function("modelrt_summarize_options", |b| {
        b.iter(|| black_box(runner.summarize_options()));
    });
}

criterion_group!(benches, bench_bind_invoke_read, bench_build, bench_summary);
criterion_main!(benches);
