//! Latency benchmarks for preprocessing and inference
//!
//! Networks use zero weights: inference cost depends on layer sizes only.
//!
//! Run with: cargo bench -p fashionlens-classifiers

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fashionlens_classifiers::{
    Classifier, ClassificationCascade, CnnArchitecture, CnnClassifier, ImagePreprocessor,
    ImageTensor, InputSize, LabeledClassifier, ModelRegistry,
};
use fashionlens_core::{Category, CategoryMap, ClassLabels};
use image::{DynamicImage, ImageBuffer, Rgb};
use std::sync::Arc;

fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

fn zero_cnn(name: &str, classes: usize) -> Arc<dyn Classifier> {
    let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
    Arc::new(
        CnnClassifier::new(name, &CnnArchitecture::default(), InputSize::default(), classes, vb)
            .expect("Failed to build classifier"),
    )
}

fn labels(count: usize) -> ClassLabels {
    ClassLabels::new((0..count).map(|i| format!("label-{}", i)).collect()).unwrap()
}

/// Benchmark decode-free preprocessing at typical upload sizes
fn benchmark_preprocessing(c: &mut Criterion) {
    let preprocessor = ImagePreprocessor::default();

    let mut group = c.benchmark_group("Preprocessing");
    group.sample_size(50);

    for (width, height) in [(60, 60), (640, 480), (1080, 1440)] {
        let image = photo(width, height);
        let id = format!("{}x{}", width, height);
        group.bench_with_input(BenchmarkId::new("preprocess_image", id), &image, |b, image| {
            b.iter(|| preprocessor.preprocess_image(black_box(image)))
        });
    }

    group.finish();
}

/// Benchmark a single forward pass of the default network
fn benchmark_inference(c: &mut Criterion) {
    let tensor = ImageTensor::zeros(60, 60);

    let mut group = c.benchmark_group("Inference");
    group.sample_size(100);

    for classes in [3, 50, 500] {
        let model = zero_cnn("bench", classes);
        group.bench_with_input(BenchmarkId::new("predict", classes), &tensor, |b, tensor| {
            b.iter(|| model.predict(black_box(tensor)).unwrap())
        });
    }

    group.finish();
}

/// Full cascade on a preprocessed tensor
fn benchmark_cascade(c: &mut Criterion) {
    let decider = LabeledClassifier::new(
        zero_cnn("decider", 3),
        ClassLabels::new(Category::ALL.to_vec()).unwrap(),
    )
    .unwrap();
    let brands = CategoryMap::from_fn(|c| {
        LabeledClassifier::new(zero_cnn(c.as_str(), 100), labels(100)).unwrap()
    });
    let subtypes = CategoryMap::from_fn(|c| {
        Some(LabeledClassifier::new(zero_cnn(c.as_str(), 20), labels(20)).unwrap())
    });

    let two_stage = ClassificationCascade::new(
        ModelRegistry::new(decider, brands, CategoryMap::default()),
        ImagePreprocessor::default(),
    );

    let decider = LabeledClassifier::new(
        zero_cnn("decider", 3),
        ClassLabels::new(Category::ALL.to_vec()).unwrap(),
    )
    .unwrap();
    let brands = CategoryMap::from_fn(|c| {
        LabeledClassifier::new(zero_cnn(c.as_str(), 100), labels(100)).unwrap()
    });
    let three_stage = ClassificationCascade::new(
        ModelRegistry::new(decider, brands, subtypes),
        ImagePreprocessor::default(),
    );

    let tensor = ImageTensor::zeros(60, 60);

    let mut group = c.benchmark_group("Cascade");
    group.sample_size(50);

    group.bench_function("two_stage", |b| {
        b.iter(|| two_stage.classify_tensor(black_box(&tensor)).unwrap())
    });

    group.bench_function("three_stage", |b| {
        b.iter(|| three_stage.classify_tensor(black_box(&tensor)).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_preprocessing,
    benchmark_inference,
    benchmark_cascade
);
criterion_main!(benches);
