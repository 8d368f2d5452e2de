//! Translation latency, cold and cached.
//!
//! 1. Front end: parse + bind of a kernel body
//! 2. Rewrite of a recovered body
//! 3. Full pipeline against a recovered body
//! 4. Cached lookup through `translate`

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use kernelc::extract::decompile;
use kernelc::rewrite::rewrite;
use kernelc::{
    kernel_source, translate, translate_with, Capture, FieldDecl, HlslTypeTable, Kernel, KernelId,
    KernelSource,
};

struct Blur {
    radius: u32,
    weights: Vec<f32>,
    input: Vec<[f32; 4]>,
    output: Vec<[f32; 4]>,
}

impl Kernel for Blur {
    fn source() -> KernelSource {
        kernel_source!(|ids: ThreadIds| {
            let mut acc = Float4::splat(0.0);
            for i in 0..radius {
                let w = weights[i];
                acc += input[ids.x + i] * w;
                if w < 0.001 {
                    break;
                }
            }
            output[ids.x] = Hlsl::saturate(acc);
        })
    }

    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::instance("radius", "u32"),
            FieldDecl::instance("weights", "ReadOnlyBuffer<f32>"),
            FieldDecl::instance("input", "ReadOnlyBuffer<Float4>"),
            FieldDecl::instance("output", "ReadWriteBuffer<Float4>"),
        ]
    }

    fn capture(&self, field: usize) -> Capture<'_> {
        match field {
            0 => Capture::pod(&self.radius),
            1 => Capture::resource(&self.weights),
            2 => Capture::resource(&self.input),
            _ => Capture::resource(&self.output),
        }
    }
}

fn bench_front_end(c: &mut Criterion) {
    let source = Blur::source().text;
    c.bench_function("decompile", |b| {
        b.iter(|| {
            decompile(
                KernelId::of::<Blur>(),
                black_box(source),
                Blur::fields(),
                Vec::new(),
            )
        })
    });
}

fn bench_rewrite(c: &mut Criterion) {
    let body = decompile(KernelId::of::<Blur>(), Blur::source().text, Blur::fields(), Vec::new())
        .expect("benchmark kernel must decompile");
    c.bench_function("rewrite", |b| b.iter(|| rewrite(black_box(&body), &HlslTypeTable)));
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");
    group.bench_function("uncached", |b| {
        b.iter(|| translate_with::<Blur>(black_box(&HlslTypeTable)))
    });
    group.bench_function("cached", |b| b.iter(translate::<Blur>));
    group.finish();
}

criterion_group!(benches, bench_front_end, bench_rewrite, bench_pipeline);
criterion_main!(benches);
