//! Per-block throughput of the hot DSP stages, at the chunk sizes the
//! streaming engine actually pushes through them (spec §4.5's ≤2 ms
//! group-delay budget implies these need to run well inside real time).

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use auralis_dsp::{
    AdaptiveCompressor, AdaptiveLimiter, CriticalBandEq, DspStage, MasteringTarget, SoftSaturator,
};
use auralis_pcm::AudioBlock;

const SAMPLE_RATE: u32 = 44_100;

fn sine_block(frame_count: usize) -> AudioBlock {
    let frames: Vec<(f32, f32)> = (0..frame_count)
        .map(|i| {
            let s = (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SAMPLE_RATE as f32).sin() * 0.5;
            (s, s)
        })
        .collect();
    AudioBlock::new(frames, SAMPLE_RATE, 0)
}

fn bench_eq(c: &mut Criterion) {
    let block = sine_block(SAMPLE_RATE as usize);
    let target = MasteringTarget::pass_through();
    let mut eq = CriticalBandEq::new(SAMPLE_RATE);
    c.bench_function("critical_band_eq_1s_block", |b| {
        b.iter(|| black_box(eq.process(black_box(&block), &target)));
    });
}

fn bench_compressor(c: &mut Criterion) {
    let block = sine_block(SAMPLE_RATE as usize);
    let target = MasteringTarget::pass_through();
    let mut compressor = AdaptiveCompressor::new(SAMPLE_RATE, 5.0);
    c.bench_function("adaptive_compressor_1s_block", |b| {
        b.iter(|| black_box(compressor.process(black_box(&block), &target)));
    });
}

fn bench_limiter(c: &mut Criterion) {
    let block = sine_block(SAMPLE_RATE as usize);
    let target = MasteringTarget::pass_through();
    let mut limiter = AdaptiveLimiter::new(SAMPLE_RATE, 2.0, 4);
    c.bench_function("adaptive_limiter_1s_block", |b| {
        b.iter(|| black_box(limiter.process(black_box(&block), &target)));
    });
}

fn bench_saturator(c: &mut Criterion) {
    let block = sine_block(SAMPLE_RATE as usize);
    let target = MasteringTarget::pass_through();
    let mut saturator = SoftSaturator;
    c.bench_function("soft_saturator_1s_block", |b| {
        b.iter(|| black_box(saturator.process(black_box(&block), &target)));
    });
}

criterion_group!(stages, bench_eq, bench_compressor, bench_limiter, bench_saturator);
criterion_main!(stages);
