use auralis_pcm::AudioBlock;

/// Downmix a stereo block to mono by averaging channels.
pub fn to_mono(block: &AudioBlock) -> Vec<f32> {
    block.frames().iter().map(|(l, r)| (l + r) * 0.5).collect()
}

pub fn left_channel(block: &AudioBlock) -> Vec<f32> {
    block.frames().iter().map(|(l, _)| *l).collect()
}

pub fn right_channel(block: &AudioBlock) -> Vec<f32> {
    block.frames().iter().map(|(_, r)| *r).collect()
}

pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

pub fn peak(signal: &[f32]) -> f32 {
    signal.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

pub fn std_dev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean: f32 = values.iter().sum::<f32>() / values.len() as f32;
    let variance: f32 = values.iter().map(|&v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32;
    variance.sqrt()
}

/// Divide a signal into fixed-duration frames and apply a per-frame metric.
pub fn frame_analysis<F>(signal: &[f32], sample_rate: u32, frame_duration_s: f32, mut metric: F) -> Vec<f32>
where
    F: FnMut(&[f32]) -> f32,
{
    let frame_size = ((frame_duration_s * sample_rate as f32) as usize).max(1);
    signal.chunks(frame_size).map(|c| metric(c)).collect()
}
