//! Stereo image (2D): interchannel correlation, stereo width.
//!
//! Ported from the teacher's `stereo_analysis.rs`: mid/side decomposition
//! and Pearson correlation between left and right channels.

/// Pearson correlation between L and R, clipped to `[-1, 1]` per spec §4.2
/// (1 = mono/identical, -1 = fully phase-inverted, 0 = decorrelated).
pub fn interchannel_correlation(left: &[f32], right: &[f32]) -> f32 {
    if left.is_empty() || right.is_empty() || left.len() != right.len() {
        return 1.0;
    }
    let n = left.len() as f32;
    let mean_l: f32 = left.iter().sum::<f32>() / n;
    let mean_r: f32 = right.iter().sum::<f32>() / n;

    let mut cov = 0.0f32;
    let mut var_l = 0.0f32;
    let mut var_r = 0.0f32;
    for (&l, &r) in left.iter().zip(right.iter()) {
        let dl = l - mean_l;
        let dr = r - mean_r;
        cov += dl * dr;
        var_l += dl * dl;
        var_r += dr * dr;
    }

    if var_l < 1e-12 || var_r < 1e-12 {
        return 1.0;
    }
    (cov / (var_l.sqrt() * var_r.sqrt())).clamp(-1.0, 1.0)
}

/// Ratio of side-signal energy to mid-signal energy, normalized against
/// a 1:1 ratio as a wide upper bound.
pub fn stereo_width(left: &[f32], right: &[f32]) -> f32 {
    if left.is_empty() || right.is_empty() || left.len() != right.len() {
        return 0.0;
    }
    let mut mid_energy = 0.0f32;
    let mut side_energy = 0.0f32;
    for (&l, &r) in left.iter().zip(right.iter()) {
        let mid = (l + r) * 0.5;
        let side = (l - r) * 0.5;
        mid_energy += mid * mid;
        side_energy += side * side;
    }
    if mid_energy < 1e-12 {
        return if side_energy > 1e-12 { 1.0 } else { 0.0 };
    }
    (side_energy / mid_energy).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_channels_are_mono() {
        let signal: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.1).sin()).collect();
        assert!(interchannel_correlation(&signal, &signal) > 0.95);
        assert!(stereo_width(&signal, &signal) < 0.05);
    }

    #[test]
    fn inverted_channels_are_phase_inverted() {
        let signal: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.1).sin()).collect();
        let inverted: Vec<f32> = signal.iter().map(|s| -s).collect();
        assert!(interchannel_correlation(&signal, &inverted) < -0.9);
        assert!(stereo_width(&signal, &inverted) > 0.9);
    }

    #[test]
    fn mismatched_lengths_fall_back_to_mono() {
        assert_eq!(interchannel_correlation(&[0.1, 0.2], &[0.1]), 1.0);
    }
}
