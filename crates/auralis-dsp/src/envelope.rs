//! Exponential attack/release envelope follower.
//!
//! Ported from the teacher's `envelope.rs`, with `set_times` added so a
//! stage can retarget attack/release when `MasteringTarget` changes without
//! reallocating the follower (which would lose its current envelope value
//! and reintroduce exactly the discontinuity §4.5 forbids).

#[derive(Debug, Clone, Copy)]
pub struct EnvelopeFollower {
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
}

impl EnvelopeFollower {
    pub fn new(sample_rate: u32, attack_ms: f32, release_ms: f32) -> Self {
        Self {
            attack_coeff: ms_to_coefficient(attack_ms, sample_rate),
            release_coeff: ms_to_coefficient(release_ms, sample_rate),
            envelope: 0.0,
        }
    }

    pub fn set_times(&mut self, sample_rate: u32, attack_ms: f32, release_ms: f32) {
        self.attack_coeff = ms_to_coefficient(attack_ms, sample_rate);
        self.release_coeff = ms_to_coefficient(release_ms, sample_rate);
    }

    #[inline]
    pub fn process(&mut self, input_level: f32) -> f32 {
        let coeff = if input_level > self.envelope { self.attack_coeff } else { self.release_coeff };
        self.envelope = input_level + (self.envelope - input_level) * coeff;
        self.envelope
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    pub fn value(&self) -> f32 {
        self.envelope
    }
}

fn ms_to_coefficient(time_ms: f32, sample_rate: u32) -> f32 {
    let time_samples = (time_ms.max(0.01) * 0.001 * sample_rate.max(1) as f32).max(1.0);
    (-1.0 / time_samples).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let follower = EnvelopeFollower::new(44100, 10.0, 100.0);
        assert_eq!(follower.value(), 0.0);
    }

    #[test]
    fn rising_input_climbs_faster_than_it_falls() {
        let mut follower = EnvelopeFollower::new(44100, 1.0, 50.0);
        let risen = follower.process(1.0);
        assert!(risen > 0.0 && risen < 1.0);
        let fallen = follower.process(0.0);
        assert!(fallen > 0.0 && fallen < risen);
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut follower = EnvelopeFollower::new(44100, 5.0, 50.0);
        follower.process(1.0);
        follower.reset();
        assert_eq!(follower.value(), 0.0);
    }
}
