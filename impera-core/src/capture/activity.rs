//! Edge-triggered voice-activity gate.
//!
//! ## Algorithm
//!
//! 1. Compute RMS of the drained sample block.
//! 2. RMS ≥ `threshold` → speaking; hangover counter refilled.
//! 3. RMS < `threshold` with hangover remaining → still speaking,
//!    counter decremented (keeps syllable tails from flickering the gate).
//! 4. Otherwise → silent.
//!
//! Unlike a per-frame classifier, the gate only reports *changes*: capture
//! sources forward the returned edges as voice-activity events.

/// RMS threshold + hangover gate producing speaking/silent edges.
#[derive(Debug, Clone)]
pub struct ActivityGate {
    /// RMS amplitude above which a block counts as speech.
    /// Typical range: 0.01–0.05 for a quiet microphone.
    threshold: f32,
    /// Below-threshold blocks to keep reporting speech after it ends.
    hangover_blocks: u32,
    /// Current hangover countdown.
    hangover_left: u32,
    /// Last reported speaking state.
    active: bool,
}

impl ActivityGate {
    pub fn new(threshold: f32, hangover_blocks: u32) -> Self {
        Self {
            threshold,
            hangover_blocks,
            hangover_left: 0,
            active: false,
        }
    }

    /// Feed one drained sample block. Returns `Some(speaking)` when the
    /// speaking state flips, `None` while it is unchanged.
    pub fn update(&mut self, samples: &[f32]) -> Option<bool> {
        let speaking = if Self::rms(samples) >= self.threshold {
            self.hangover_left = self.hangover_blocks;
            true
        } else if self.hangover_left > 0 {
            self.hangover_left -= 1;
            true
        } else {
            false
        };

        if speaking != self.active {
            self.active = speaking;
            Some(speaking)
        } else {
            None
        }
    }

    /// Last reported speaking state.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn reset(&mut self) {
        self.hangover_left = 0;
        self.active = false;
    }

    fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }
}

impl Default for ActivityGate {
    fn default() -> Self {
        Self::new(0.02, 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const LOUD: [f32; 160] = [0.5; 160];
    const QUIET: [f32; 160] = [0.0; 160];

    #[test]
    fn reports_edges_not_levels() {
        let mut gate = ActivityGate::new(0.02, 0);

        assert_eq!(gate.update(&LOUD), Some(true));
        // Still speaking — no new edge.
        assert_eq!(gate.update(&LOUD), None);
        assert_eq!(gate.update(&QUIET), Some(false));
        assert_eq!(gate.update(&QUIET), None);
    }

    #[test]
    fn hangover_delays_the_falling_edge() {
        let mut gate = ActivityGate::new(0.02, 3);

        assert_eq!(gate.update(&LOUD), Some(true));
        // Three silent blocks are absorbed by the hangover.
        assert_eq!(gate.update(&QUIET), None);
        assert_eq!(gate.update(&QUIET), None);
        assert_eq!(gate.update(&QUIET), None);
        // Fourth silent block: hangover exhausted, edge fires.
        assert_eq!(gate.update(&QUIET), Some(false));
    }

    #[test]
    fn loud_block_refills_hangover() {
        let mut gate = ActivityGate::new(0.02, 2);

        gate.update(&LOUD);
        gate.update(&QUIET);
        gate.update(&LOUD);
        // Counter was refilled, so two more silent blocks stay speaking.
        assert_eq!(gate.update(&QUIET), None);
        assert_eq!(gate.update(&QUIET), None);
        assert_eq!(gate.update(&QUIET), Some(false));
    }

    #[test]
    fn reset_clears_state_without_emitting() {
        let mut gate = ActivityGate::new(0.02, 5);
        gate.update(&LOUD);
        assert!(gate.is_active());

        gate.reset();
        assert!(!gate.is_active());
        // Next silent block produces no falling edge — we are already silent.
        assert_eq!(gate.update(&QUIET), None);
    }

    #[test]
    fn empty_block_counts_as_silence() {
        let mut gate = ActivityGate::default();
        assert_eq!(gate.update(&[]), None);
        assert!(!gate.is_active());
    }

    #[test]
    fn rms_of_square_wave() {
        // A square wave at ±0.5 has RMS 0.5.
        let samples: Vec<f32> = (0..256)
            .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        assert_abs_diff_eq!(ActivityGate::rms(&samples), 0.5, epsilon = 1e-5);
    }
}
