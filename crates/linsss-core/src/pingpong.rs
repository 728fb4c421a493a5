//! Ping-pong bookkeeping for the temporally accumulated translucent
//! shadow map.
//!
//! The stochastic transmittance estimate is only meaningful while the view
//! holds still, so the accumulation restarts whenever the camera or any
//! view-dependent parameter changes.

/// Resolution divisor of the TSM targets relative to the swapchain.
pub const TSM_DOWNSAMPLE: u32 = 4;

/// CPU-side state for the two-buffer accumulation scheme.
#[derive(Debug, Clone, Default)]
pub struct TsmState {
    frame: u64,
    accumulated: u32,
}

impl TsmState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the buffer written this frame.
    pub fn write_index(&self) -> usize {
        (self.frame % 2) as usize
    }

    /// Index of the buffer holding the previous frame's running average.
    pub fn read_index(&self) -> usize {
        1 - self.write_index()
    }

    /// Number of frames blended into the running average so far.
    pub fn accumulated_frames(&self) -> u32 {
        self.accumulated
    }

    /// Per-frame RNG seed for the stochastic estimator.
    #[allow(clippy::cast_precision_loss)]
    pub fn seed(&self) -> f32 {
        self.frame as f32
    }

    /// Advances to the next frame after a successful accumulation step.
    pub fn advance(&mut self) {
        self.frame += 1;
        self.accumulated = self.accumulated.saturating_add(1);
    }

    /// Restarts accumulation; both buffers must be cleared by the caller.
    pub fn reset(&mut self) {
        self.accumulated = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_alternate_and_never_collide() {
        let mut state = TsmState::new();
        let mut last_write = None;
        for _ in 0..16 {
            let (w, r) = (state.write_index(), state.read_index());
            assert_ne!(w, r);
            assert!(w < 2 && r < 2);
            if let Some(prev) = last_write {
                assert_ne!(w, prev, "write index must alternate every frame");
            }
            last_write = Some(w);
            state.advance();
        }
    }

    #[test]
    fn test_write_index_is_frame_parity() {
        let mut state = TsmState::new();
        assert_eq!(state.write_index(), 0);
        state.advance();
        assert_eq!(state.write_index(), 1);
        state.advance();
        assert_eq!(state.write_index(), 0);
    }

    #[test]
    fn test_reset_clears_accumulation_not_parity() {
        let mut state = TsmState::new();
        for _ in 0..5 {
            state.advance();
        }
        assert_eq!(state.accumulated_frames(), 5);
        let parity = state.write_index();
        state.reset();
        assert_eq!(state.accumulated_frames(), 0);
        assert_eq!(state.write_index(), parity);
    }

    #[test]
    fn test_seed_tracks_frame() {
        let mut state = TsmState::new();
        assert_eq!(state.seed(), 0.0);
        state.advance();
        state.advance();
        assert_eq!(state.seed(), 2.0);
    }
}
