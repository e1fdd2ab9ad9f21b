/// Converts normalized f32 samples to 16-bit PCM with clamping.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| {
            let clamped = s.clamp(-1.0, 1.0);
            (clamped * i16::MAX as f32) as i16
        })
        .collect()
}

/// Re-chunks a variable-size sample stream into fixed-size frames.
pub struct FrameChunker {
    frame_len: usize,
    pending: Vec<i16>,
}

impl FrameChunker {
    pub fn new(frame_len: usize) -> Self {
        Self {
            frame_len,
            pending: Vec::with_capacity(frame_len * 2),
        }
    }

    pub fn push(&mut self, samples: &[i16]) -> Vec<Vec<i16>> {
        self.pending.extend_from_slice(samples);
        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_len {
            frames.push(self.pending.drain(..self.frame_len).collect());
        }
        frames
    }

    /// Remaining samples as one zero-padded frame, if any.
    pub fn flush(&mut self) -> Option<Vec<i16>> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending.resize(self.frame_len, 0);
        Some(self.pending.drain(..).collect())
    }
}
