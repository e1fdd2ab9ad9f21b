use rubato::{
    Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

use super::{RESAMPLER_CHUNK, SOURCE_SAMPLE_RATE, TARGET_SAMPLE_RATE};

/// Resamples mono audio from 48 kHz to 16 kHz using sinc interpolation.
pub struct Resampler {
    inner: SincFixedIn<f32>,
    /// Accumulator for input that does not fill a complete chunk yet.
    pending: Vec<f32>,
    chunk_size: usize,
}

impl Resampler {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_chunk_size(RESAMPLER_CHUNK)
    }

    pub fn with_chunk_size(chunk_size: usize) -> anyhow::Result<Self> {
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let inner = SincFixedIn::<f32>::new(
            TARGET_SAMPLE_RATE as f64 / SOURCE_SAMPLE_RATE as f64,
            2.0,
            params,
            chunk_size,
            1,
        )
        .map_err(|e| anyhow::anyhow!("Failed to create resampler: {}", e))?;

        Ok(Self {
            inner,
            pending: Vec::with_capacity(chunk_size * 2),
            chunk_size,
        })
    }

    /// Feeds mono 48 kHz samples; returns whatever full chunks produced at
    /// 16 kHz, empty if not enough input has accumulated.
    pub fn process(&mut self, input: &[f32]) -> anyhow::Result<Vec<f32>> {
        self.pending.extend_from_slice(input);

        let mut output = Vec::new();
        while self.pending.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.pending.drain(..self.chunk_size).collect();
            let resampled = self
                .inner
                .process(&[chunk], None)
                .map_err(|e| anyhow::anyhow!("Resample error: {}", e))?;
            output.extend_from_slice(&resampled[0]);
        }
        Ok(output)
    }

    /// Flushes remaining buffered samples with zero padding.
    pub fn flush(&mut self) -> anyhow::Result<Vec<f32>> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }
        self.pending.resize(self.chunk_size, 0.0);
        self.process(&[])
    }
}
