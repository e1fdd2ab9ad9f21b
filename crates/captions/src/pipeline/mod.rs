mod frames;
mod resampler;

pub use frames::{FrameChunker, f32_to_i16};
pub use resampler::Resampler;

/// Input rate the SFU hands us.
pub const SOURCE_SAMPLE_RATE: u32 = 48_000;
/// Rate the transcription service expects.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;
/// 20 ms of input at 48 kHz per resampler call.
pub const RESAMPLER_CHUNK: usize = 960;
/// 20 ms of output at 16 kHz per transcriber frame.
pub const FRAME_SAMPLES: usize = 320;
