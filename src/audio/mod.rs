//! Audio buffering and encoding.

pub mod accumulator;
pub mod wav;

pub use accumulator::AudioAccumulator;
pub use wav::encode_wav;
