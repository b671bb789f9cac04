//! Audio pipeline: sample buffers, rate/channel normalization, merging

pub mod buffer;
pub mod merge;
pub mod resample;

pub use buffer::SampleBuffer;
pub use merge::merge;
