//! Video rendering: frame selection, surface drawing, capture, muxing
//!
//! The render session walks the timeline in real time, the capture sink
//! consumes frames and audio on the runtime clock, and the muxer packs
//! both into one synchronized container.

pub mod avi;
pub mod capture;
pub mod frame;
pub mod session;
pub mod surface;

pub use capture::{CaptureHandle, VideoAsset};
pub use frame::select_frame;
pub use session::{render_video, CancelHandle, RenderSession, RenderState};
pub use surface::RenderSurface;
