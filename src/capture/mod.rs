//! Rolling capture: the page abstraction, the scroll/screenshot loop and the
//! controller that runs one capture at a time.

pub mod capturer;
pub mod command;
pub mod controller;
pub mod page;
pub mod session;
pub mod steps;

pub use capturer::{CaptureRun, CaptureStats, KeptSegment, SegmentCapturer, SegmentMetadata};
pub use command::CaptureCommand;
pub use controller::CaptureController;
pub use page::{CaptureProgress, PageSurface};
pub use session::RunContext;
pub use steps::ScrollOutcome;
