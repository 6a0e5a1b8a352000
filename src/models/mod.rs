mod segment;
mod selection;

pub use segment::{CaptureBounds, Segment};
pub use selection::{CaseInfo, Selection};
