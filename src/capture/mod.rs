pub mod capturer;
pub mod debug_sink;
pub mod source;

pub use capturer::{Capturer, Snapshot};
pub use debug_sink::DebugSink;
pub use source::{DisplayInfo, ScreenSource, XcapSource};
