pub mod analysis;
pub mod backend;
pub mod service;

pub use analysis::{Action, AnalysisResult};
pub use backend::{OpenAiBackend, VisionBackend};
pub use service::{Perception, PerceptionBuilder};
