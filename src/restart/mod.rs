//! Restart streams: per-report-step solution blocks with lazy random access.

pub mod index;
pub mod reader;
pub mod writer;

pub use index::{StepEntry, StepIndex};
pub use reader::{intehead_time, RestartReader, TimeStepBlock};
pub use writer::RestartWriter;
