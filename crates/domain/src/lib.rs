mod errors;
mod events;
mod models;
pub mod protocol;

pub use errors::PipelineError;
pub use events::{CycleReport, MentionOutcome, Stage};
pub use models::{
    Author, DeclaredType, Mention, MentionId, ObjectHint, ResolvedTarget, TargetType,
};
