use crate::models::MentionId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no object id could be resolved for mention {mention_id}")]
    UnresolvableTarget { mention_id: MentionId },

    #[error("reply submission failed: {0}")]
    TransientDelivery(String),

    #[error("comments are disabled for target type {type_code}")]
    CommentsDisabled { type_code: u8 },

    #[error("mention feed fetch failed: {0}")]
    FeedFetch(String),

    #[error("answer backend failed: {0}")]
    Answer(String),

    #[error("persisting handled mentions failed: {0}")]
    Persistence(String),
}
