use anyhow::Result;
use async_trait::async_trait;
use domain::{Mention, ResolvedTarget};

/// One page of the mentions feed. A non-zero `status_code` is a feed-level error.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub status_code: i64,
    pub message: String,
    pub mentions: Vec<Mention>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub object_id: i64,
    pub type_code: u8,
    pub text: String,
    pub root_id: i64,
    pub parent_id: i64,
}

impl ReplyRequest {
    pub fn new(target: &ResolvedTarget, type_code: u8, text: impl Into<String>) -> Self {
        Self {
            object_id: target.object_id,
            type_code,
            text: text.into(),
            root_id: target.root_id,
            parent_id: target.parent_id,
        }
    }
}

/// Platform answer to a reply submission; status 0 means success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitResponse {
    pub status_code: i64,
    pub message: String,
    pub reply_id: Option<i64>,
}

#[async_trait]
pub trait MentionFeed: Send + Sync {
    async fn fetch(&self, page_size: u32, page_num: u32) -> Result<FeedPage>;
}

#[async_trait]
pub trait AliasLookup: Send + Sync {
    async fn resolve_alias(&self, alias: &str) -> Result<i64>;
}

#[async_trait]
pub trait ReplySubmitter: Send + Sync {
    async fn submit(&self, request: &ReplyRequest) -> Result<SubmitResponse>;
}

#[async_trait]
pub trait AnswerEngine: Send + Sync {
    async fn answer(&self, text: &str) -> Result<String>;
}
