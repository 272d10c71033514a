mod common;
mod drivers;
mod pipeline;
#[cfg(test)]
mod testing;
mod traits;

pub use common::text_utils::{preview, truncate_to_ceiling, ELLIPSIS};
pub use drivers::bilibili::BilibiliClient;
pub use drivers::dify::DifyClient;
pub use pipeline::{
    Delivery, DeliveryPolicy, IdentifierResolver, MentionPipeline, PollingPolicy,
    ReplyDeliverer, COMMENTS_CLOSED,
};
pub use traits::{
    AliasLookup, AnswerEngine, FeedPage, MentionFeed, ReplyRequest, ReplySubmitter,
    SubmitResponse,
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storage::DedupStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone)]
pub struct BilibiliConfig {
    pub api_base: String,
    pub sessdata: String,
    pub bili_jct: String,
    pub request_timeout: Duration,
    /// Raw feed responses are written here when set.
    pub debug_dump_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Blocking,
    Streaming,
}

impl ResponseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::Streaming => "streaming",
        }
    }
}

impl std::str::FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocking" => Ok(Self::Blocking),
            "streaming" => Ok(Self::Streaming),
            other => Err(format!("Unknown response mode: {}", other)),
        }
    }
}

#[derive(Clone)]
pub struct DifyConfig {
    pub api_url: String,
    pub api_key: String,
    pub response_mode: ResponseMode,
    pub user: String,
    pub request_timeout: Duration,
}

#[derive(Clone)]
pub struct WorkerConfig {
    pub bilibili: BilibiliConfig,
    pub dify: DifyConfig,
    pub delivery: DeliveryPolicy,
    pub polling: PollingPolicy,
    pub check_interval: Duration,
}

/// Wires the platform and answer drivers into a pipeline, seeds the handled
/// set on first start and polls until `cancel_token` fires.
pub async fn start_with_cancel_token(
    config: WorkerConfig,
    store: DedupStore,
    cancel_token: CancellationToken,
) -> anyhow::Result<()> {
    let platform = Arc::new(BilibiliClient::new(&config.bilibili)?);
    let answers = Arc::new(DifyClient::new(&config.dify)?);

    let mut pipeline = MentionPipeline::new(
        platform.clone(),
        answers,
        IdentifierResolver::new(platform.clone()),
        ReplyDeliverer::new(platform, config.delivery),
        store,
        config.polling,
    );

    info!(
        handled = pipeline.store().len(),
        interval_secs = config.check_interval.as_secs(),
        "Mention worker starting"
    );

    if let Err(e) = pipeline.seed_from_current_feed().await {
        warn!(error = %e, "First-run seeding failed, retrying before the first cycle");
    }

    pipeline.run(config.check_interval, cancel_token).await;
    Ok(())
}
