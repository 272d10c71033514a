mod delivery;
mod resolver;

pub use delivery::{Delivery, DeliveryPolicy, ReplyDeliverer, COMMENTS_CLOSED};
pub use resolver::IdentifierResolver;

use domain::{CycleReport, Mention, MentionOutcome, PipelineError, Stage};
use std::sync::Arc;
use std::time::Duration;
use storage::DedupStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::common::text_utils::preview;
use crate::traits::{AnswerEngine, MentionFeed};

#[derive(Debug, Clone)]
pub struct PollingPolicy {
    pub page_size: u32,
    pub seed_page_size: u32,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            page_size: 20,
            seed_page_size: 50,
        }
    }
}

/// One polling cycle: fetch, filter, resolve, query, deliver, record.
///
/// Owns the [`DedupStore`]; nothing else mutates it. Every mention that gets
/// past filtering is recorded and flushed, whatever its outcome.
pub struct MentionPipeline {
    feed: Arc<dyn MentionFeed>,
    answers: Arc<dyn AnswerEngine>,
    resolver: IdentifierResolver,
    deliverer: ReplyDeliverer,
    store: DedupStore,
    polling: PollingPolicy,
    seeded: bool,
}

impl MentionPipeline {
    pub fn new(
        feed: Arc<dyn MentionFeed>,
        answers: Arc<dyn AnswerEngine>,
        resolver: IdentifierResolver,
        deliverer: ReplyDeliverer,
        store: DedupStore,
        polling: PollingPolicy,
    ) -> Self {
        let seeded = store.was_restored();
        Self {
            feed,
            answers,
            resolver,
            deliverer,
            store,
            polling,
            seeded,
        }
    }

    pub fn store(&self) -> &DedupStore {
        &self.store
    }

    /// Marks everything currently in the feed as handled, so only mentions
    /// arriving after the first start get answered. No-op once a persisted
    /// set was restored or a previous seed landed.
    pub async fn seed_from_current_feed(&mut self) -> Result<usize, PipelineError> {
        if self.seeded {
            debug!("Handled set already established, skipping first-run seeding");
            return Ok(0);
        }

        let page = self.fetch_page(self.polling.seed_page_size).await?;
        let seeded = self
            .store
            .initialize_from_current_feed(page.iter().map(|m| m.id));
        self.seeded = true;
        self.flush();
        info!(seeded, "Marked existing mentions as handled, only new mentions will be answered");
        Ok(seeded)
    }

    /// Until the first-run seed has landed a cycle only retries the seed, so
    /// the backlog seen at startup is never answered.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, PipelineError> {
        self.cycle(&CancellationToken::new()).await
    }

    async fn cycle(&mut self, cancel: &CancellationToken) -> Result<CycleReport, PipelineError> {
        if !self.seeded {
            let seeded = self.seed_from_current_feed().await?;
            return Ok(CycleReport {
                fetched: seeded,
                ..CycleReport::default()
            });
        }

        let mentions = tokio::select! {
            _ = cancel.cancelled() => return Ok(CycleReport::default()),
            page = self.fetch_page(self.polling.page_size) => page?,
        };

        let mut report = CycleReport {
            fetched: mentions.len(),
            ..CycleReport::default()
        };

        let fresh: Vec<Mention> = mentions
            .into_iter()
            .filter(|m| !self.store.is_handled(m.id))
            .collect();
        report.new = fresh.len();

        for mention in fresh {
            // 已开始的提及必须走完并落盘
            if cancel.is_cancelled() {
                info!("Shutdown requested, leaving the rest of the page for the next start");
                break;
            }
            info!(
                mention_id = mention.id,
                author = %mention.author.name,
                content = %preview(&mention.content, 80),
                "New mention"
            );
            let outcome = self.process_mention(&mention).await;
            report.record(&outcome);
            self.record(mention.id, &outcome);
        }

        if report.new > 0 {
            info!(
                new = report.new,
                delivered = report.delivered,
                skipped = report.skipped,
                failed = report.failed,
                "Cycle finished"
            );
        }
        Ok(report)
    }

    /// Runs cycles until `cancel` fires, then flushes one last time.
    ///
    /// A mention already being processed when `cancel` fires is finished and
    /// recorded; the rest of the page waits for the next start.
    pub async fn run(&mut self, interval: Duration, cancel: CancellationToken) {
        loop {
            if let Err(e) = self.cycle(&cancel).await {
                error!(stage = %Stage::Fetching, error = %e, "Cycle aborted");
            }
            if cancel.is_cancelled() {
                break;
            }

            debug!(seconds = interval.as_secs(), "Waiting for next cycle");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!("Stopping mention pipeline");
        self.flush();
    }

    async fn fetch_page(&self, page_size: u32) -> Result<Vec<Mention>, PipelineError> {
        let page = self
            .feed
            .fetch(page_size, 1)
            .await
            .map_err(|e| PipelineError::FeedFetch(format!("{:#}", e)))?;

        if page.status_code != 0 {
            return Err(PipelineError::FeedFetch(format!(
                "status {}: {}",
                page.status_code, page.message
            )));
        }
        Ok(page.mentions)
    }

    async fn process_mention(&self, mention: &Mention) -> MentionOutcome {
        let target = match self.resolver.resolve(mention).await {
            Ok(t) => t,
            Err(e) => {
                warn!(mention_id = mention.id, stage = %Stage::Resolving, link = %mention.raw_link, error = %e, "Skipping mention");
                return MentionOutcome::Unresolvable;
            }
        };
        info!(
            mention_id = mention.id,
            object_id = target.object_id,
            root_id = target.root_id,
            parent_id = target.parent_id,
            type_code = target.target_type.code(),
            "Resolved reply target"
        );

        let subject = mention.subject.trim();
        if subject.is_empty() {
            warn!(mention_id = mention.id, stage = %Stage::Querying, "Mention has no subject, skipping");
            return MentionOutcome::EmptySubject;
        }

        let answer = match self.answers.answer(subject).await {
            Ok(a) if !a.trim().is_empty() => a,
            Ok(_) => {
                let e = PipelineError::Answer("empty answer".to_string());
                warn!(mention_id = mention.id, stage = %Stage::Querying, error = %e, "No usable answer");
                return failed(Stage::Querying, e);
            }
            Err(e) => {
                let e = PipelineError::Answer(format!("{:#}", e));
                warn!(mention_id = mention.id, stage = %Stage::Querying, error = %e, "No usable answer");
                return failed(Stage::Querying, e);
            }
        };
        debug!(mention_id = mention.id, answer = %preview(&answer, 100), "Answer received");

        match self.deliverer.deliver(&target, &answer).await {
            Delivery::Delivered {
                reply_id,
                target_type,
                ..
            } => MentionOutcome::Delivered {
                reply_id,
                target_type,
            },
            Delivery::Exhausted { attempts } => {
                error!(mention_id = mention.id, stage = %Stage::Delivering, attempts, "Reply could not be delivered");
                MentionOutcome::DeliveryExhausted { attempts }
            }
        }
    }

    fn record(&mut self, id: i64, outcome: &MentionOutcome) {
        self.store.mark_handled(id);
        debug!(mention_id = id, stage = %Stage::Recording, outcome = ?outcome, "Mention recorded");
        self.flush();
    }

    fn flush(&self) {
        if let Err(e) = self.store.flush() {
            warn!(error = %e, "Keeping handled mentions in memory only");
        }
    }
}

fn failed(stage: Stage, e: PipelineError) -> MentionOutcome {
    MentionOutcome::Failed {
        stage,
        reason: e.to_string(),
    }
}
