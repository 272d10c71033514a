//! Reply delivery with bounded retries and a one-time target-type escalation.
//!
//! ```text
//! Attempting --comments closed (primary content)--> Escalated
//! Attempting | Escalated --success--> Delivered
//! Attempting | Escalated --failure, budget left--> same state (after backoff)
//! Attempting | Escalated --failure, budget spent--> Exhausted
//! ```

use domain::{PipelineError, ResolvedTarget, TargetType};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::common::text_utils::truncate_to_ceiling;
use crate::traits::{ReplyRequest, ReplySubmitter};

/// Platform status for "comments are closed for this area type".
pub const COMMENTS_CLOSED: i64 = 12002;

#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub ceiling: usize,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(60),
            ceiling: 2000,
        }
    }
}

/// `attempts` counts submissions, including the escalated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered {
        reply_id: Option<i64>,
        target_type: TargetType,
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
    },
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryState {
    Attempting { target_type: TargetType, failures: u32 },
    Escalated { failures: u32 },
    Delivered { reply_id: Option<i64>, target_type: TargetType },
    Exhausted { failures: u32 },
}

impl DeliveryState {
    fn target_type(&self) -> TargetType {
        match self {
            Self::Attempting { target_type, .. } | Self::Delivered { target_type, .. } => {
                *target_type
            }
            Self::Escalated { .. } | Self::Exhausted { .. } => TargetType::FeedPost,
        }
    }

    fn failures(&self) -> u32 {
        match self {
            Self::Attempting { failures, .. }
            | Self::Escalated { failures }
            | Self::Exhausted { failures } => *failures,
            Self::Delivered { .. } => 0,
        }
    }
}

/// Result of one submission, classified.
type AttemptResult = Result<Option<i64>, PipelineError>;

fn transition(state: DeliveryState, result: AttemptResult, max_attempts: u32) -> DeliveryState {
    let target_type = state.target_type();
    match (state, result) {
        (_, Ok(reply_id)) => DeliveryState::Delivered {
            reply_id,
            target_type,
        },
        (
            DeliveryState::Attempting {
                target_type: TargetType::PrimaryContent,
                failures,
            },
            Err(PipelineError::CommentsDisabled { .. }),
        ) => DeliveryState::Escalated { failures },
        (DeliveryState::Attempting { target_type, failures }, Err(_)) => {
            counted_failure(failures + 1, max_attempts, |failures| {
                DeliveryState::Attempting {
                    target_type,
                    failures,
                }
            })
        }
        (DeliveryState::Escalated { failures }, Err(_)) => {
            counted_failure(failures + 1, max_attempts, |failures| {
                DeliveryState::Escalated { failures }
            })
        }
        (terminal, Err(_)) => terminal,
    }
}

fn counted_failure(
    failures: u32,
    max_attempts: u32,
    retry: impl FnOnce(u32) -> DeliveryState,
) -> DeliveryState {
    if failures >= max_attempts {
        DeliveryState::Exhausted { failures }
    } else {
        retry(failures)
    }
}

pub struct ReplyDeliverer {
    submitter: Arc<dyn ReplySubmitter>,
    policy: DeliveryPolicy,
}

impl ReplyDeliverer {
    pub fn new(submitter: Arc<dyn ReplySubmitter>, policy: DeliveryPolicy) -> Self {
        Self { submitter, policy }
    }

    pub async fn deliver(&self, target: &ResolvedTarget, answer: &str) -> Delivery {
        let mut state = DeliveryState::Attempting {
            target_type: target.target_type,
            failures: 0,
        };
        let mut submissions = 0u32;

        loop {
            match state {
                DeliveryState::Delivered {
                    reply_id,
                    target_type,
                } => {
                    return Delivery::Delivered {
                        reply_id,
                        target_type,
                        attempts: submissions,
                    }
                }
                DeliveryState::Exhausted { failures } => {
                    warn!(
                        object_id = target.object_id,
                        attempts = submissions,
                        failures,
                        "Reply delivery exhausted its retry budget"
                    );
                    return Delivery::Exhausted {
                        attempts: submissions,
                    };
                }
                DeliveryState::Attempting { .. } | DeliveryState::Escalated { .. } => {}
            }

            let target_type = state.target_type();
            let text = truncate_to_ceiling(answer, self.policy.ceiling);
            let request = ReplyRequest::new(target, target_type.code(), text);
            submissions += 1;

            let result = self.attempt(&request).await;
            let next = transition(state, result, self.policy.max_attempts);

            if matches!(next, DeliveryState::Escalated { .. })
                && !matches!(state, DeliveryState::Escalated { .. })
            {
                info!(
                    object_id = target.object_id,
                    from = %target_type,
                    to = %TargetType::FeedPost,
                    "Comments closed for target type, escalating"
                );
            }

            let retrying = matches!(
                next,
                DeliveryState::Attempting { .. } | DeliveryState::Escalated { .. }
            ) && next.failures() > state.failures();
            state = next;

            if retrying {
                tokio::time::sleep(self.policy.backoff).await;
            }
        }
    }

    async fn attempt(&self, request: &ReplyRequest) -> AttemptResult {
        match self.submitter.submit(request).await {
            Ok(resp) if resp.status_code == 0 => Ok(resp.reply_id),
            Ok(resp) if resp.status_code == COMMENTS_CLOSED => {
                warn!(
                    object_id = request.object_id,
                    type_code = request.type_code,
                    message = %resp.message,
                    "Reply rejected: comments closed"
                );
                Err(PipelineError::CommentsDisabled {
                    type_code: request.type_code,
                })
            }
            Ok(resp) => {
                warn!(
                    object_id = request.object_id,
                    code = resp.status_code,
                    message = %resp.message,
                    "Reply rejected"
                );
                Err(PipelineError::TransientDelivery(format!(
                    "{} {}",
                    resp.status_code, resp.message
                )))
            }
            Err(e) => {
                warn!(object_id = request.object_id, error = %e, "Reply submission errored");
                Err(PipelineError::TransientDelivery(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{status, FakeSubmitter};

    fn policy() -> DeliveryPolicy {
        DeliveryPolicy {
            max_attempts: 3,
            backoff: Duration::ZERO,
            ceiling: 2000,
        }
    }

    fn target(target_type: TargetType) -> ResolvedTarget {
        ResolvedTarget {
            object_id: 114450,
            root_id: 9988,
            parent_id: 0,
            target_type,
        }
    }

    fn deliverer(submitter: &Arc<FakeSubmitter>) -> ReplyDeliverer {
        ReplyDeliverer::new(submitter.clone(), policy())
    }

    #[tokio::test]
    async fn first_success_returns_immediately() {
        let submitter = Arc::new(FakeSubmitter::accepting());
        let outcome = deliverer(&submitter)
            .deliver(&target(TargetType::PrimaryContent), "Analysis: plausible.")
            .await;
        assert!(outcome.is_delivered());
        let reqs = submitter.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].object_id, 114450);
        assert_eq!(reqs[0].root_id, 9988);
        assert_eq!(reqs[0].type_code, 1);
        assert_eq!(reqs[0].text, "Analysis: plausible.");
    }

    #[tokio::test]
    async fn comments_closed_escalates_once_without_using_budget() {
        let submitter = Arc::new(FakeSubmitter::new(vec![
            status(COMMENTS_CLOSED),
            status(-400),
            status(-400),
            status(0),
        ]));
        let outcome = deliverer(&submitter)
            .deliver(&target(TargetType::PrimaryContent), "x")
            .await;

        assert_eq!(
            outcome,
            Delivery::Delivered {
                reply_id: Some(1000),
                target_type: TargetType::FeedPost,
                attempts: 4,
            }
        );
        let codes: Vec<u8> = submitter.requests().iter().map(|r| r.type_code).collect();
        assert_eq!(codes, vec![1, 17, 17, 17]);
        assert!(submitter.requests().iter().all(|r| r.object_id == 114450));
    }

    #[tokio::test]
    async fn second_comments_closed_counts_as_failure() {
        let submitter = Arc::new(FakeSubmitter::new(vec![
            status(COMMENTS_CLOSED),
            status(COMMENTS_CLOSED),
            status(COMMENTS_CLOSED),
            status(COMMENTS_CLOSED),
            status(0),
        ]));
        let outcome = deliverer(&submitter)
            .deliver(&target(TargetType::PrimaryContent), "x")
            .await;

        assert_eq!(outcome, Delivery::Exhausted { attempts: 4 });
        let codes: Vec<u8> = submitter.requests().iter().map(|r| r.type_code).collect();
        assert_eq!(codes, vec![1, 17, 17, 17]);
    }

    #[tokio::test]
    async fn comments_closed_on_non_primary_is_ordinary_failure() {
        let submitter = Arc::new(FakeSubmitter::new(vec![
            status(COMMENTS_CLOSED),
            status(0),
        ]));
        let outcome = deliverer(&submitter)
            .deliver(&target(TargetType::Article), "x")
            .await;
        assert!(outcome.is_delivered());
        let codes: Vec<u8> = submitter.requests().iter().map(|r| r.type_code).collect();
        assert_eq!(codes, vec![12, 12]);
    }

    #[tokio::test]
    async fn never_exceeds_max_attempts() {
        let submitter = Arc::new(FakeSubmitter::new(vec![
            Err(anyhow::anyhow!("connection reset")),
            status(-500),
            status(-500),
            status(0),
        ]));
        let outcome = deliverer(&submitter)
            .deliver(&target(TargetType::PrimaryContent), "x")
            .await;
        assert_eq!(outcome, Delivery::Exhausted { attempts: 3 });
        assert_eq!(submitter.requests().len(), 3);
    }

    #[tokio::test]
    async fn long_answers_are_truncated_on_every_attempt() {
        let submitter = Arc::new(FakeSubmitter::new(vec![status(-1), status(0)]));
        let long = "z".repeat(2600);
        deliverer(&submitter)
            .deliver(&target(TargetType::PrimaryContent), &long)
            .await;

        let reqs = submitter.requests();
        assert_eq!(reqs.len(), 2);
        for req in reqs {
            assert_eq!(req.text.chars().count(), 2000);
            assert!(req.text.ends_with("..."));
            assert_eq!(&req.text[..1997], &long[..1997]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_follows_counted_failures_only() {
        let backoff = Duration::from_secs(60);
        let submitter = Arc::new(FakeSubmitter::new(vec![
            status(COMMENTS_CLOSED),
            status(-1),
            status(-1),
            status(-1),
        ]));
        let deliverer = ReplyDeliverer::new(
            submitter.clone(),
            DeliveryPolicy {
                backoff,
                ..policy()
            },
        );

        let started = tokio::time::Instant::now();
        let outcome = deliverer
            .deliver(&target(TargetType::PrimaryContent), "x")
            .await;

        assert_eq!(outcome, Delivery::Exhausted { attempts: 4 });
        assert_eq!(submitter.requests().len(), 4);
        // 升级立即重试，最后一次失败后不再等待
        assert_eq!(started.elapsed(), 2 * backoff);
    }

    #[tokio::test(start_paused = true)]
    async fn escalation_retries_without_waiting() {
        let submitter = Arc::new(FakeSubmitter::new(vec![status(COMMENTS_CLOSED), status(0)]));
        let deliverer = ReplyDeliverer::new(
            submitter.clone(),
            DeliveryPolicy {
                backoff: Duration::from_secs(60),
                ..policy()
            },
        );

        let started = tokio::time::Instant::now();
        let outcome = deliverer
            .deliver(&target(TargetType::PrimaryContent), "x")
            .await;

        assert!(outcome.is_delivered());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[test]
    fn transition_table() {
        let start = DeliveryState::Attempting {
            target_type: TargetType::PrimaryContent,
            failures: 0,
        };
        let closed = || Err(PipelineError::CommentsDisabled { type_code: 1 });
        let transient = || Err(PipelineError::TransientDelivery("x".into()));

        assert_eq!(
            transition(start, closed(), 3),
            DeliveryState::Escalated { failures: 0 }
        );
        assert_eq!(
            transition(DeliveryState::Escalated { failures: 0 }, closed(), 3),
            DeliveryState::Escalated { failures: 1 }
        );
        assert_eq!(
            transition(DeliveryState::Escalated { failures: 2 }, transient(), 3),
            DeliveryState::Exhausted { failures: 3 }
        );
        assert_eq!(
            transition(start, Ok(Some(5)), 3),
            DeliveryState::Delivered {
                reply_id: Some(5),
                target_type: TargetType::PrimaryContent
            }
        );
    }
}
