use crate::models::TargetType;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Fetching,
    Filtering,
    Resolving,
    Querying,
    Delivering,
    Recording,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetching => "fetching",
            Self::Filtering => "filtering",
            Self::Resolving => "resolving",
            Self::Querying => "querying",
            Self::Delivering => "delivering",
            Self::Recording => "recording",
        };
        f.write_str(name)
    }
}

/// How a single mention ended. Every variant is recorded as handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MentionOutcome {
    Delivered {
        reply_id: Option<i64>,
        target_type: TargetType,
    },
    Unresolvable,
    EmptySubject,
    DeliveryExhausted {
        attempts: u32,
    },
    Failed {
        stage: Stage,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub fetched: usize,
    pub new: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl CycleReport {
    pub fn record(&mut self, outcome: &MentionOutcome) {
        match outcome {
            MentionOutcome::Delivered { .. } => self.delivered += 1,
            MentionOutcome::Unresolvable | MentionOutcome::EmptySubject => self.skipped += 1,
            MentionOutcome::DeliveryExhausted { .. } | MentionOutcome::Failed { .. } => {
                self.failed += 1
            }
        }
    }
}
