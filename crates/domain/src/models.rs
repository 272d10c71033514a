use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type MentionId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub uid: i64,
    pub name: String,
}

/// Kind of content a mention was made in, as declared by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Reply,
    Dynamic,
    Article,
    Other,
}

impl DeclaredType {
    /// Empty strings mean the feed did not declare a type.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "" => None,
            "reply" => Some(Self::Reply),
            "dynamic" => Some(Self::Dynamic),
            "article" => Some(Self::Article),
            _ => Some(Self::Other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: MentionId,
    pub author: Author,
    pub subject: String,
    pub content: String,
    pub raw_link: String,
    pub declared_type: Option<DeclaredType>,
    // 0 表示 feed 未提供
    pub explicit_object_id: i64,
    pub explicit_root_id: i64,
    pub explicit_parent_id: i64,
    pub timestamp: DateTime<Utc>,
}

impl Mention {
    /// A mention carrying only an id and a link; everything else defaulted.
    pub fn with_link(id: MentionId, raw_link: impl Into<String>) -> Self {
        Self {
            id,
            author: Author {
                uid: 0,
                name: String::new(),
            },
            subject: String::new(),
            content: String::new(),
            raw_link: raw_link.into(),
            declared_type: None,
            explicit_object_id: 0,
            explicit_root_id: 0,
            explicit_parent_id: 0,
            timestamp: DateTime::<Utc>::default(),
        }
    }
}

/// Comment-area type a reply is posted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetType {
    PrimaryContent,
    FeedPost,
    Article,
}

impl TargetType {
    pub fn code(self) -> u8 {
        match self {
            Self::PrimaryContent => 1,
            Self::FeedPost => 17,
            Self::Article => 12,
        }
    }

    pub fn from_declared(declared: Option<DeclaredType>) -> Self {
        match declared {
            Some(DeclaredType::Dynamic) => Self::FeedPost,
            Some(DeclaredType::Article) => Self::Article,
            Some(DeclaredType::Reply) | Some(DeclaredType::Other) | None => Self::PrimaryContent,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Reply addressing derived from a mention. `object_id` is always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub object_id: i64,
    pub root_id: i64,
    pub parent_id: i64,
    pub target_type: TargetType,
}

/// What a single object-id rule found in a mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectHint {
    Id(i64),
    /// Public alias that still has to be looked up.
    Alias(String),
}
