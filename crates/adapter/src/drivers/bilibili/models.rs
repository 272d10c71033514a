use chrono::DateTime;
use domain::{Author, DeclaredType, Mention};
use serde::Deserialize;

/// `{code, message, data}` wrapper used by every platform endpoint.
#[derive(Deserialize, Debug)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Deserialize, Debug, Default)]
pub struct AtFeedData {
    #[serde(default)]
    pub cursor: Option<AtCursor>,
    #[serde(default)]
    pub items: Vec<AtItem>,
}

#[derive(Deserialize, Debug, Default)]
pub struct AtCursor {
    #[serde(default)]
    pub is_end: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct AtItem {
    pub id: i64,
    pub user: AtUser,
    pub item: AtContent,
    pub at_time: i64,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct AtUser {
    pub mid: i64,
    pub nickname: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct AtContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub business_id: i64,
    pub title: String,
    pub source_content: String,
    pub uri: String,
    // subject_id -> oid, target_id -> root, source_id -> parent
    pub subject_id: i64,
    pub target_id: i64,
    pub source_id: i64,
}

impl From<AtItem> for Mention {
    fn from(raw: AtItem) -> Self {
        Mention {
            id: raw.id,
            author: Author {
                uid: raw.user.mid,
                name: raw.user.nickname,
            },
            subject: raw.item.title,
            content: raw.item.source_content,
            raw_link: raw.item.uri,
            declared_type: DeclaredType::parse(&raw.item.kind),
            explicit_object_id: raw.item.subject_id,
            explicit_root_id: raw.item.target_id,
            explicit_parent_id: raw.item.source_id,
            timestamp: DateTime::from_timestamp(raw.at_time, 0).unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ReplyData {
    #[serde(default)]
    pub rpid: Option<i64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ViewData {
    #[serde(default)]
    pub aid: i64,
}
