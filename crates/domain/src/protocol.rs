//! Link conventions of the platform and the ordered object-id rules.
//!
//! Every rule is a pure function over a [`Mention`]; the first rule that
//! returns a hint wins. Rules never fail: anything unparseable is a miss.

use crate::models::{Mention, ObjectHint};
use url::Url;

/// Origin used to anchor relative or scheme-less links.
pub const WEB_ORIGIN: &str = "https://www.bilibili.com/";

pub const OBJECT_ID_PARAM: &str = "subject_id";
pub const BUSINESS_ID_PARAM: &str = "business_id";
pub const COMMENT_ROOT_PARAM: &str = "comment_root_id";
pub const FALLBACK_OID_PARAM: &str = "oid";

/// Path segments after which a bare number is a primary-content id.
const CONTENT_SEGMENTS: &[&str] = &["video"];
const SHORT_FORM_PREFIX: &str = "av";
const ALIAS_PREFIX: &str = "BV";

pub type ObjectRule = fn(&Mention) -> Option<ObjectHint>;

/// Object-id rules in resolution order, labelled for logging.
pub const OBJECT_RULES: [(&str, ObjectRule); 6] = [
    ("explicit_object_id", explicit_object_id),
    ("object_id_param", object_id_param),
    ("content_path", content_path),
    ("business_id_param", business_id_param),
    ("alias_code", alias_code),
    ("unlabeled_fallback", unlabeled_fallback),
];

pub fn parse_link(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(WEB_ORIGIN).ok()?.join(raw).ok()
        }
        Err(_) => None,
    }
}

pub fn positive_param(url: &Url, key: &str) -> Option<i64> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
}

fn segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default()
}

fn numeric(segment: &str) -> Option<i64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse::<i64>().ok().filter(|id| *id > 0)
}

fn short_form(segment: &str) -> Option<i64> {
    let prefix = segment.get(..SHORT_FORM_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(SHORT_FORM_PREFIX) {
        return None;
    }
    numeric(&segment[SHORT_FORM_PREFIX.len()..])
}

pub fn explicit_object_id(mention: &Mention) -> Option<ObjectHint> {
    (mention.explicit_object_id > 0).then_some(ObjectHint::Id(mention.explicit_object_id))
}

pub fn object_id_param(mention: &Mention) -> Option<ObjectHint> {
    let url = parse_link(&mention.raw_link)?;
    positive_param(&url, OBJECT_ID_PARAM).map(ObjectHint::Id)
}

pub fn content_path(mention: &Mention) -> Option<ObjectHint> {
    let url = parse_link(&mention.raw_link)?;
    let segs = segments(&url);

    if let Some(id) = segs.iter().find_map(|s| short_form(s)) {
        return Some(ObjectHint::Id(id));
    }

    segs.windows(2)
        .find(|pair| CONTENT_SEGMENTS.contains(&pair[0]))
        .and_then(|pair| numeric(pair[1]))
        .map(ObjectHint::Id)
}

pub fn business_id_param(mention: &Mention) -> Option<ObjectHint> {
    let url = parse_link(&mention.raw_link)?;
    positive_param(&url, BUSINESS_ID_PARAM).map(ObjectHint::Id)
}

pub fn alias_code(mention: &Mention) -> Option<ObjectHint> {
    let url = parse_link(&mention.raw_link)?;
    segments(&url)
        .into_iter()
        .find(|s| {
            s.len() > ALIAS_PREFIX.len()
                && s.starts_with(ALIAS_PREFIX)
                && s.bytes().all(|b| b.is_ascii_alphanumeric())
        })
        .map(|s| ObjectHint::Alias(s.to_string()))
}

pub fn unlabeled_fallback(mention: &Mention) -> Option<ObjectHint> {
    let url = parse_link(&mention.raw_link)?;
    segments(&url)
        .into_iter()
        .find_map(numeric)
        .or_else(|| positive_param(&url, FALLBACK_OID_PARAM))
        .map(ObjectHint::Id)
}

/// Thread root named by the link, if any.
pub fn comment_root_param(raw_link: &str) -> Option<i64> {
    let url = parse_link(raw_link)?;
    positive_param(&url, COMMENT_ROOT_PARAM)
}
