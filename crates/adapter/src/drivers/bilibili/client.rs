use anyhow::{Context, Result};
use async_trait::async_trait;
use domain::Mention;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER, USER_AGENT};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::models::{ApiEnvelope, AtFeedData, ReplyData, ViewData};
use crate::traits::{AliasLookup, FeedPage, MentionFeed, ReplyRequest, ReplySubmitter, SubmitResponse};
use crate::BilibiliConfig;

const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const WEB_REFERER: &str = "https://www.bilibili.com/";
const WEB_ORIGIN: &str = "https://www.bilibili.com";
/// `plat=1` marks a web-client comment.
const REPLY_PLATFORM: &str = "1";

/// Platform driver: mentions feed, reply submission and alias lookup.
#[derive(Clone)]
pub struct BilibiliClient {
    http: reqwest::Client,
    api_base: String,
    csrf: String,
    debug_dump: Option<PathBuf>,
}

impl BilibiliClient {
    pub fn new(config: &BilibiliConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(REFERER, HeaderValue::from_static(WEB_REFERER));

        let cookie = format!("SESSDATA={}; bili_jct={}", config.sessdata, config.bili_jct);
        let mut cookie = HeaderValue::from_str(&cookie).context("Session cookie is not a valid header value")?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build platform HTTP client")?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            csrf: config.bili_jct.clone(),
            debug_dump: config.debug_dump_path.clone(),
        })
    }

    fn dump_raw(&self, raw: &serde_json::Value) {
        let Some(path) = &self.debug_dump else {
            return;
        };
        let written = serde_json::to_vec_pretty(raw)
            .map_err(anyhow::Error::from)
            .and_then(|body| {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                std::fs::write(path, body).map_err(anyhow::Error::from)
            });
        if let Err(e) = written {
            warn!(path = %path.display(), error = %e, "Failed to dump raw feed response");
        }
    }
}

fn decode<T: DeserializeOwned>(raw: serde_json::Value) -> Result<ApiEnvelope<T>> {
    serde_json::from_value(raw).context("Unexpected platform response shape")
}

#[async_trait]
impl MentionFeed for BilibiliClient {
    async fn fetch(&self, page_size: u32, page_num: u32) -> Result<FeedPage> {
        let url = format!("{}/x/msgfeed/at", self.api_base);
        let raw: serde_json::Value = self
            .http
            .get(&url)
            .query(&[("ps", page_size), ("pn", page_num)])
            .send()
            .await
            .context("Mentions feed request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Mentions feed body is not JSON")?;

        self.dump_raw(&raw);

        let env: ApiEnvelope<AtFeedData> = decode(raw)?;
        if env.code != 0 {
            return Ok(FeedPage {
                status_code: env.code,
                message: env.message,
                ..FeedPage::default()
            });
        }

        let data = env.data.unwrap_or_default();
        let has_more = data.cursor.map(|c| !c.is_end).unwrap_or(false);
        let mentions: Vec<Mention> = data.items.into_iter().map(Mention::from).collect();
        debug!(page_num, page_size, count = mentions.len(), "Fetched mentions page");

        Ok(FeedPage {
            status_code: 0,
            message: env.message,
            mentions,
            has_more,
        })
    }
}

#[async_trait]
impl ReplySubmitter for BilibiliClient {
    async fn submit(&self, request: &ReplyRequest) -> Result<SubmitResponse> {
        let url = format!("{}/x/v2/reply/add", self.api_base);

        let mut form = vec![
            ("oid", request.object_id.to_string()),
            ("type", request.type_code.to_string()),
            ("message", request.text.clone()),
            ("plat", REPLY_PLATFORM.to_string()),
            ("csrf", self.csrf.clone()),
        ];
        // 直接回复稿件时不带 root / parent
        if request.root_id != 0 {
            form.push(("root", request.root_id.to_string()));
        }
        if request.parent_id != 0 {
            form.push(("parent", request.parent_id.to_string()));
        }

        let raw: serde_json::Value = self
            .http
            .post(&url)
            .header("Origin", WEB_ORIGIN)
            .form(&form)
            .send()
            .await
            .context("Reply submission request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Reply submission body is not JSON")?;

        let env: ApiEnvelope<ReplyData> = decode(raw)?;
        let reply_id = env.data.and_then(|d| d.rpid);
        if env.code == 0 {
            info!(object_id = request.object_id, reply_id = ?reply_id, "Reply posted");
        }

        Ok(SubmitResponse {
            status_code: env.code,
            message: env.message,
            reply_id,
        })
    }
}

#[async_trait]
impl AliasLookup for BilibiliClient {
    async fn resolve_alias(&self, alias: &str) -> Result<i64> {
        let url = format!("{}/x/web-interface/view", self.api_base);
        let raw: serde_json::Value = self
            .http
            .get(&url)
            .query(&[("bvid", alias)])
            .send()
            .await
            .with_context(|| format!("Alias lookup request failed for {}", alias))?
            .error_for_status()?
            .json()
            .await?;

        let env: ApiEnvelope<ViewData> = decode(raw)?;
        if env.code != 0 {
            anyhow::bail!("Alias lookup for {} rejected: {} {}", alias, env.code, env.message);
        }
        let aid = env.data.map(|d| d.aid).unwrap_or(0);
        if aid <= 0 {
            anyhow::bail!("Alias lookup for {} returned no id", alias);
        }
        info!(alias, aid, "Resolved alias to internal id");
        Ok(aid)
    }
}
