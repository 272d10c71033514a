//! In-memory fakes for the collaborator ports.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use domain::Mention;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::traits::{
    AliasLookup, AnswerEngine, FeedPage, MentionFeed, ReplyRequest, ReplySubmitter,
    SubmitResponse,
};

pub struct FakeLookup {
    result: Option<i64>,
    calls: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn ok(id: i64) -> Self {
        Self {
            result: Some(id),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AliasLookup for FakeLookup {
    async fn resolve_alias(&self, alias: &str) -> Result<i64> {
        self.calls.lock().unwrap().push(alias.to_string());
        self.result.ok_or_else(|| anyhow!("lookup unavailable"))
    }
}

/// Replays scripted pages; once the script runs out the last page repeats.
pub struct FakeFeed {
    pages: Mutex<VecDeque<Result<FeedPage>>>,
    last: Mutex<Option<FeedPage>>,
    calls: Mutex<Vec<(u32, u32)>>,
}

impl FakeFeed {
    pub fn new(pages: Vec<Result<FeedPage>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_mentions(mentions: Vec<Mention>) -> Self {
        Self::new(vec![Ok(page(mentions))])
    }

    pub fn calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn page(mentions: Vec<Mention>) -> FeedPage {
    FeedPage {
        mentions,
        ..FeedPage::default()
    }
}

#[async_trait]
impl MentionFeed for FakeFeed {
    async fn fetch(&self, page_size: u32, page_num: u32) -> Result<FeedPage> {
        self.calls.lock().unwrap().push((page_size, page_num));
        let next = self.pages.lock().unwrap().pop_front();
        match next {
            Some(Ok(page)) => {
                *self.last.lock().unwrap() = Some(page.clone());
                Ok(page)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| anyhow!("feed script exhausted")),
        }
    }
}

pub struct FakeAnswers {
    reply: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl FakeAnswers {
    pub fn ok(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerEngine for FakeAnswers {
    async fn answer(&self, text: &str) -> Result<String> {
        self.queries.lock().unwrap().push(text.to_string());
        self.reply.clone().ok_or_else(|| anyhow!("backend down"))
    }
}

/// Scripted submission results; when the script is empty every call succeeds.
pub struct FakeSubmitter {
    script: Mutex<VecDeque<Result<SubmitResponse>>>,
    requests: Mutex<Vec<ReplyRequest>>,
    on_submit: Option<CancellationToken>,
}

impl FakeSubmitter {
    pub fn new(script: Vec<Result<SubmitResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            on_submit: None,
        }
    }

    pub fn accepting() -> Self {
        Self::new(Vec::new())
    }

    /// Fires `token` while a submission is in flight.
    pub fn cancel_on_submit(mut self, token: CancellationToken) -> Self {
        self.on_submit = Some(token);
        self
    }

    pub fn requests(&self) -> Vec<ReplyRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn status(code: i64) -> Result<SubmitResponse> {
    Ok(SubmitResponse {
        status_code: code,
        message: format!("code {}", code),
        reply_id: (code == 0).then_some(1000),
    })
}

#[async_trait]
impl ReplySubmitter for FakeSubmitter {
    async fn submit(&self, request: &ReplyRequest) -> Result<SubmitResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(token) = &self.on_submit {
            token.cancel();
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| status(0))
    }
}
