use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::stream::SseAssembler;
use crate::common::text_utils::preview;
use crate::traits::AnswerEngine;
use crate::{DifyConfig, ResponseMode};

#[derive(Serialize)]
struct ChatRequest<'a> {
    inputs: serde_json::Map<String, serde_json::Value>,
    query: &'a str,
    response_mode: &'a str,
    conversation_id: &'a str,
    user: &'a str,
}

#[derive(Deserialize)]
struct BlockingAnswer {
    #[serde(default)]
    answer: String,
}

/// Chat-messages client for the answer backend.
#[derive(Clone)]
pub struct DifyClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    mode: ResponseMode,
    user: String,
}

impl DifyClient {
    pub fn new(config: &DifyConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build answer-backend HTTP client")?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat-messages", config.api_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            mode: config.response_mode,
            user: config.user.clone(),
        })
    }
}

#[async_trait]
impl AnswerEngine for DifyClient {
    async fn answer(&self, text: &str) -> Result<String> {
        let body = ChatRequest {
            inputs: serde_json::Map::new(),
            query: text,
            response_mode: self.mode.as_str(),
            conversation_id: "",
            user: &self.user,
        };

        debug!(mode = self.mode.as_str(), query = %preview(text, 60), "Querying answer backend");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Answer backend request failed")?
            .error_for_status()?;

        let answer = match self.mode {
            ResponseMode::Blocking => {
                let parsed: BlockingAnswer = response
                    .json()
                    .await
                    .context("Answer backend body is not JSON")?;
                parsed.answer
            }
            ResponseMode::Streaming => {
                let mut stream = response.bytes_stream();
                let mut assembler = SseAssembler::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.context("Answer stream read failed")?;
                    assembler.push(&chunk);
                }
                assembler.finish()
            }
        };

        info!(answer = %preview(&answer, 100), "Answer backend replied");
        Ok(answer)
    }
}
