use adapter::{
    BilibiliConfig, DeliveryPolicy, DifyConfig, PollingPolicy, ResponseMode, WorkerConfig,
};
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "FACTBOT_";

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub bilibili: BilibiliSettings,
    pub dify: DifySettings,
    pub bot: BotSettings,
    pub log: LogSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BilibiliSettings {
    pub sessdata: String,
    pub bili_jct: String,
    pub api_base: String,
    pub request_timeout_secs: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DifySettings {
    pub api_key: String,
    pub api_url: String,
    pub response_mode: String,
    pub user: String,
    pub request_timeout_secs: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BotSettings {
    pub check_interval_secs: u64,
    pub retry_times: u32,
    pub retry_interval_secs: u64,
    pub page_size: u32,
    pub seed_page_size: u32,
    pub reply_ceiling: usize,
    pub state_path: String,
    // 调试用：保存原始 @ 消息响应
    pub debug_dump_path: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LogSettings {
    pub level: String,
    pub dir: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let env_map = env_overrides(std::env::vars());

        let env_json = serde_json::to_string(&env_map)
            .map_err(|e| ConfigError::Message(format!("Environment overrides: {}", e)))?;

        defaults()?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(config::File::from_str(&env_json, config::FileFormat::Json))
            .build()?
            .try_deserialize()
    }

    /// Checks credentials and converts into the worker's runtime configuration.
    pub fn worker_config(&self) -> anyhow::Result<WorkerConfig> {
        require("bilibili.sessdata", &self.bilibili.sessdata)?;
        require("bilibili.bili_jct", &self.bilibili.bili_jct)?;
        require("dify.api_key", &self.dify.api_key)?;
        if self.bot.retry_times == 0 {
            anyhow::bail!("bot.retry_times must be at least 1");
        }
        if self.bot.reply_ceiling <= adapter::ELLIPSIS.len() {
            anyhow::bail!("bot.reply_ceiling is too small: {}", self.bot.reply_ceiling);
        }

        let response_mode: ResponseMode = self
            .dify
            .response_mode
            .parse()
            .map_err(anyhow::Error::msg)?;

        Ok(WorkerConfig {
            bilibili: BilibiliConfig {
                api_base: self.bilibili.api_base.clone(),
                sessdata: self.bilibili.sessdata.clone(),
                bili_jct: self.bilibili.bili_jct.clone(),
                request_timeout: Duration::from_secs(self.bilibili.request_timeout_secs),
                debug_dump_path: self
                    .bot
                    .debug_dump_path
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from),
            },
            dify: DifyConfig {
                api_url: self.dify.api_url.clone(),
                api_key: self.dify.api_key.clone(),
                response_mode,
                user: self.dify.user.clone(),
                request_timeout: Duration::from_secs(self.dify.request_timeout_secs),
            },
            delivery: DeliveryPolicy {
                max_attempts: self.bot.retry_times,
                backoff: Duration::from_secs(self.bot.retry_interval_secs),
                ceiling: self.bot.reply_ceiling,
            },
            polling: PollingPolicy {
                page_size: self.bot.page_size,
                seed_page_size: self.bot.seed_page_size,
            },
            check_interval: Duration::from_secs(self.bot.check_interval_secs),
        })
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("bilibili.sessdata", "")?
        .set_default("bilibili.bili_jct", "")?
        .set_default("bilibili.api_base", "https://api.bilibili.com")?
        .set_default("bilibili.request_timeout_secs", 30)?
        .set_default("dify.api_key", "")?
        .set_default("dify.api_url", "https://api.dify.ai/v1")?
        .set_default("dify.response_mode", "streaming")?
        .set_default("dify.user", "factbot")?
        .set_default("dify.request_timeout_secs", 180)?
        .set_default("bot.check_interval_secs", 10)?
        .set_default("bot.retry_times", 3)?
        .set_default("bot.retry_interval_secs", 60)?
        .set_default("bot.page_size", 20)?
        .set_default("bot.seed_page_size", 50)?
        .set_default("bot.reply_ceiling", 2000)?
        .set_default("bot.state_path", "data/processed_messages.json")?
        .set_default("log.level", "info")?
        .set_default("log.dir", "log")
}

fn require(key: &str, value: &str) -> anyhow::Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("Missing required setting `{}`", key);
    }
    Ok(())
}

/// `FACTBOT_BOT__PAGE_SIZE=5` becomes `bot.page_size = "5"`.
fn env_overrides(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            (key, v)
        })
        .collect()
}
