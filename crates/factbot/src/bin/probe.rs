//! Dry run: fetch the current mentions page and show how each would be handled.
//! Nothing is sent to the answer backend and no reply is posted.

use anyhow::Context;
use std::sync::Arc;

use adapter::{preview, BilibiliClient, IdentifierResolver, MentionFeed};
use domain::PipelineError;
use factbot::config::Settings;
use storage::DedupStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::new().context("Failed to load configuration")?;
    let worker = settings.worker_config().context("Invalid configuration")?;
    let page_size: u32 = match std::env::args().nth(1) {
        Some(arg) => arg.parse().context("Page size must be a number")?,
        None => worker.polling.page_size,
    };

    let client = Arc::new(BilibiliClient::new(&worker.bilibili)?);
    let resolver = IdentifierResolver::new(client.clone());
    let store = DedupStore::open(&settings.bot.state_path);

    println!("Fetching {} mention(s)...", page_size);
    let page = client.fetch(page_size, 1).await?;
    if page.status_code != 0 {
        println!("   -> Feed error {}: {}", page.status_code, page.message);
        return Ok(());
    }
    println!(
        "   -> {} mention(s), has_more = {}, {} already handled locally",
        page.mentions.len(),
        page.has_more,
        store.len()
    );

    for m in &page.mentions {
        let handled = if store.is_handled(m.id) { "handled" } else { "NEW" };
        println!(
            "\n[{}] #{} by {} at {}",
            handled,
            m.id,
            m.author.name,
            m.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        println!("      subject: {}", preview(&m.subject, 60));
        println!("      link:    {}", m.raw_link);

        match resolver.resolve(m).await {
            Ok(t) => println!(
                "      -> oid={} root={} parent={} type={}",
                t.object_id, t.root_id, t.parent_id, t.target_type
            ),
            Err(PipelineError::UnresolvableTarget { .. }) => {
                println!("      -> unresolvable, would be skipped")
            }
            Err(e) => println!("      -> {}", e),
        }
    }

    Ok(())
}
