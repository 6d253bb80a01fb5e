use std::env;

use anyhow::Context;
use paperdb_core::config::Config;
use paperdb_core::logging::init_tracing;
use paperdb_core::traits::EmbedTask;
use paperdb_embed::get_default_embedder;
use paperdb_vector::{format_context, open_db, search_papers, TableName};

const USAGE: &str = "Usage: paperdb-search \"<query>\" [--limit N]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    init_tracing()?;
    let settings = config.settings()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut limit = settings.search.limit;
    let mut query = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" | "-l" => {
                let value = args.get(i + 1).ok_or_else(|| anyhow::anyhow!("--limit requires a number\n{USAGE}"))?;
                limit = value.parse().with_context(|| format!("--limit requires a number, got '{value}'"))?;
                anyhow::ensure!(limit > 0, "--limit must be positive");
                i += 1;
            }
            arg if !arg.starts_with('-') => query = Some(arg.to_string()),
            other => anyhow::bail!("Unknown option: {other}\n{USAGE}"),
        }
        i += 1;
    }
    let Some(query) = query.filter(|q| !q.trim().is_empty()) else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    let embedder = get_default_embedder(&settings.embedding)?;
    let query_vec = embedder
        .embed(&query, EmbedTask::Query)
        .await
        .context("could not generate embedding for the query")?;

    let table = TableName::from_settings(&settings.database)?;
    let mut db = open_db(&settings.database).await?;
    let hits = search_papers(db.client(), &table, &query_vec, limit).await;
    db.close().await;
    let hits = hits?;

    if hits.is_empty() {
        println!("No relevant papers found. Try rephrasing your query.");
    } else {
        tracing::info!(count = hits.len(), "Found relevant papers");
        println!("{}", format_context(&hits));
    }
    Ok(())
}
