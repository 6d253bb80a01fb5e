use std::env;

use paperdb_core::config::{Config, Settings};
use paperdb_core::logging::init_tracing;
use paperdb_embed::get_default_embedder;
use paperdb_vector::run_ingest;

const USAGE: &str = "Usage: paperdb-ingest [DATASET] [--start N] [--prepare-table]";

fn apply_args(settings: &mut Settings, args: &[String]) -> anyhow::Result<()> {
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--start" | "-s" => {
                let value = args.get(i + 1).ok_or_else(|| anyhow::anyhow!("--start requires a number\n{USAGE}"))?;
                settings.ingest.start_offset = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("--start requires a number, got '{value}'\n{USAGE}"))?;
                i += 1;
            }
            "--prepare-table" => settings.database.prepare_table = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => settings.ingest.dataset = arg.to_string(),
            other => anyhow::bail!("Unknown option: {other}\n{USAGE}"),
        }
        i += 1;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    init_tracing()?;
    let mut settings = config.settings()?;
    let args: Vec<String> = env::args().skip(1).collect();
    apply_args(&mut settings, &args)?;

    let embedder = get_default_embedder(&settings.embedding)?;
    let report = run_ingest(&settings, embedder.as_ref()).await?;

    println!(
        "Attempted {} papers: {} upserted, {} skipped (no embedding), {} failed.",
        report.attempted, report.upserted, report.skipped, report.failed
    );
    Ok(())
}
