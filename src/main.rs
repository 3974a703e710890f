//! funding-pipeline: binary entrypoint.
//! Reads payload batches and RSS documents, runs the pipeline once, writes accepted
//! records to stdout as JSON lines and the run stats to stderr.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use funding_pipeline::adapters::{payloads_from_json, RssDocumentSource, StaticSource};
use funding_pipeline::telemetry::{init_tracing, install_prometheus};
use funding_pipeline::{
    CancelFlag, EtlConfig, ExtractedOpportunity, OpportunitySink, PayloadSource, Pipeline,
    RelevanceEngine,
};

/// Turn funding announcements into scored opportunity records.
#[derive(Parser, Debug)]
#[command(name = "funding-pipeline")]
#[command(version)]
#[command(about = "Extract, enrich, validate and deduplicate funding announcements")]
struct Cli {
    /// JSON array of tagged payloads (`kind`: feed | crawl | search).
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// RSS 2.0 document. Repeatable.
    #[arg(long)]
    rss: Vec<PathBuf>,

    /// Feed title applied to every --rss document instead of the channel title.
    #[arg(long)]
    feed_title: Option<String>,

    /// EtlConfig file (TOML or JSON). Defaults to $ETL_CONFIG_PATH, then config/etl.{toml,json}.
    #[arg(short, long, env = "ETL_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Reference date for urgency and deadline checks (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Render Prometheus metrics to stderr after the run.
    #[arg(long)]
    metrics: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

/// Writes each record as one JSON line on stdout.
struct StdoutSink {
    out: Mutex<std::io::Stdout>,
}

#[async_trait]
impl OpportunitySink for StdoutSink {
    async fn persist(&self, opp: ExtractedOpportunity) -> Result<()> {
        let line = serde_json::to_string(&opp).context("serializing record")?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow::anyhow!("stdout lock poisoned"))?;
        writeln!(out, "{line}").context("writing record")?;
        Ok(())
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EtlConfig> {
    let cfg = match path {
        Some(p) => {
            let mut cfg = EtlConfig::load_from(p)?;
            cfg.apply_env_overrides();
            cfg.validate()?;
            cfg
        }
        None => EtlConfig::load_default()?,
    };
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let prometheus = if cli.metrics {
        Some(install_prometheus()?)
    } else {
        None
    };

    let config = load_config(cli.config.as_ref())?;
    let relevance = RelevanceEngine::from_env().context("loading relevance vocabulary")?;
    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    tracing::info!(?config, %today, "starting run");
    let pipeline = Pipeline::new(config, relevance, today)?;

    let mut sources: Vec<Box<dyn PayloadSource>> = Vec::new();
    if let Some(path) = &cli.input {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let payloads = payloads_from_json(&s)?;
        sources.push(Box::new(StaticSource::new(
            path.display().to_string(),
            payloads,
        )));
    }
    for path in &cli.rss {
        let xml = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut src = RssDocumentSource::new(path.display().to_string(), xml);
        if let Some(t) = &cli.feed_title {
            src = src.with_feed_title(t.clone());
        }
        sources.push(Box::new(src));
    }
    if sources.is_empty() {
        anyhow::bail!("nothing to do: pass --input and/or --rss");
    }

    let sink = StdoutSink {
        out: Mutex::new(std::io::stdout()),
    };
    let stats = pipeline.run(&sources, &sink, &CancelFlag::new()).await;

    eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    if let Some(handle) = prometheus {
        eprintln!("{}", handle.render());
    }
    Ok(())
}
