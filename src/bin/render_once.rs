use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
use std::{path::PathBuf, time::Instant};
use tracing::info;
use vaxdash::{
    config::Config,
    dataset,
    panels::{GroupVariable, InfluenceMetric, RetweetMode, SentimentVariable},
    panels::relations::DEFAULT_WORDS,
    render::{render, render_panel, PanelKind, WidgetState},
};

/// Render the dashboard once and print the chart specs as JSON.
#[derive(Parser)]
#[command(author, version, about = "Render the vaccine-tweet dashboard to JSON")]
struct Args {
    /// Posts CSV: URL, file:// URL or path (defaults to VAXDASH_POSTS_SOURCE)
    #[arg(long)]
    posts: Option<String>,
    /// Word-embedding CSV (defaults to VAXDASH_EMBEDDING_SOURCE)
    #[arg(long)]
    embedding: Option<String>,
    /// Parquet snapshot directory (defaults to VAXDASH_SNAPSHOT_DIR)
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    #[arg(short, long, default_value = "")]
    keyword: String,
    #[arg(long, default_value = "Excluding retweet")]
    retweets: RetweetMode,
    #[arg(long, default_value = "Gender")]
    variable: SentimentVariable,
    #[arg(long, default_value = DEFAULT_WORDS)]
    words: String,
    #[arg(long, default_value = "Impact")]
    metric: InfluenceMetric,
    #[arg(long, default_value = "Gender")]
    group: GroupVariable,
    #[arg(long)]
    facet: bool,
    #[arg(long)]
    nonlinear: bool,

    /// all, keyword, sentiment, relations or influence
    #[arg(long, default_value = "all")]
    panel: String,
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn widget_state(&self) -> WidgetState {
        WidgetState {
            retweets: self.retweets,
            keyword: self.keyword.clone(),
            sentiment_variable: self.variable,
            words: self.words.clone(),
            metric: self.metric,
            group: self.group,
            facet: self.facet,
            nonlinear: self.nonlinear,
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    out.context("serialising chart spec")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut cfg = Config::from_env()?;
    if let Some(p) = &args.posts {
        cfg.posts_source = p.clone();
    }
    if let Some(e) = &args.embedding {
        cfg.embedding_source = e.clone();
    }
    if args.snapshot_dir.is_some() {
        cfg.snapshot_dir = args.snapshot_dir.clone();
    }

    let panel = match args.panel.trim().to_ascii_lowercase().as_str() {
        "all" => None,
        other => Some(other.parse::<PanelKind>()?),
    };

    let start = Instant::now();
    let client = Client::new();
    let data = dataset::load(&client, &cfg).await?;
    info!(
        posts = data.posts.len(),
        words = data.embedding.len(),
        elapsed = ?start.elapsed(),
        "loaded"
    );

    let state = args.widget_state();
    let json = match panel {
        None => to_json(&render(&state, &data), args.pretty)?,
        Some(kind) => to_json(&render_panel(kind, &state, &data), args.pretty)?,
    };
    println!("{}", json);
    Ok(())
}
