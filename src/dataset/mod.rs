// src/dataset/mod.rs

pub mod date_parser;
pub mod embedding;
pub mod posts;
pub mod snapshot;

use anyhow::{Context, Result};
use arrow::{
    array::{Array, Float64Array},
    record_batch::RecordBatch,
};
use csv::StringRecord;
use reqwest::Client;
use std::{sync::Arc, time::Instant};
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::DashboardError;
use crate::fetch::{fetch_source, Source};

pub use embedding::{parse_embedding_csv, EmbeddingFrame};
pub use posts::{parse_posts_csv, PostFrame, PostRow};

/// Both datasets for one session. Shared read-only behind `Arc`.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub posts: Arc<PostFrame>,
    pub embedding: Arc<EmbeddingFrame>,
}

impl Datasets {
    pub fn new(posts: PostFrame, embedding: EmbeddingFrame) -> Self {
        Self {
            posts: Arc::new(posts),
            embedding: Arc::new(embedding),
        }
    }

    /// Parse both payloads; CPU-bound, callers on the runtime should use
    /// `spawn_blocking`.
    pub fn parse(posts_csv: &[u8], embedding_csv: &[u8]) -> Result<Self> {
        let posts = parse_posts_csv(posts_csv).context("parsing posts dataset")?;
        let embedding =
            parse_embedding_csv(embedding_csv).context("parsing embedding dataset")?;
        Ok(Self::new(posts, embedding))
    }
}

/// The "+1" transform applied to the influence metrics so that every
/// response value is strictly positive. Nulls stay null.
pub fn shift_by_one<I>(values: I) -> Float64Array
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().map(|v| v.map(|x| x + 1.0)).collect()
}

/// Load both datasets once: snapshot first (if configured), otherwise fetch
/// both sources concurrently, parse on the blocking pool and refresh the
/// snapshot.
#[instrument(level = "info", skip_all)]
pub async fn load(client: &Client, cfg: &Config) -> Result<Datasets> {
    let start = Instant::now();
    let manifest = snapshot::Manifest::for_sources(&cfg.posts_source, &cfg.embedding_source);

    if let Some(dir) = cfg.snapshot_dir.clone() {
        let expected = manifest.clone();
        let found =
            tokio::task::spawn_blocking(move || snapshot::read_snapshot(&dir, &expected)).await?;
        match found {
            Ok(Some(ds)) => {
                info!(elapsed = ?start.elapsed(), "datasets ready from snapshot");
                return Ok(ds);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %format!("{:#}", e), "ignoring unreadable snapshot"),
        }
    }

    let posts_src = Source::parse(&cfg.posts_source)?;
    let embedding_src = Source::parse(&cfg.embedding_source)?;
    let (posts_raw, embedding_raw) = tokio::try_join!(
        fetch_source(client, &posts_src, &cfg.fetch),
        fetch_source(client, &embedding_src, &cfg.fetch),
    )?;

    let snapshot_dir = cfg.snapshot_dir.clone();
    let ds = tokio::task::spawn_blocking(move || -> Result<Datasets> {
        let ds = Datasets::parse(&posts_raw, &embedding_raw)?;
        if let Some(dir) = snapshot_dir {
            if let Err(e) = snapshot::write_snapshot(&dir, &ds, &manifest) {
                warn!(error = %format!("{:#}", e), "failed to write snapshot");
            }
        }
        Ok(ds)
    })
    .await??;

    info!(
        posts = ds.posts.len(),
        words = ds.embedding.len(),
        elapsed = ?start.elapsed(),
        "datasets ready"
    );
    Ok(ds)
}

pub(crate) fn required_index(header: &StringRecord, dataset: &str, name: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| date_parser::clean_str(h.trim_start_matches('\u{feff}')) == name)
        .ok_or_else(|| {
            DashboardError::MissingColumn {
                dataset: dataset.to_string(),
                column: name.to_string(),
            }
            .into()
        })
}

pub(crate) fn csv_error(dataset: &str, err: csv::Error) -> anyhow::Error {
    DashboardError::Parse {
        dataset: dataset.to_string(),
        line: err.position().map(|p| p.line()).unwrap_or(0),
        message: err.to_string(),
    }
    .into()
}

/// Pull a typed column out of a snapshot batch.
pub(crate) fn column<A>(batch: &RecordBatch, name: &str) -> Result<A>
where
    A: Array + Clone + 'static,
{
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<A>())
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("snapshot column '{}' missing or mistyped", name))
}
