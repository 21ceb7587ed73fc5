// src/dataset/snapshot.rs

use anyhow::{Context, Result};
use arrow::{
    compute::concat_batches,
    record_batch::{RecordBatch, RecordBatchReader},
};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    path::Path,
    sync::Arc,
};
use tracing::{debug, info};

use super::{Datasets, EmbeddingFrame, PostFrame};
use crate::error::DashboardError;

pub const POSTS_FILE: &str = "posts.parquet";
pub const EMBEDDING_FILE: &str = "embedding.parquet";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Bumped whenever the parquet layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// Records which sources a snapshot was built from. A snapshot is only
/// served when its manifest matches the configured sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub posts_source: String,
    pub embedding_source: String,
}

impl Manifest {
    pub fn for_sources(posts_source: &str, embedding_source: &str) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            posts_source: posts_source.to_string(),
            embedding_source: embedding_source.to_string(),
        }
    }
}

/// Write one batch as a Snappy parquet file via `<name>.tmp` + rename.
fn write_batch(path: &Path, batch: &RecordBatch) -> Result<()> {
    let tmp = path.with_extension("parquet.tmp");
    let file = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer for snapshot")?;
    writer.write(batch).context("writing snapshot batch")?;
    writer.close().context("closing snapshot writer")?;
    fs::rename(&tmp, path)
        .with_context(|| format!("renaming {} → {}", tmp.display(), path.display()))?;
    Ok(())
}

fn read_batch(path: &Path) -> Result<RecordBatch> {
    let snapshot_err = |reason: String| DashboardError::Snapshot {
        path: path.display().to_string(),
        reason,
    };
    let file = File::open(path).map_err(|e| snapshot_err(e.to_string()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| snapshot_err(e.to_string()))?
        .with_batch_size(8192)
        .build()
        .map_err(|e| snapshot_err(e.to_string()))?;
    let schema = reader.schema();
    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| snapshot_err(e.to_string()))?;
    concat_batches(&schema, &batches).map_err(|e| snapshot_err(e.to_string()).into())
}

/// Persist both datasets under `dir`. The manifest goes last, so a partial
/// write never looks current.
pub fn write_snapshot(dir: &Path, data: &Datasets, manifest: &Manifest) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating snapshot dir {}", dir.display()))?;
    let manifest_path = dir.join(MANIFEST_FILE);
    if manifest_path.is_file() {
        fs::remove_file(&manifest_path)
            .with_context(|| format!("removing stale {}", manifest_path.display()))?;
    }
    write_batch(&dir.join(POSTS_FILE), &data.posts.to_record_batch()?)?;
    write_batch(&dir.join(EMBEDDING_FILE), &data.embedding.to_record_batch()?)?;

    let tmp = manifest_path.with_extension("json.tmp");
    let json = serde_json::to_vec_pretty(manifest).context("serialising snapshot manifest")?;
    fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, &manifest_path)
        .with_context(|| format!("renaming {} → {}", tmp.display(), manifest_path.display()))?;
    info!(dir = %dir.display(), posts = data.posts.len(), words = data.embedding.len(), "wrote snapshot");
    Ok(())
}

fn read_manifest(path: &Path) -> Option<Manifest> {
    let raw = fs::read(path).ok()?;
    serde_json::from_slice(&raw).ok()
}

/// `Ok(None)` when a file is absent or the manifest does not match `expected`;
/// an error when the parquet files are present but unreadable.
pub fn read_snapshot(dir: &Path, expected: &Manifest) -> Result<Option<Datasets>> {
    let posts_path = dir.join(POSTS_FILE);
    let embedding_path = dir.join(EMBEDDING_FILE);
    if !posts_path.is_file() || !embedding_path.is_file() {
        debug!(dir = %dir.display(), "no snapshot");
        return Ok(None);
    }
    match read_manifest(&dir.join(MANIFEST_FILE)) {
        Some(found) if found == *expected => {}
        Some(found) => {
            info!(
                dir = %dir.display(),
                snapshot_posts = %found.posts_source,
                snapshot_embedding = %found.embedding_source,
                snapshot_version = found.format_version,
                "snapshot built from other sources, refetching"
            );
            return Ok(None);
        }
        None => {
            info!(dir = %dir.display(), "snapshot has no readable manifest, refetching");
            return Ok(None);
        }
    }
    let posts = PostFrame::from_record_batch(&read_batch(&posts_path)?)?;
    let embedding = EmbeddingFrame::from_record_batch(&read_batch(&embedding_path)?)?;
    info!(dir = %dir.display(), posts = posts.len(), words = embedding.len(), "loaded snapshot");
    Ok(Some(Datasets {
        posts: Arc::new(posts),
        embedding: Arc::new(embedding),
    }))
}
