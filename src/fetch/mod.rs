// src/fetch/mod.rs

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use reqwest::Client;
use std::{fmt, io::Read, path::PathBuf, time::Instant};
use tokio::{fs, time::sleep};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::error::DashboardError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Where a dataset comes from: a remote URL or a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Remote(Url),
    Local(PathBuf),
}

impl Source {
    /// `http(s)://` → remote, `file://` → local path, anything else is a plain path.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = Url::parse(raw).with_context(|| format!("parsing source URL {}", raw))?;
            return Ok(Source::Remote(url));
        }
        if raw.starts_with("file://") {
            let url = Url::parse(raw).with_context(|| format!("parsing source URL {}", raw))?;
            let path = url
                .to_file_path()
                .map_err(|_| anyhow::anyhow!("file URL {} has no local path", raw))?;
            return Ok(Source::Local(path));
        }
        Ok(Source::Local(PathBuf::from(raw)))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Remote(url) => write!(f, "{}", url),
            Source::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

async fn get_bytes_core(client: &Client, url: &Url, cfg: &FetchConfig) -> Result<Vec<u8>> {
    debug!("Fetching bytes from {}", url);
    let bytes = client
        .get(url.clone())
        .timeout(cfg.timeout)
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .bytes()
        .await
        .with_context(|| format!("Reading body from {}", url))?;
    Ok(bytes.to_vec())
}

async fn get_bytes_with_retry(client: &Client, url: &Url, cfg: &FetchConfig) -> Result<Vec<u8>> {
    let mut attempts = 0;
    loop {
        match get_bytes_core(client, url, cfg).await {
            Ok(b) => return Ok(b),
            Err(e) if attempts < cfg.max_retries => {
                attempts += 1;
                let backoff = cfg.initial_backoff * 2u32.pow(attempts - 1);
                warn!(%url, attempt = attempts, delay_ms = backoff.as_millis() as u64, error = %e, "Retrying");
                sleep(backoff).await;
            }
            Err(e) => {
                error!(%url, error = %e, "Exhausted retries");
                return Err(e);
            }
        }
    }
}

/// Read a source fully into memory, gunzipping it when it starts with the
/// gzip magic bytes. Any failure surfaces as `DashboardError::DataUnavailable`.
#[instrument(level = "info", skip(client, cfg), fields(source = %source))]
pub async fn fetch_source(client: &Client, source: &Source, cfg: &FetchConfig) -> Result<Vec<u8>> {
    let start = Instant::now();
    let raw = match source {
        Source::Remote(url) => get_bytes_with_retry(client, url, cfg).await,
        Source::Local(path) => fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
    }
    .map_err(|e| unavailable(source, &e))?;

    let bytes = maybe_gunzip(raw).map_err(|e| unavailable(source, &e))?;
    info!(bytes = bytes.len(), elapsed = ?start.elapsed(), "fetched");
    Ok(bytes)
}

fn unavailable(source: &Source, err: &anyhow::Error) -> anyhow::Error {
    DashboardError::DataUnavailable {
        source_name: source.to_string(),
        reason: format!("{:#}", err),
    }
    .into()
}

/// Decompress gzip payloads; pass anything else through untouched.
pub fn maybe_gunzip(raw: Vec<u8>) -> Result<Vec<u8>> {
    if !raw.starts_with(&GZIP_MAGIC) {
        return Ok(raw);
    }
    let mut out = Vec::with_capacity(raw.len() * 4);
    GzDecoder::new(raw.as_slice())
        .read_to_end(&mut out)
        .context("decompressing gzip payload")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn quick_cfg() -> FetchConfig {
        FetchConfig {
            max_retries: 1,
            initial_backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn parse_source_kinds() {
        assert!(matches!(
            Source::parse("https://example.com/a.csv").unwrap(),
            Source::Remote(_)
        ));
        assert_eq!(
            Source::parse(" data/posts.csv ").unwrap(),
            Source::Local(PathBuf::from("data/posts.csv"))
        );
        assert_eq!(
            Source::parse("file:///tmp/posts.csv").unwrap(),
            Source::Local(PathBuf::from("/tmp/posts.csv"))
        );
    }

    #[test]
    fn gunzip_only_when_magic_present() {
        let plain = b"a,b\n1,2\n".to_vec();
        assert_eq!(maybe_gunzip(plain.clone()).unwrap(), plain);

        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&plain).unwrap();
        let gz = enc.finish().unwrap();
        assert_eq!(maybe_gunzip(gz).unwrap(), plain);
    }

    #[tokio::test]
    async fn reads_local_gzip_file() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"words,PC1\ntrump,0.1\n").unwrap();
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&enc.finish().unwrap()).unwrap();

        let source = Source::Local(tmp.path().to_path_buf());
        let bytes = fetch_source(&Client::new(), &source, &quick_cfg())
            .await
            .unwrap();
        assert_eq!(bytes, b"words,PC1\ntrump,0.1\n");
    }

    #[tokio::test]
    async fn missing_file_is_data_unavailable() {
        let source = Source::Local(PathBuf::from("/definitely/not/here.csv"));
        let err = fetch_source(&Client::new(), &source, &quick_cfg())
            .await
            .unwrap_err();
        assert!(matches!(
            DashboardError::find(&err),
            Some(DashboardError::DataUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_data_unavailable_after_retries() {
        let source = Source::parse("http://127.0.0.1:1/posts.csv").unwrap();
        let err = fetch_source(&Client::new(), &source, &quick_cfg())
            .await
            .unwrap_err();
        assert!(matches!(
            DashboardError::find(&err),
            Some(DashboardError::DataUnavailable { .. })
        ));
    }
}
