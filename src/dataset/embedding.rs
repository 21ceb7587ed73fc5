// src/dataset/embedding.rs

use anyhow::{Context, Result};
use arrow::{
    array::{Array, ArrayRef, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use csv::ReaderBuilder;
use std::sync::Arc;
use tracing::{info, warn};

use super::date_parser::clean_str;
use super::{column, csv_error, required_index};

pub const DATASET: &str = "embedding";

pub mod headers {
    pub const WORDS: &str = "words";
    pub const PC1: &str = "PC1";
    pub const PC2: &str = "PC2";
    pub const PC3: &str = "PC3";
}

/// Precomputed 3-D word coordinates. Rows with a missing label or
/// coordinate are dropped at load, so every column is null-free.
#[derive(Debug, Clone)]
pub struct EmbeddingFrame {
    pub words: StringArray,
    pub pc1: Float64Array,
    pub pc2: Float64Array,
    pub pc3: Float64Array,
    words_lower: Vec<String>,
}

impl EmbeddingFrame {
    pub fn new(
        words: StringArray,
        pc1: Float64Array,
        pc2: Float64Array,
        pc3: Float64Array,
    ) -> Result<Self> {
        let n = words.len();
        if pc1.len() != n || pc2.len() != n || pc3.len() != n {
            anyhow::bail!("embedding columns have mismatched lengths");
        }
        if words.null_count() > 0
            || pc1.null_count() > 0
            || pc2.null_count() > 0
            || pc3.null_count() > 0
        {
            anyhow::bail!("embedding columns must not contain nulls");
        }
        let words_lower = words.iter().flatten().map(str::to_lowercase).collect();
        Ok(Self {
            words,
            pc1,
            pc2,
            pc3,
            words_lower,
        })
    }

    pub fn from_points(points: &[(&str, f64, f64, f64)]) -> Result<Self> {
        Self::new(
            points.iter().map(|p| Some(p.0)).collect(),
            points.iter().map(|p| Some(p.1)).collect(),
            points.iter().map(|p| Some(p.2)).collect(),
            points.iter().map(|p| Some(p.3)).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Lower-cased labels, index-aligned with the columns.
    pub fn words_lower(&self) -> &[String] {
        &self.words_lower
    }

    pub fn schema() -> Schema {
        Schema::new(vec![
            Field::new("words", DataType::Utf8, false),
            Field::new("pc1", DataType::Float64, false),
            Field::new("pc2", DataType::Float64, false),
            Field::new("pc3", DataType::Float64, false),
        ])
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(self.words.clone()),
            Arc::new(self.pc1.clone()),
            Arc::new(self.pc2.clone()),
            Arc::new(self.pc3.clone()),
        ];
        RecordBatch::try_new(Arc::new(Self::schema()), arrays).context("building embedding batch")
    }

    pub fn from_record_batch(batch: &RecordBatch) -> Result<Self> {
        Self::new(
            column(batch, "words")?,
            column(batch, "pc1")?,
            column(batch, "pc2")?,
            column(batch, "pc3")?,
        )
    }
}

pub fn parse_embedding_csv(data: &[u8]) -> Result<EmbeddingFrame> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let header = rdr
        .headers()
        .map_err(|e| csv_error(DATASET, e))?
        .clone();
    let i_words = required_index(&header, DATASET, headers::WORDS)?;
    let i_pc1 = required_index(&header, DATASET, headers::PC1)?;
    let i_pc2 = required_index(&header, DATASET, headers::PC2)?;
    let i_pc3 = required_index(&header, DATASET, headers::PC3)?;

    let mut words = Vec::new();
    let mut pcs: [Vec<f64>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    let mut dropped = 0usize;

    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(DATASET, e))?;
        let label = record
            .get(i_words)
            .map(clean_str)
            .filter(|s| !s.is_empty());
        let coord = |i: usize| {
            record
                .get(i)
                .map(clean_str)
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|f| f.is_finite())
        };
        match (label, coord(i_pc1), coord(i_pc2), coord(i_pc3)) {
            (Some(w), Some(x), Some(y), Some(z)) => {
                words.push(w.to_string());
                pcs[0].push(x);
                pcs[1].push(y);
                pcs[2].push(z);
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, "embedding: rows with missing label or coordinate dropped");
    }
    info!(rows = words.len(), "parsed embedding");

    let [pc1, pc2, pc3] = pcs;
    EmbeddingFrame::new(
        StringArray::from(words),
        Float64Array::from(pc1),
        Float64Array::from(pc2),
        Float64Array::from(pc3),
    )
}
