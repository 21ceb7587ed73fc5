// src/dataset/posts.rs

use anyhow::{Context, Result};
use arrow::{
    array::{Array, ArrayRef, Date32Array, Float64Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use csv::ReaderBuilder;
use std::sync::Arc;
use tracing::{info, warn};

use super::date_parser::{clean_str, parse_date, to_date32};
use super::{column, csv_error, required_index, shift_by_one};

pub const DATASET: &str = "posts";

/// Header names as exported by the collection pipeline.
pub mod headers {
    pub const TEXT: &str = "Full Text";
    pub const RETWEETS: &str = "Twitter Retweets";
    pub const IMPACT: &str = "Impact";
    pub const DATE: &str = "Date";
    pub const GENDER: &str = "Gender";
    pub const ACCOUNT_TYPE: &str = "Account Type";
    pub const REGION: &str = "Region";
    pub const SENTIMENT: &str = "Sentiment";
}

/// The source columns of the primary dataset, exactly as loaded.
#[derive(Debug, Clone)]
pub struct PostColumns {
    pub text: StringArray,
    pub retweets: Int64Array,
    pub impact: Float64Array,
    pub date: Date32Array,
    pub gender: StringArray,
    pub account_type: StringArray,
    pub region: StringArray,
    pub sentiment: StringArray,
}

/// One post, used to assemble small frames by hand.
#[derive(Debug, Clone, Default)]
pub struct PostRow {
    pub text: Option<String>,
    pub retweets: Option<i64>,
    pub impact: Option<f64>,
    pub date: Option<chrono::NaiveDate>,
    pub gender: Option<String>,
    pub account_type: Option<String>,
    pub region: Option<String>,
    pub sentiment: Option<String>,
}

/// Primary dataset plus the read-only views derived from it at load time.
/// Nothing here is mutated after construction.
#[derive(Debug, Clone)]
pub struct PostFrame {
    cols: PostColumns,
    text_lower: StringArray,
    gender_label: StringArray,
    impact_plus_one: Float64Array,
    retweets_plus_one: Float64Array,
}

/// Individual accounts carry a bare gender; spell that out so the
/// category reads differently from organisation accounts.
pub fn relabel_gender(raw: &str) -> &str {
    match raw {
        "male" => "male (individual)",
        "female" => "female (individual)",
        other => other,
    }
}

impl PostFrame {
    pub fn new(cols: PostColumns) -> Result<Self> {
        let n = cols.text.len();
        let lens = [
            cols.retweets.len(),
            cols.impact.len(),
            cols.date.len(),
            cols.gender.len(),
            cols.account_type.len(),
            cols.region.len(),
            cols.sentiment.len(),
        ];
        if lens.iter().any(|&l| l != n) {
            anyhow::bail!("post columns have mismatched lengths: text={} others={:?}", n, lens);
        }

        let text_lower: StringArray = cols
            .text
            .iter()
            .map(|o| o.map(str::to_lowercase))
            .collect();
        let gender_label: StringArray = cols
            .gender
            .iter()
            .map(|o| o.map(relabel_gender))
            .collect();
        let impact_plus_one = shift_by_one(cols.impact.iter());
        let retweets_plus_one = shift_by_one(cols.retweets.iter().map(|o| o.map(|v| v as f64)));

        Ok(Self {
            cols,
            text_lower,
            gender_label,
            impact_plus_one,
            retweets_plus_one,
        })
    }

    pub fn from_rows(rows: &[PostRow]) -> Result<Self> {
        Self::new(PostColumns {
            text: rows.iter().map(|r| r.text.as_deref()).collect(),
            retweets: rows.iter().map(|r| r.retweets).collect(),
            impact: rows.iter().map(|r| r.impact).collect(),
            date: rows.iter().map(|r| r.date.map(to_date32)).collect(),
            gender: rows.iter().map(|r| r.gender.as_deref()).collect(),
            account_type: rows.iter().map(|r| r.account_type.as_deref()).collect(),
            region: rows.iter().map(|r| r.region.as_deref()).collect(),
            sentiment: rows.iter().map(|r| r.sentiment.as_deref()).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.cols.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn columns(&self) -> &PostColumns {
        &self.cols
    }

    pub fn text_lower(&self) -> &StringArray {
        &self.text_lower
    }

    pub fn gender_label(&self) -> &StringArray {
        &self.gender_label
    }

    pub fn impact_plus_one(&self) -> &Float64Array {
        &self.impact_plus_one
    }

    pub fn retweets_plus_one(&self) -> &Float64Array {
        &self.retweets_plus_one
    }

    pub fn schema() -> Schema {
        Schema::new(vec![
            Field::new("text", DataType::Utf8, true),
            Field::new("retweets", DataType::Int64, true),
            Field::new("impact", DataType::Float64, true),
            Field::new("date", DataType::Date32, true),
            Field::new("gender", DataType::Utf8, true),
            Field::new("account_type", DataType::Utf8, true),
            Field::new("region", DataType::Utf8, true),
            Field::new("sentiment", DataType::Utf8, true),
        ])
    }

    /// Source columns only; derived views are rebuilt on the way back in.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let c = &self.cols;
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(c.text.clone()),
            Arc::new(c.retweets.clone()),
            Arc::new(c.impact.clone()),
            Arc::new(c.date.clone()),
            Arc::new(c.gender.clone()),
            Arc::new(c.account_type.clone()),
            Arc::new(c.region.clone()),
            Arc::new(c.sentiment.clone()),
        ];
        RecordBatch::try_new(Arc::new(Self::schema()), arrays).context("building posts batch")
    }

    pub fn from_record_batch(batch: &RecordBatch) -> Result<Self> {
        Self::new(PostColumns {
            text: column(batch, "text")?,
            retweets: column(batch, "retweets")?,
            impact: column(batch, "impact")?,
            date: column(batch, "date")?,
            gender: column(batch, "gender")?,
            account_type: column(batch, "account_type")?,
            region: column(batch, "region")?,
            sentiment: column(batch, "sentiment")?,
        })
    }
}

/// Integer counts sometimes arrive float-formatted (`3.0`) when the exporter
/// had missing values in the column.
fn parse_count(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

/// Parse the primary CSV (header row required, extra columns ignored).
/// Unparseable numbers and dates become nulls and are reported once.
pub fn parse_posts_csv(data: &[u8]) -> Result<PostFrame> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let header = rdr
        .headers()
        .map_err(|e| csv_error(DATASET, e))?
        .clone();
    let i_text = required_index(&header, DATASET, headers::TEXT)?;
    let i_retweets = required_index(&header, DATASET, headers::RETWEETS)?;
    let i_impact = required_index(&header, DATASET, headers::IMPACT)?;
    let i_date = required_index(&header, DATASET, headers::DATE)?;
    let i_gender = required_index(&header, DATASET, headers::GENDER)?;
    let i_account = required_index(&header, DATASET, headers::ACCOUNT_TYPE)?;
    let i_region = required_index(&header, DATASET, headers::REGION)?;
    let i_sentiment = required_index(&header, DATASET, headers::SENTIMENT)?;

    let mut text = Vec::new();
    let mut retweets = Vec::new();
    let mut impact = Vec::new();
    let mut date = Vec::new();
    let mut gender = Vec::new();
    let mut account_type = Vec::new();
    let mut region = Vec::new();
    let mut sentiment = Vec::new();
    let mut bad_numbers = 0usize;
    let mut bad_dates = 0usize;

    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(DATASET, e))?;
        let field = |i: usize| record.get(i).map(clean_str).filter(|s| !s.is_empty());

        text.push(
            record
                .get(i_text)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
        );

        let rt = field(i_retweets).map(|s| (s, parse_count(s)));
        if matches!(rt, Some((_, None))) {
            bad_numbers += 1;
        }
        retweets.push(rt.and_then(|(_, v)| v));

        let imp = field(i_impact).map(|s| (s, s.parse::<f64>().ok().filter(|f| f.is_finite())));
        if matches!(imp, Some((_, None))) {
            bad_numbers += 1;
        }
        impact.push(imp.and_then(|(_, v)| v));

        let d = field(i_date).map(|s| (s, parse_date(s)));
        if matches!(d, Some((_, None))) {
            bad_dates += 1;
        }
        date.push(d.and_then(|(_, v)| v).map(to_date32));

        gender.push(field(i_gender).map(str::to_string));
        account_type.push(field(i_account).map(str::to_string));
        region.push(field(i_region).map(str::to_string));
        sentiment.push(field(i_sentiment).map(str::to_string));
    }

    if bad_numbers > 0 || bad_dates > 0 {
        warn!(bad_numbers, bad_dates, "posts: unparseable values loaded as nulls");
    }
    info!(rows = text.len(), "parsed posts");

    PostFrame::new(PostColumns {
        text: StringArray::from(text),
        retweets: Int64Array::from(retweets),
        impact: Float64Array::from(impact),
        date: Date32Array::from(date),
        gender: StringArray::from(gender),
        account_type: StringArray::from(account_type),
        region: StringArray::from(region),
        sentiment: StringArray::from(sentiment),
    })
}
