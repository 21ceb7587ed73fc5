// src/chart.rs
//
// Serialisable chart specifications. A front end draws these; nothing here
// knows about pixels beyond axis ranges and facet grids.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One rendered panel: a title plus either a chart or an explicit empty state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub body: PanelBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelBody {
    Chart { chart: Chart },
    NoData { reason: String },
}

impl Panel {
    pub fn chart(title: impl Into<String>, chart: Chart) -> Self {
        Self {
            title: title.into(),
            caption: None,
            body: PanelBody::Chart { chart },
        }
    }

    pub fn no_data(title: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            caption: None,
            body: PanelBody::NoData {
                reason: reason.into(),
            },
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn as_chart(&self) -> Option<&Chart> {
        match &self.body {
            PanelBody::Chart { chart } => Some(chart),
            PanelBody::NoData { .. } => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self.body, PanelBody::NoData { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chart {
    Line(LineChart),
    StackedBar(StackedBarChart),
    Scatter3d(Scatter3dChart),
    Smooth(SmoothChart),
}

// ─── line ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Ascending by date, one point per date that had matches.
    pub points: Vec<LinePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePoint {
    pub date: NaiveDate,
    pub value: i64,
}

// ─── 100% stacked bar ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedBarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Legend order.
    pub sentiments: Vec<String>,
    pub categories: Vec<CategoryStack>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStack {
    pub category: String,
    pub total: u64,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub sentiment: String,
    pub count: u64,
    pub proportion: f64,
}

// ─── 3-D scatter ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scatter3dChart {
    pub points: Vec<LabeledPoint>,
    pub axis_range: [f64; 2],
    pub nticks: u32,
    pub text_position: String,
    /// Requested words with no row in the embedding table.
    pub unmatched: Vec<String>,
    pub ignored_empty_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

// ─── fitted curves ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMethod {
    Glm,
    Lowess,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub method: FitMethod,
    pub group_label: String,
    pub curves: Vec<Curve>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub group: String,
    /// Observations behind this curve.
    pub n: usize,
    pub points: Vec<FitPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitPoint {
    pub date: NaiveDate,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lo: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum Layout {
    /// All curves on one shared axis.
    Overlay { y_range: [f64; 2] },
    /// One subplot per group, each with its own y range.
    Facets {
        columns: usize,
        rows: usize,
        panels: Vec<FacetPanel>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetPanel {
    pub group: String,
    pub y_range: [f64; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_serialises_with_state_tag() {
        let panel = Panel::no_data("Keyword Trends", "no posts contain \"zzz\"");
        let json = serde_json::to_value(&panel).unwrap();
        assert_eq!(json["body"]["state"], "no_data");
        assert!(json.get("caption").is_none());
    }

    #[test]
    fn chart_serialises_kind_and_iso_dates() {
        let chart = Chart::Line(LineChart {
            title: "Excluding retweets".into(),
            x_label: "Date".into(),
            y_label: "Number of Tweets".into(),
            points: vec![LinePoint {
                date: NaiveDate::from_ymd_opt(2020, 9, 1).unwrap(),
                value: 1,
            }],
        });
        let json = serde_json::to_value(Panel::chart("Keyword Trends", chart)).unwrap();
        assert_eq!(json["body"]["state"], "chart");
        assert_eq!(json["body"]["chart"]["kind"], "line");
        assert_eq!(json["body"]["chart"]["points"][0]["date"], "2020-09-01");
    }
}
