// src/render.rs

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, instrument};

use crate::chart::Panel;
use crate::dataset::Datasets;
use crate::error::DashboardError;
use crate::panels::{
    influence, keyword, relations, sentiment, GroupVariable, InfluenceMetric, RetweetMode,
    SentimentVariable,
};

/// Every widget value on the page. Missing fields take the page defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetState {
    pub retweets: RetweetMode,
    pub keyword: String,
    pub sentiment_variable: SentimentVariable,
    pub words: String,
    pub metric: InfluenceMetric,
    pub group: GroupVariable,
    /// Free y scales: one subplot per group.
    pub facet: bool,
    /// LOWESS instead of the linear model.
    pub nonlinear: bool,
}

impl Default for WidgetState {
    fn default() -> Self {
        Self {
            retweets: RetweetMode::default(),
            keyword: String::new(),
            sentiment_variable: SentimentVariable::default(),
            words: relations::DEFAULT_WORDS.to_string(),
            metric: InfluenceMetric::default(),
            group: GroupVariable::default(),
            facet: false,
            nonlinear: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub keyword: Panel,
    pub sentiment: Panel,
    pub relations: Panel,
    pub influence: Panel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    Keyword,
    Sentiment,
    Relations,
    Influence,
}

impl FromStr for PanelKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" | "keywords" => Ok(PanelKind::Keyword),
            "sentiment" => Ok(PanelKind::Sentiment),
            "relations" | "words" => Ok(PanelKind::Relations),
            "influence" => Ok(PanelKind::Influence),
            _ => Err(DashboardError::invalid("panel", s)),
        }
    }
}

/// Render one panel from the widget state. Reads `data`, never writes it.
pub fn render_panel(kind: PanelKind, state: &WidgetState, data: &Datasets) -> Panel {
    match kind {
        PanelKind::Keyword => keyword::render(&data.posts, &state.keyword, state.retweets),
        PanelKind::Sentiment => sentiment::render(&data.posts, state.sentiment_variable),
        PanelKind::Relations => relations::render(&data.embedding, &state.words),
        PanelKind::Influence => influence::render(
            &data.posts,
            state.metric,
            state.group,
            state.facet,
            state.nonlinear,
        ),
    }
}

/// Render all four panels. The influence fit is the slow one, so it runs
/// alongside the other three.
#[instrument(level = "info", skip_all, fields(nonlinear = state.nonlinear))]
pub fn render(state: &WidgetState, data: &Datasets) -> Dashboard {
    let start = std::time::Instant::now();
    let (influence, (keyword, (sentiment, relations))) = rayon::join(
        || render_panel(PanelKind::Influence, state, data),
        || {
            rayon::join(
                || render_panel(PanelKind::Keyword, state, data),
                || {
                    rayon::join(
                        || render_panel(PanelKind::Sentiment, state, data),
                        || render_panel(PanelKind::Relations, state, data),
                    )
                },
            )
        },
    );
    info!(elapsed = ?start.elapsed(), "rendered dashboard");
    Dashboard {
        keyword,
        sentiment,
        relations,
        influence,
    }
}
