// src/server.rs

use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use std::{collections::HashMap, convert::Infallible, sync::Arc, time::Instant};
use tokio::sync::OnceCell;
use tracing::{info, warn};
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::config::Config;
use crate::dataset::{self, Datasets};
use crate::error::DashboardError;
use crate::render::{render, render_panel, PanelKind, WidgetState};

/// Per-process session: configuration plus the datasets, loaded on first use
/// and then shared read-only. A failed load leaves the cell empty so the
/// next request tries again.
pub struct AppState {
    cfg: Config,
    client: Client,
    data: OnceCell<Arc<Datasets>>,
}

impl AppState {
    pub fn new(cfg: Config, client: Client) -> Self {
        Self {
            cfg,
            client,
            data: OnceCell::new(),
        }
    }

    pub fn with_datasets(cfg: Config, data: Datasets) -> Self {
        Self {
            cfg,
            client: Client::new(),
            data: OnceCell::new_with(Some(Arc::new(data))),
        }
    }

    pub async fn datasets(&self) -> Result<Arc<Datasets>> {
        self.data
            .get_or_try_init(|| async {
                dataset::load(&self.client, &self.cfg).await.map(Arc::new)
            })
            .await
            .cloned()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: Option<String>,
}

fn error_reply(err: &anyhow::Error) -> Response {
    let (status, label) = match DashboardError::find(err) {
        Some(DashboardError::InvalidSelection { .. }) => {
            (StatusCode::BAD_REQUEST, "invalid selection")
        }
        Some(DashboardError::DataUnavailable { .. }) => {
            (StatusCode::SERVICE_UNAVAILABLE, "data unavailable")
        }
        Some(
            DashboardError::MissingColumn { .. }
            | DashboardError::Parse { .. }
            | DashboardError::Snapshot { .. },
        ) => (StatusCode::SERVICE_UNAVAILABLE, "data malformed"),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
    };
    warn!(status = status.as_u16(), error = %format!("{:#}", err), "request failed");
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse {
            error: label.to_string(),
            details: Some(format!("{:#}", err)),
        }),
        status,
    )
    .into_response()
}

fn parse_flag(field: &str, raw: &str) -> Result<bool, DashboardError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(DashboardError::invalid(field, raw)),
    }
}

/// Widget state from query parameters; anything absent keeps its default.
pub fn state_from_query(q: &HashMap<String, String>) -> Result<WidgetState, DashboardError> {
    let mut state = WidgetState::default();
    if let Some(v) = q.get("keyword") {
        state.keyword = v.clone();
    }
    if let Some(v) = q.get("retweets") {
        state.retweets = v.parse()?;
    }
    if let Some(v) = q.get("variable") {
        state.sentiment_variable = v.parse()?;
    }
    if let Some(v) = q.get("words") {
        state.words = v.clone();
    }
    if let Some(v) = q.get("metric") {
        state.metric = v.parse()?;
    }
    if let Some(v) = q.get("group") {
        state.group = v.parse()?;
    }
    if let Some(v) = q.get("facet") {
        state.facet = parse_flag("facet", v)?;
    }
    if let Some(v) = q.get("nonlinear") {
        state.nonlinear = parse_flag("nonlinear", v)?;
    }
    Ok(state)
}

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "vaxdash"
    })))
}

async fn render_all(state: WidgetState, app: Arc<AppState>) -> Result<Response, Rejection> {
    let start = Instant::now();
    let data = match app.datasets().await {
        Ok(d) => d,
        Err(e) => return Ok(error_reply(&e)),
    };
    match tokio::task::spawn_blocking(move || render(&state, &data)).await {
        Ok(dash) => {
            info!(elapsed = ?start.elapsed(), "render");
            Ok(warp::reply::json(&dash).into_response())
        }
        Err(e) => Ok(error_reply(&e.into())),
    }
}

async fn render_one(
    kind: String,
    query: HashMap<String, String>,
    app: Arc<AppState>,
) -> Result<Response, Rejection> {
    let start = Instant::now();
    let parsed = kind
        .parse::<PanelKind>()
        .and_then(|k| state_from_query(&query).map(|s| (k, s)));
    let (kind, state) = match parsed {
        Ok(v) => v,
        Err(e) => return Ok(error_reply(&e.into())),
    };
    let data = match app.datasets().await {
        Ok(d) => d,
        Err(e) => return Ok(error_reply(&e)),
    };
    match tokio::task::spawn_blocking(move || render_panel(kind, &state, &data)).await {
        Ok(panel) => {
            info!(panel = ?kind, elapsed = ?start.elapsed(), "render panel");
            Ok(warp::reply::json(&panel).into_response())
        }
        Err(e) => Ok(error_reply(&e.into())),
    }
}

fn with_app(app: Arc<AppState>) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || app.clone())
}

/// `GET /health`, `POST /render`, `GET /panels/<kind>?…`
pub fn routes(app: Arc<AppState>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(health_check);

    let render_route = warp::path("render")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_app(app.clone()))
        .and_then(render_all);

    let panel_route = warp::path!("panels" / String)
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_app(app))
        .and_then(render_one);

    health.or(render_route).or(panel_route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{EmbeddingFrame, PostFrame, PostRow};
    use chrono::NaiveDate;

    fn app() -> Arc<AppState> {
        let posts = PostFrame::from_rows(&[
            PostRow {
                text: Some("great vaccine".into()),
                retweets: Some(3),
                impact: Some(1.0),
                date: NaiveDate::from_ymd_opt(2020, 9, 1),
                gender: Some("male".into()),
                account_type: Some("individual".into()),
                region: Some("South".into()),
                sentiment: Some("positive".into()),
            },
            PostRow {
                text: Some("bad vaccine".into()),
                retweets: Some(5),
                impact: Some(4.0),
                date: NaiveDate::from_ymd_opt(2020, 9, 2),
                gender: Some("female".into()),
                account_type: Some("individual".into()),
                region: Some("South".into()),
                sentiment: Some("negative".into()),
            },
        ])
        .unwrap();
        let embedding = EmbeddingFrame::from_points(&[("trump", 0.1, 0.2, 0.3)]).unwrap();
        let cfg = Config::from_lookup(|_| None).unwrap();
        Arc::new(AppState::with_datasets(cfg, Datasets::new(posts, embedding)))
    }

    fn body_json(resp: &warp::http::Response<warp::hyper::body::Bytes>) -> serde_json::Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let resp = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&routes(app()))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(&resp)["status"], "healthy");
    }

    #[tokio::test]
    async fn keyword_panel_from_query() {
        let resp = warp::test::request()
            .method("GET")
            .path("/panels/keyword?keyword=great&retweets=including")
            .reply(&routes(app()))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(&resp);
        assert_eq!(json["body"]["chart"]["points"][0]["value"], 3);
        assert_eq!(json["body"]["chart"]["points"][0]["date"], "2020-09-01");
    }

    #[tokio::test]
    async fn full_render_from_json_body() {
        let resp = warp::test::request()
            .method("POST")
            .path("/render")
            .json(&serde_json::json!({ "keyword": "zzz", "words": "trump" }))
            .reply(&routes(app()))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(&resp);
        assert_eq!(json["keyword"]["body"]["state"], "no_data");
        assert_eq!(json["relations"]["body"]["state"], "chart");
    }

    #[tokio::test]
    async fn bad_selection_is_400() {
        let resp = warp::test::request()
            .method("GET")
            .path("/panels/influence?group=Date")
            .reply(&routes(app()))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(&resp)["error"], "invalid selection");
    }

    #[tokio::test]
    async fn unavailable_data_is_503_and_retried() {
        let mut cfg = Config::from_lookup(|_| None).unwrap();
        cfg.posts_source = "/definitely/not/here/posts.csv".into();
        cfg.embedding_source = "/definitely/not/here/embedding.csv".into();
        let app = Arc::new(AppState::new(cfg, Client::new()));
        let filter = routes(app.clone());

        for _ in 0..2 {
            let resp = warp::test::request()
                .method("GET")
                .path("/panels/sentiment")
                .reply(&filter)
                .await;
            assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body_json(&resp)["error"], "data unavailable");
        }
        assert!(app.data.get().is_none());
    }

    #[tokio::test]
    async fn malformed_source_is_503_with_its_own_label() {
        let dir = tempfile::tempdir().unwrap();
        let posts = dir.path().join("posts.csv");
        let embedding = dir.path().join("embedding.csv");
        std::fs::write(&posts, "Date,Full Text\n2020-09-01,hello\n").unwrap();
        std::fs::write(&embedding, "words,PC1,PC2,PC3\ntrump,0.1,0.2,0.3\n").unwrap();

        let mut cfg = Config::from_lookup(|_| None).unwrap();
        cfg.posts_source = posts.display().to_string();
        cfg.embedding_source = embedding.display().to_string();
        let app = Arc::new(AppState::new(cfg, Client::new()));

        let resp = warp::test::request()
            .method("GET")
            .path("/panels/keyword")
            .reply(&routes(app))
            .await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(&resp);
        assert_eq!(json["error"], "data malformed");
        assert!(json["details"].as_str().unwrap().contains("Twitter Retweets"));
    }

    #[test]
    fn query_flags() {
        let q: HashMap<String, String> = [("facet", "yes"), ("nonlinear", "0")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let state = state_from_query(&q).unwrap();
        assert!(state.facet);
        assert!(!state.nonlinear);
    }
}
