// src/panels/influence.rs

use arrow::array::{Array, Float64Array, StringArray};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

use super::{GroupVariable, InfluenceMetric, Selector};
use crate::chart::{Chart, Curve, FacetPanel, FitMethod, FitPoint, Layout, Panel, SmoothChart};
use crate::dataset::{date_parser::from_date32, PostFrame};
use crate::fit::fit_curve;

pub const TITLE: &str = "Influence of Tweets";

const LOWESS_CAPTION: &str =
    "Locally weighted regression is noticeably slower than the default linear model.";

fn metric_column(posts: &PostFrame, metric: InfluenceMetric) -> &Float64Array {
    match metric {
        InfluenceMetric::Impact => posts.impact_plus_one(),
        InfluenceMetric::NumberOfRetweets => posts.retweets_plus_one(),
    }
}

fn group_column(posts: &PostFrame, group: GroupVariable) -> &StringArray {
    match group {
        GroupVariable::Gender => posts.gender_label(),
        GroupVariable::AccountType => &posts.columns().account_type,
        GroupVariable::Region => &posts.columns().region,
    }
}

/// One fitted curve per group value (sorted), each fitted on its own rows.
/// Rows with a null date, response or group value are skipped.
pub fn influence_curves(
    posts: &PostFrame,
    metric: InfluenceMetric,
    group: GroupVariable,
    method: FitMethod,
) -> Vec<Curve> {
    let response = metric_column(posts, metric);
    let groups = group_column(posts, group);
    let dates = &posts.columns().date;

    let mut by_group: BTreeMap<&str, (Vec<i32>, Vec<f64>)> = BTreeMap::new();
    for i in 0..posts.len() {
        if dates.is_null(i) || response.is_null(i) || groups.is_null(i) {
            continue;
        }
        let (days, ys) = by_group.entry(groups.value(i)).or_default();
        days.push(dates.value(i));
        ys.push(response.value(i));
    }

    let work: Vec<(&str, (Vec<i32>, Vec<f64>))> = by_group.into_iter().collect();
    work.into_par_iter()
        .map(|(name, (days, ys))| {
            debug!(group = name, n = days.len(), ?method, "fitting");
            let points = fit_curve(method, &days, &ys)
                .into_iter()
                .filter_map(|p| {
                    from_date32(p.day).map(|date| FitPoint {
                        date,
                        y: p.y,
                        lo: p.band.map(|b| b.0),
                        hi: p.band.map(|b| b.1),
                    })
                })
                .collect();
            Curve {
                group: name.to_string(),
                n: days.len(),
                points,
            }
        })
        .collect()
}

fn y_extent(curve: &Curve) -> Option<(f64, f64)> {
    curve
        .points
        .iter()
        .flat_map(|p| [Some(p.y), p.lo, p.hi])
        .flatten()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn as_range(extent: Option<(f64, f64)>) -> [f64; 2] {
    match extent {
        Some((lo, hi)) if hi > lo => [lo, hi],
        Some((v, _)) => [v - 0.5, v + 0.5],
        None => [0.0, 1.0],
    }
}

/// Shared axis when overlaid, one free y range per facet otherwise.
pub fn layout_for(curves: &[Curve], facet: bool) -> Layout {
    if !facet {
        let extent = curves
            .iter()
            .filter_map(y_extent)
            .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)));
        return Layout::Overlay {
            y_range: as_range(extent),
        };
    }
    let n = curves.len();
    let columns = ((n as f64).sqrt().ceil() as usize).max(1);
    let rows = n.div_ceil(columns).max(1);
    Layout::Facets {
        columns,
        rows,
        panels: curves
            .iter()
            .map(|c| FacetPanel {
                group: c.group.clone(),
                y_range: as_range(y_extent(c)),
            })
            .collect(),
    }
}

pub fn render(
    posts: &PostFrame,
    metric: InfluenceMetric,
    group: GroupVariable,
    facet: bool,
    nonlinear: bool,
) -> Panel {
    let method = if nonlinear {
        FitMethod::Lowess
    } else {
        FitMethod::Glm
    };
    let curves = influence_curves(posts, metric, group, method);
    if curves.is_empty() {
        return Panel::no_data(
            TITLE,
            format!(
                "no posts have a date, {} and {} value",
                metric.label(),
                group.label()
            ),
        );
    }

    let layout = layout_for(&curves, facet);
    let panel = Panel::chart(
        TITLE,
        Chart::Smooth(SmoothChart {
            title: "Date".to_string(),
            x_label: "Date".to_string(),
            y_label: metric.label().to_string(),
            method,
            group_label: group.label().to_string(),
            curves,
            layout,
        }),
    );
    if nonlinear {
        panel.with_caption(LOWESS_CAPTION)
    } else {
        panel
    }
}
