// src/panels/keyword.rs

use arrow::array::Array;
use std::collections::BTreeMap;

use super::RetweetMode;
use crate::chart::{Chart, LineChart, LinePoint, Panel};
use crate::dataset::{date_parser::from_date32, PostFrame};

pub const TITLE: &str = "Keyword Trends";

/// Per-date totals for posts whose lower-cased text contains `keyword`
/// (also lower-cased). An empty keyword selects every post. Dates with no
/// matching post are absent from the result, not zero.
pub fn keyword_trend(posts: &PostFrame, keyword: &str, mode: RetweetMode) -> Vec<LinePoint> {
    let needle = keyword.to_lowercase();
    let cols = posts.columns();
    let text = posts.text_lower();

    let mut per_day: BTreeMap<i32, i64> = BTreeMap::new();
    for i in 0..posts.len() {
        if cols.date.is_null(i) {
            continue;
        }
        let hit = needle.is_empty() || (text.is_valid(i) && text.value(i).contains(&needle));
        if !hit {
            continue;
        }
        let value = match mode {
            RetweetMode::Excluding => 1,
            RetweetMode::Including if cols.retweets.is_valid(i) => cols.retweets.value(i),
            RetweetMode::Including => 0,
        };
        *per_day.entry(cols.date.value(i)).or_insert(0) += value;
    }

    per_day
        .into_iter()
        .filter_map(|(day, value)| from_date32(day).map(|date| LinePoint { date, value }))
        .collect()
}

pub fn render(posts: &PostFrame, keyword: &str, mode: RetweetMode) -> Panel {
    let points = keyword_trend(posts, keyword, mode);
    if points.is_empty() {
        let reason = if keyword.is_empty() {
            "the dataset has no dated posts".to_string()
        } else {
            format!("no posts contain \"{}\"", keyword)
        };
        return Panel::no_data(TITLE, reason);
    }

    let title = match mode {
        RetweetMode::Excluding => "Excluding retweets",
        RetweetMode::Including => "Including retweets",
    };
    Panel::chart(
        TITLE,
        Chart::Line(LineChart {
            title: title.to_string(),
            x_label: "Date".to_string(),
            y_label: "Number of Tweets".to_string(),
            points,
        }),
    )
    .with_caption("The dataset is a 10% sample; actual volumes are roughly ten times higher.")
}
