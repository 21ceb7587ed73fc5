// src/panels/sentiment.rs

use arrow::array::{Array, StringArray};
use std::collections::{BTreeMap, BTreeSet};

use super::{Selector, SentimentVariable};
use crate::chart::{CategoryStack, Chart, Panel, Segment, StackedBarChart};
use crate::dataset::{date_parser::from_date32, PostFrame};

pub const TITLE: &str = "Tweets Sentiment";

const GENDER_CAPTION: &str = "Male and female refer to individual accounts; organisation refers \
to organisation accounts. Unknown means the account's gender could not be determined.";

/// Sentiment legend plus one stack per category value, both sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentBreakdown {
    pub sentiments: Vec<String>,
    pub categories: Vec<CategoryStack>,
}

fn category_at(posts: &PostFrame, variable: SentimentVariable, i: usize) -> Option<String> {
    let string_at = |arr: &StringArray| arr.is_valid(i).then(|| arr.value(i).to_string());
    let cols = posts.columns();
    match variable {
        SentimentVariable::Gender => string_at(posts.gender_label()),
        SentimentVariable::AccountType => string_at(&cols.account_type),
        SentimentVariable::Region => string_at(&cols.region),
        SentimentVariable::Date => cols
            .date
            .is_valid(i)
            .then(|| from_date32(cols.date.value(i)))
            .flatten()
            .map(|d| d.format("%Y-%m-%d").to_string()),
    }
}

/// Rows missing the sentiment or the selected variable are left out; each
/// remaining category's proportions sum to one.
pub fn sentiment_breakdown(posts: &PostFrame, variable: SentimentVariable) -> SentimentBreakdown {
    let sentiment = &posts.columns().sentiment;
    let mut counts: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    let mut legend: BTreeSet<String> = BTreeSet::new();

    for i in 0..posts.len() {
        if sentiment.is_null(i) {
            continue;
        }
        let Some(category) = category_at(posts, variable, i) else {
            continue;
        };
        let s = sentiment.value(i);
        if !legend.contains(s) {
            legend.insert(s.to_string());
        }
        *counts
            .entry(category)
            .or_default()
            .entry(s.to_string())
            .or_insert(0) += 1;
    }

    let sentiments: Vec<String> = legend.into_iter().collect();
    let categories = counts
        .into_iter()
        .map(|(category, per_sentiment)| {
            let total: u64 = per_sentiment.values().sum();
            let segments = sentiments
                .iter()
                .filter_map(|s| {
                    per_sentiment.get(s).map(|&count| Segment {
                        sentiment: s.clone(),
                        count,
                        proportion: count as f64 / total as f64,
                    })
                })
                .collect();
            CategoryStack {
                category,
                total,
                segments,
            }
        })
        .collect();

    SentimentBreakdown {
        sentiments,
        categories,
    }
}

pub fn render(posts: &PostFrame, variable: SentimentVariable) -> Panel {
    let breakdown = sentiment_breakdown(posts, variable);
    if breakdown.categories.is_empty() {
        return Panel::no_data(
            TITLE,
            format!("no posts have both a sentiment and a {} value", variable.label()),
        );
    }

    let panel = Panel::chart(
        TITLE,
        Chart::StackedBar(StackedBarChart {
            title: "Sentiment".to_string(),
            x_label: variable.label().to_string(),
            y_label: "Proportion".to_string(),
            sentiments: breakdown.sentiments,
            categories: breakdown.categories,
        }),
    );
    match variable {
        SentimentVariable::Gender => panel.with_caption(GENDER_CAPTION),
        _ => panel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::PostRow;
    use chrono::NaiveDate;

    fn row(gender: Option<&str>, region: Option<&str>, sentiment: Option<&str>, d: u32) -> PostRow {
        PostRow {
            gender: gender.map(str::to_string),
            region: region.map(str::to_string),
            account_type: Some("individual".to_string()),
            sentiment: sentiment.map(str::to_string),
            date: NaiveDate::from_ymd_opt(2020, 10, d),
            ..Default::default()
        }
    }

    fn frame() -> PostFrame {
        PostFrame::from_rows(&[
            row(Some("male"), Some("South"), Some("positive"), 1),
            row(Some("male"), Some("South"), Some("negative"), 1),
            row(Some("male"), None, Some("negative"), 2),
            row(Some("female"), Some("West"), Some("neutral"), 2),
            row(Some("organisation"), Some("West"), None, 3),
            row(None, Some("West"), Some("positive"), 3),
        ])
        .unwrap()
    }

    #[test]
    fn proportions_sum_to_one_per_category() {
        for variable in SentimentVariable::ALL {
            let breakdown = sentiment_breakdown(&frame(), *variable);
            assert!(!breakdown.categories.is_empty());
            for stack in &breakdown.categories {
                let sum: f64 = stack.segments.iter().map(|s| s.proportion).sum();
                assert!((sum - 1.0).abs() < 1e-12, "{:?} {}", variable, stack.category);
            }
        }
    }

    #[test]
    fn drops_missing_values_and_uses_relabelled_gender() {
        let breakdown = sentiment_breakdown(&frame(), SentimentVariable::Gender);
        let cats: Vec<&str> = breakdown.categories.iter().map(|c| c.category.as_str()).collect();
        // organisation only has a null sentiment, the null-gender row is dropped
        assert_eq!(cats, vec!["female (individual)", "male (individual)"]);
        assert_eq!(breakdown.sentiments, vec!["negative", "neutral", "positive"]);

        let male = &breakdown.categories[1];
        assert_eq!(male.total, 3);
        let neg = male.segments.iter().find(|s| s.sentiment == "negative").unwrap();
        assert_eq!(neg.count, 2);
        assert!((neg.proportion - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn date_categories_are_iso_strings() {
        let breakdown = sentiment_breakdown(&frame(), SentimentVariable::Date);
        let cats: Vec<&str> = breakdown.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(cats, vec!["2020-10-01", "2020-10-02", "2020-10-03"]);
    }

    #[test]
    fn gender_panel_carries_caption() {
        let panel = render(&frame(), SentimentVariable::Gender);
        assert!(panel.caption.is_some());
        let panel = render(&frame(), SentimentVariable::Region);
        assert!(panel.caption.is_none());
    }

    #[test]
    fn nothing_left_is_no_data() {
        let frame = PostFrame::from_rows(&[row(Some("male"), None, None, 1)]).unwrap();
        assert!(render(&frame, SentimentVariable::Gender).is_no_data());
    }
}
