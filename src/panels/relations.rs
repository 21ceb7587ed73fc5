// src/panels/relations.rs

use std::collections::HashSet;

use crate::chart::{Chart, LabeledPoint, Panel, Scatter3dChart};
use crate::dataset::EmbeddingFrame;

pub const TITLE: &str = "Word Relations";
pub const DEFAULT_WORDS: &str = "trump, biden, democrat, republican";

const CAPTION: &str = "Coordinates come from a word2vec model after L2 normalisation and \
dimension reduction. Closer words tend to be more strongly related; direction matters too.";

/// Normalised keyword list: trimmed, lower-cased, de-duplicated in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordList {
    pub tokens: Vec<String>,
    /// Empty entries such as the one after a trailing comma.
    pub ignored_empty: usize,
}

pub fn parse_word_list(raw: &str) -> WordList {
    if raw.trim().is_empty() {
        return WordList {
            tokens: Vec::new(),
            ignored_empty: 0,
        };
    }

    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    let mut ignored_empty = 0;
    for part in raw.split(',') {
        let token = part.trim().to_lowercase();
        if token.is_empty() {
            ignored_empty += 1;
        } else if seen.insert(token.clone()) {
            tokens.push(token);
        }
    }
    WordList {
        tokens,
        ignored_empty,
    }
}

/// Embedding rows whose lower-cased label equals one of the tokens, in table
/// order, plus the tokens that matched nothing.
pub fn lookup(embedding: &EmbeddingFrame, words: &WordList) -> (Vec<LabeledPoint>, Vec<String>) {
    let wanted: HashSet<&str> = words.tokens.iter().map(String::as_str).collect();
    let mut found: HashSet<&str> = HashSet::new();
    let mut points = Vec::new();

    for (i, label) in embedding.words_lower().iter().enumerate() {
        if let Some(&token) = wanted.get(label.as_str()) {
            found.insert(token);
            points.push(LabeledPoint {
                label: embedding.words.value(i).to_string(),
                x: embedding.pc1.value(i),
                y: embedding.pc2.value(i),
                z: embedding.pc3.value(i),
            });
        }
    }

    let unmatched = words
        .tokens
        .iter()
        .filter(|t| !found.contains(t.as_str()))
        .cloned()
        .collect();
    (points, unmatched)
}

pub fn render(embedding: &EmbeddingFrame, raw_words: &str) -> Panel {
    let words = parse_word_list(raw_words);
    if words.tokens.is_empty() {
        return Panel::no_data(TITLE, "no words entered");
    }

    let (points, unmatched) = lookup(embedding, &words);
    if points.is_empty() {
        return Panel::no_data(
            TITLE,
            format!("none of [{}] are in the vocabulary", words.tokens.join(", ")),
        );
    }

    Panel::chart(
        TITLE,
        Chart::Scatter3d(Scatter3dChart {
            points,
            axis_range: [-1.0, 1.0],
            nticks: 4,
            text_position: "top center".to_string(),
            unmatched,
            ignored_empty_tokens: words.ignored_empty,
        }),
    )
    .with_caption(CAPTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> EmbeddingFrame {
        EmbeddingFrame::from_points(&[
            ("trump", 0.5, 0.1, -0.2),
            ("democrat", -0.3, 0.4, 0.0),
            ("Republican", 0.2, -0.6, 0.3),
        ])
        .unwrap()
    }

    #[test]
    fn tokens_are_trimmed_lowercased_and_deduplicated() {
        let words = parse_word_list(" Trump ,biden,, TRUMP ,");
        assert_eq!(words.tokens, vec!["trump", "biden"]);
        assert_eq!(words.ignored_empty, 2);
        assert_eq!(parse_word_list("   ").tokens.len(), 0);
    }

    #[test]
    fn duplicate_and_cased_tokens_resolve_to_one_row() {
        let (many, unmatched) = lookup(&vocab(), &parse_word_list("trump, biden, TRUMP"));
        let (one, _) = lookup(&vocab(), &parse_word_list("trump"));
        assert_eq!(many, one);
        assert_eq!(many.len(), 1);
        assert_eq!(unmatched, vec!["biden"]);
    }

    #[test]
    fn label_match_is_case_insensitive_on_the_table_side() {
        let (points, _) = lookup(&vocab(), &parse_word_list("republican"));
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].label, "Republican");
    }

    #[test]
    fn render_states() {
        assert!(render(&vocab(), "").is_no_data());
        assert!(render(&vocab(), "biden, harris").is_no_data());

        let panel = render(&vocab(), DEFAULT_WORDS);
        match panel.as_chart() {
            Some(Chart::Scatter3d(c)) => {
                assert_eq!(c.points.len(), 3);
                assert_eq!(c.unmatched, vec!["biden"]);
                assert_eq!(c.axis_range, [-1.0, 1.0]);
            }
            other => panic!("unexpected chart {:?}", other),
        }
    }
}
