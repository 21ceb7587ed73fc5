// src/panels/mod.rs

pub mod influence;
pub mod keyword;
pub mod relations;
pub mod sentiment;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::DashboardError;

/// A fixed-choice widget value. Parsing accepts the display label or any
/// alias, ignoring case, spaces, dashes and underscores.
pub trait Selector: Sized + Copy + 'static {
    const FIELD: &'static str;
    const ALL: &'static [Self];

    fn label(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn parse_selector(raw: &str) -> Result<Self, DashboardError> {
        let wanted = normalise(raw);
        Self::ALL
            .iter()
            .copied()
            .find(|v| {
                normalise(v.label()) == wanted || v.aliases().iter().any(|a| normalise(a) == wanted)
            })
            .ok_or_else(|| DashboardError::invalid(Self::FIELD, raw))
    }
}

fn normalise(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether the keyword trend counts posts or sums their retweets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RetweetMode {
    #[default]
    Excluding,
    Including,
}

impl Selector for RetweetMode {
    const FIELD: &'static str = "retweets";
    const ALL: &'static [Self] = &[RetweetMode::Excluding, RetweetMode::Including];

    fn label(&self) -> &'static str {
        match self {
            RetweetMode::Excluding => "Excluding retweet",
            RetweetMode::Including => "Including retweet",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            RetweetMode::Excluding => &["excluding", "exclude", "excluding retweets"],
            RetweetMode::Including => &["including", "include", "including retweets"],
        }
    }
}

/// Categorical variable for the sentiment breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SentimentVariable {
    #[default]
    Gender,
    Date,
    AccountType,
    Region,
}

impl Selector for SentimentVariable {
    const FIELD: &'static str = "variable";
    const ALL: &'static [Self] = &[
        SentimentVariable::Gender,
        SentimentVariable::Date,
        SentimentVariable::AccountType,
        SentimentVariable::Region,
    ];

    fn label(&self) -> &'static str {
        match self {
            SentimentVariable::Gender => "Gender",
            SentimentVariable::Date => "Date",
            SentimentVariable::AccountType => "Account Type",
            SentimentVariable::Region => "Region",
        }
    }
}

/// Categorical variable that splits the influence curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GroupVariable {
    #[default]
    Gender,
    AccountType,
    Region,
}

impl Selector for GroupVariable {
    const FIELD: &'static str = "group";
    const ALL: &'static [Self] = &[
        GroupVariable::Gender,
        GroupVariable::AccountType,
        GroupVariable::Region,
    ];

    fn label(&self) -> &'static str {
        match self {
            GroupVariable::Gender => "Gender",
            GroupVariable::AccountType => "Account Type",
            GroupVariable::Region => "Region",
        }
    }
}

/// Response for the influence fit; both are shifted by one at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InfluenceMetric {
    #[default]
    Impact,
    NumberOfRetweets,
}

impl Selector for InfluenceMetric {
    const FIELD: &'static str = "metric";
    const ALL: &'static [Self] = &[InfluenceMetric::Impact, InfluenceMetric::NumberOfRetweets];

    fn label(&self) -> &'static str {
        match self {
            InfluenceMetric::Impact => "Impact",
            InfluenceMetric::NumberOfRetweets => "Number of retweets",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            InfluenceMetric::Impact => &[],
            InfluenceMetric::NumberOfRetweets => &["retweets"],
        }
    }
}

macro_rules! selector_conversions {
    ($($ty:ty),*) => {$(
        impl FromStr for $ty {
            type Err = DashboardError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty as Selector>::parse_selector(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = DashboardError;
            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$ty> for String {
            fn from(v: $ty) -> String {
                v.label().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    )*};
}

selector_conversions!(RetweetMode, SentimentVariable, GroupVariable, InfluenceMetric);
