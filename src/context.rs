//! Running classification state inferred while scanning a document.
//!
//! A [`Context`] is owned by exactly one ingestion pass. Every text item is
//! fed through [`Context::observe`]; the resulting state is carried across
//! chunk boundaries and snapshotted into each chunk's metadata when the chunk
//! is finalized.
//!
//! # Update rules
//!
//! - **Jurisdiction**: the first code (in [`Jurisdiction::ALL`] order) whose
//!   word-boundary pattern matches the text. Texts with no match leave the
//!   previous value in place.
//! - **Section**: only re-evaluated when the same text also matched a
//!   jurisdiction. `RISE` is checked before `REGULAR`.
//! - **Topic**: a single slot. The first rule in [`DOCUMENT_TOPIC_RULES`] that
//!   matches wins for this text and overwrites whatever an earlier text set.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Supported jurisdiction codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Jurisdiction {
    Oh,
    Md,
    Nj,
    Il,
    Ny,
    Nv,
    Ma,
}

impl Jurisdiction {
    /// Match precedence. Earlier entries win when a text names several codes.
    pub const ALL: [Jurisdiction; 7] = [
        Jurisdiction::Oh,
        Jurisdiction::Md,
        Jurisdiction::Nj,
        Jurisdiction::Il,
        Jurisdiction::Ny,
        Jurisdiction::Nv,
        Jurisdiction::Ma,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Jurisdiction::Oh => "OH",
            Jurisdiction::Md => "MD",
            Jurisdiction::Nj => "NJ",
            Jurisdiction::Il => "IL",
            Jurisdiction::Ny => "NY",
            Jurisdiction::Nv => "NV",
            Jurisdiction::Ma => "MA",
        }
    }

    /// Pattern applied to upper-cased document text.
    fn document_pattern(self) -> &'static str {
        match self {
            Jurisdiction::Oh => r"\b(?:OHIO|OH)\b",
            Jurisdiction::Md => r"\b(?:MARYLAND|MD)\b",
            Jurisdiction::Nj => r"\b(?:NEW\s+JERSEY|NJ)\b",
            Jurisdiction::Il => r"\b(?:ILLINOIS|IL)\b",
            Jurisdiction::Ny => r"\b(?:NEW\s+YORK|NY)\b",
            Jurisdiction::Nv => r"\b(?:NEVADA|NV)\b",
            Jurisdiction::Ma => r"\b(?:MASSACHUSETTS|MA)\b",
        }
    }

    /// Pattern applied to lower-cased query text.
    fn query_pattern(self) -> &'static str {
        match self {
            Jurisdiction::Oh => r"\b(?:oh|ohio)\b",
            Jurisdiction::Md => r"\b(?:md|maryland)\b",
            Jurisdiction::Nj => r"\b(?:nj|new jersey|jersey)\b",
            Jurisdiction::Il => r"\b(?:il|illinois)\b",
            Jurisdiction::Ny => r"\b(?:ny|new york)\b",
            Jurisdiction::Nv => r"\b(?:nv|nevada)\b",
            Jurisdiction::Ma => r"\b(?:ma|massachusetts)\b",
        }
    }

    /// First jurisdiction whose document pattern matches `upper`.
    pub fn detect_in_document(upper: &str) -> Option<Jurisdiction> {
        first_match(&DOCUMENT_PATTERNS, upper)
    }

    /// First jurisdiction whose query pattern matches `lower`.
    pub fn detect_in_query(lower: &str) -> Option<Jurisdiction> {
        first_match(&QUERY_PATTERNS, lower)
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

static DOCUMENT_PATTERNS: LazyLock<Vec<(Jurisdiction, Regex)>> =
    LazyLock::new(|| compile(Jurisdiction::document_pattern));
static QUERY_PATTERNS: LazyLock<Vec<(Jurisdiction, Regex)>> =
    LazyLock::new(|| compile(Jurisdiction::query_pattern));

fn compile(pattern: fn(Jurisdiction) -> &'static str) -> Vec<(Jurisdiction, Regex)> {
    Jurisdiction::ALL
        .iter()
        .map(|j| {
            let re = Regex::new(pattern(*j)).expect("jurisdiction patterns are valid");
            (*j, re)
        })
        .collect()
}

fn first_match(patterns: &[(Jurisdiction, Regex)], text: &str) -> Option<Jurisdiction> {
    patterns
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(j, _)| *j)
}

/// Document section. `Rise` is the internal program, `Regular` the wholesale one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Section {
    Rise,
    Regular,
}

impl Section {
    pub fn code(self) -> &'static str {
        match self {
            Section::Rise => "RISE",
            Section::Regular => "REGULAR",
        }
    }

    fn detect_in_document(upper: &str) -> Option<Section> {
        if upper.contains("RISE") {
            Some(Section::Rise)
        } else if upper.contains("REGULAR") {
            Some(Section::Regular)
        } else {
            None
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Topic tag. Documents carry at most one; queries may carry several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Topic {
    Pricing,
    Batteries,
    BatchSub,
    DeliveryDate,
    OrderLimit,
    LessAvailable,
}

impl Topic {
    pub fn code(self) -> &'static str {
        match self {
            Topic::Pricing => "PRICING",
            Topic::Batteries => "BATTERIES",
            Topic::BatchSub => "BATCH_SUB",
            Topic::DeliveryDate => "DELIVERY_DATE",
            Topic::OrderLimit => "ORDER_LIMIT",
            Topic::LessAvailable => "LESS_AVAILABLE",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Ordered topic rules for document text (upper-cased substrings).
pub const DOCUMENT_TOPIC_RULES: &[(Topic, &[&str])] = &[
    (Topic::Pricing, &["PRICING", "MENU PRICE"]),
    (Topic::Batteries, &["BATTER"]),
    (Topic::BatchSub, &["BATCH SUB"]),
    (Topic::DeliveryDate, &["DELIVERY DATE"]),
    (Topic::OrderLimit, &["ORDER LIMIT"]),
];

/// Classification state threaded through one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    pub jurisdiction: Option<Jurisdiction>,
    pub section: Option<Section>,
    pub topic: Option<Topic>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-evaluate the state against one text item.
    pub fn observe(&mut self, text: &str) {
        let upper = text.to_uppercase();

        if let Some(jurisdiction) = Jurisdiction::detect_in_document(&upper) {
            self.jurisdiction = Some(jurisdiction);
            if let Some(section) = Section::detect_in_document(&upper) {
                self.section = Some(section);
            }
        }

        let topic = DOCUMENT_TOPIC_RULES
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| upper.contains(n)))
            .map(|(topic, _)| *topic);
        if topic.is_some() {
            self.topic = topic;
        }
    }

    pub fn states(&self) -> Vec<Jurisdiction> {
        self.jurisdiction.into_iter().collect()
    }

    pub fn sections(&self) -> Vec<Section> {
        self.section.into_iter().collect()
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.topic.into_iter().collect()
    }
}
