use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── CATALOGUE ─────────────────────────────────────────────────────────────────
//

/// Competitive-event topics that sessions and the shared pool are keyed by.
pub const TOPICS: &[&str] = &[
    "Accounting",
    "Advanced Accounting",
    "Advertising",
    "Agribusiness",
    "Business Communication",
    "Business Law",
    "Computer Problem Solving",
    "Cybersecurity",
    "Data Analysis",
    "Data Science & AI",
    "Economics",
    "Entrepreneurship",
    "Healthcare Administration",
    "Human Resource Management",
    "Insurance & Risk Management",
    "Introduction to Business",
    "Introduction to IT",
    "Journalism",
    "Marketing",
    "Networking Infrastructures",
    "Organizational Leadership",
    "Personal Finance",
    "Project Management",
    "Public Administration & Management",
    "Public Speaking",
    "Real Estate",
    "Retail Management",
    "Securities & Investments",
    "Sports & Entertainment Management",
    "Supply Chain Management",
    "UX Design",
    "Website Design",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic cannot be empty")]
    Empty,

    #[error("unknown topic: {0}")]
    Unknown(String),
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// A topic from the fixed catalogue, always in its canonical spelling.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct Topic(&'static str);

impl Topic {
    /// Resolve a user-entered name to a catalogue topic.
    ///
    /// Matching ignores case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::Empty` for blank input and `TopicError::Unknown`
    /// when no catalogue entry matches.
    pub fn parse(raw: &str) -> Result<Self, TopicError> {
        let needle = raw.trim();
        if needle.is_empty() {
            return Err(TopicError::Empty);
        }
        TOPICS
            .iter()
            .copied()
            .find(|name| name.eq_ignore_ascii_case(needle))
            .map(Topic)
            .ok_or_else(|| TopicError::Unknown(needle.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Every topic in catalogue order.
    pub fn all() -> impl Iterator<Item = Topic> {
        TOPICS.iter().copied().map(Topic)
    }
}

/// Case-insensitive substring search over the catalogue, in catalogue order.
///
/// A blank term returns the whole catalogue.
#[must_use]
pub fn search(term: &str) -> Vec<Topic> {
    let term = term.trim().to_lowercase();
    Topic::all()
        .filter(|topic| term.is_empty() || topic.as_str().to_lowercase().contains(&term))
        .collect()
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({})", self.0)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Topic::parse(&value)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Topic::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl From<Topic> for String {
    fn from(value: Topic) -> Self {
        value.0.to_string()
    }
}
