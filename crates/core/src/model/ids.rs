use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier for a question, unique within an exam module.
///
/// Batch files carry ids either as JSON strings or numbers; both decode to
/// the same textual id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Creates a new `QuestionId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying id text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for QuestionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = LooseText::deserialize(deserializer)?;
        Ok(Self(raw.into_string()))
    }
}

/// Category of a question within its exam module (1-based).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CategoryId(u32);

impl CategoryId {
    /// Creates a new `CategoryId`
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying u32 value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl<'de> Deserialize<'de> for CategoryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = LooseText::deserialize(deserializer)?.into_string();
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of a textbook note, e.g. `1_137`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Creates a new `NoteId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ─── Loose JSON scalars ────────────────────────────────────────────────────────

/// A JSON scalar that may arrive as a string or a number.
///
/// Question data is inconsistent about quoting (`"2"` vs `2`), and answer
/// comparison must tolerate either form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum LooseText {
    Text(String),
    Int(i64),
    Float(f64),
    Null(()),
}

impl LooseText {
    pub(crate) fn into_string(self) -> String {
        match self {
            LooseText::Text(s) => s,
            LooseText::Int(n) => n.to_string(),
            LooseText::Float(f) => f.to_string(),
            LooseText::Null(()) => String::new(),
        }
    }
}

pub(crate) fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(LooseText::deserialize(deserializer)?.into_string())
}

pub(crate) fn loose_optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let raw = Option::<LooseText>::deserialize(deserializer)?;
    Ok(raw
        .map(LooseText::into_string)
        .filter(|s| !s.trim().is_empty()))
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Debug for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CategoryId({})", self.0)
    }
}

impl fmt::Debug for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NoteId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for QuestionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError {
                kind: "QuestionId".to_string(),
            });
        }
        Ok(QuestionId::new(trimmed))
    }
}

impl FromStr for CategoryId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .filter(|v| *v > 0)
            .map(CategoryId::new)
            .ok_or_else(|| ParseIdError {
                kind: "CategoryId".to_string(),
            })
    }
}

impl FromStr for NoteId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError {
                kind: "NoteId".to_string(),
            });
        }
        Ok(NoteId::new(trimmed))
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
