//! Declarative expectations about artifact configuration files
//!
//! In scenario files an entry is written as a single-key map:
//!
//! ```yaml
//! - must_contain: CONFIG_ZMK_STUDIO=y
//! - must_not_contain: CONFIG_ZMK_BATTERY_HISTORY_STUDIO_RPC
//! ```

use serde::{Deserialize, Serialize};

/// One assertion about a configuration file's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawExpectation", rename_all = "snake_case")]
pub enum Expectation {
    /// The literal text must appear somewhere in the file
    MustContain(String),
    /// The literal text must not appear anywhere in the file
    MustNotContain(String),
}

impl Expectation {
    pub fn contains(text: impl Into<String>) -> Self {
        Self::MustContain(text.into())
    }

    pub fn not_contains(text: impl Into<String>) -> Self {
        Self::MustNotContain(text.into())
    }

    /// The literal text this entry is about
    pub fn text(&self) -> &str {
        match self {
            Self::MustContain(text) | Self::MustNotContain(text) => text,
        }
    }

    /// Whether the entry holds for the given file content
    pub fn holds_for(&self, content: &str) -> bool {
        match self {
            Self::MustContain(text) => content.contains(text.as_str()),
            Self::MustNotContain(text) => !content.contains(text.as_str()),
        }
    }
}

/// Wire shape of an entry, validated into [`Expectation`]
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExpectation {
    must_contain: Option<String>,
    must_not_contain: Option<String>,
}

impl TryFrom<RawExpectation> for Expectation {
    type Error = String;

    fn try_from(raw: RawExpectation) -> Result<Self, Self::Error> {
        match (raw.must_contain, raw.must_not_contain) {
            (Some(text), None) | (None, Some(text)) if text.is_empty() => {
                Err("expectation text must not be empty".to_string())
            }
            (Some(text), None) => Ok(Self::MustContain(text)),
            (None, Some(text)) => Ok(Self::MustNotContain(text)),
            (Some(_), Some(_)) => Err(
                "expectation entry sets both 'must_contain' and 'must_not_contain'".to_string(),
            ),
            (None, None) => {
                Err("expectation entry needs 'must_contain' or 'must_not_contain'".to_string())
            }
        }
    }
}

/// Expectations for one named artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactExpectation {
    /// Artifact name, matching its directory under the build-output directory
    pub name: String,
    /// Entries in declaration order
    #[serde(default)]
    pub expect: Vec<Expectation>,
}

/// Ordered mapping from artifact name to its expectations
///
/// Declaration order is kept so failures are always reported in the same
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectationSet {
    artifacts: Vec<ArtifactExpectation>,
}

impl ExpectationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an artifact with its entries
    pub fn artifact<I>(mut self, name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = Expectation>,
    {
        self.artifacts.push(ArtifactExpectation {
            name: name.into(),
            expect: entries.into_iter().collect(),
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArtifactExpectation> {
        self.artifacts.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.iter().map(|a| a.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// First artifact name that is declared more than once
    pub fn duplicate_name(&self) -> Option<&str> {
        self.artifacts.iter().enumerate().find_map(|(i, a)| {
            self.artifacts[..i]
                .iter()
                .any(|prev| prev.name == a.name)
                .then_some(a.name.as_str())
        })
    }
}

impl<'a> IntoIterator for &'a ExpectationSet {
    type Item = &'a ArtifactExpectation;
    type IntoIter = std::slice::Iter<'a, ArtifactExpectation>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.iter()
    }
}
