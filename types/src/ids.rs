use std::fmt;

use url::Url;

/// Version counter of an open text buffer, as reported by the host.
///
/// Monotonically non-decreasing for a given URI while the buffer is open.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct DocumentVersion(i32);

impl DocumentVersion {
    #[must_use]
    pub fn new(version: i32) -> Self {
        Self(version)
    }

    #[must_use]
    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for DocumentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of the analyzer rule that produced a finding.
///
/// May be empty: analyzers are not required to name the rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Stable identifier for an open text buffer: its URI plus the version the
/// host last reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId {
    uri: Url,
    version: DocumentVersion,
}

impl DocumentId {
    #[must_use]
    pub fn new(uri: Url, version: DocumentVersion) -> Self {
        Self { uri, version }
    }

    #[must_use]
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    #[must_use]
    pub fn version(&self) -> DocumentVersion {
        self.version
    }

    /// Only `file:` documents can be handed to an analyzer.
    #[must_use]
    pub fn is_on_disk(&self) -> bool {
        self.uri.scheme() == "file"
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.uri, self.version)
    }
}
