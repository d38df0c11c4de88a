use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The outcome of a compliance check.
///
/// Variants are declared from best to worst so that the derived ordering is
/// the severity ordering: `Compliant < Warning < Failure`.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
pub enum Status {
    #[default]
    Compliant,
    Warning,
    Failure,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown compliance status {0:?}; expected one of Compliant, Warning, Failure")]
pub struct InvalidStatus(pub String);

// === impl Status ===

impl Status {
    pub const ALL: [Status; 3] = [Status::Compliant, Status::Warning, Status::Failure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "Compliant",
            Self::Warning => "Warning",
            Self::Failure => "Failure",
        }
    }

    /// Returns the worst of the given statuses, or `Compliant` if there are
    /// none.
    pub fn worst(statuses: impl IntoIterator<Item = Status>) -> Status {
        statuses.into_iter().fold(Status::Compliant, Ord::max)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a status name, ignoring ASCII case and surrounding whitespace.
/// Anything other than the three known names is rejected.
impl FromStr for Status {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}
