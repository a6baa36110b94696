/// Sort column selection.
///
/// The selector token in the input is one of `Name`, `ID`, `Timestamp`
/// (case-sensitive). The same key drives both comparison and hashing for a
/// whole run.
use std::fmt;
use std::str::FromStr;

use super::error::SortError;

/// Which record field drives the sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    Name,
    Id,
    Timestamp,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [SortKey::Name, SortKey::Id, SortKey::Timestamp];

    /// The literal token used in input and output.
    pub fn token(self) -> &'static str {
        match self {
            SortKey::Name => "Name",
            SortKey::Id => "ID",
            SortKey::Timestamp => "Timestamp",
        }
    }
}

impl FromStr for SortKey {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Name" => Ok(SortKey::Name),
            "ID" => Ok(SortKey::Id),
            "Timestamp" => Ok(SortKey::Timestamp),
            other => Err(SortError::InvalidColumn(other.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
