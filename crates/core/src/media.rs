use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The three catalog sections exposed by the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaClass {
    /// Live TV channels.
    Live,
    /// Video-on-demand movies.
    Movies,
    /// Episodic series.
    Series,
}

impl MediaClass {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Movies => "movies",
            Self::Series => "series",
        }
    }

    /// Whether the section changes frequently (live lineups) as opposed to
    /// slow-moving VOD catalogs.
    #[must_use]
    pub fn is_volatile(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl fmt::Display for MediaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" | "tv" | "channels" => Ok(Self::Live),
            "movies" | "movie" | "vod" => Ok(Self::Movies),
            "series" | "shows" => Ok(Self::Series),
            _ => Err(CoreError::UnknownMediaClass(s.to_owned())),
        }
    }
}
