use std::fmt;

use serde::{Deserialize, Serialize};

/// Partner skin a session was opened under. Only the offer catalog reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    #[default]
    Standard,
    Eon,
    Bg,
    Existing,
    Success,
    OpenRent,
}

impl Scenario {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Eon => "eon",
            Self::Bg => "bg",
            Self::Existing => "existing",
            Self::Success => "success",
            Self::OpenRent => "openrent",
        }
    }

    /// Unrecognised names fall back to the standard skin.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "eon" | "e.on" => Self::Eon,
            "bg" | "britishgas" | "british-gas" => Self::Bg,
            "existing" => Self::Existing,
            "success" => Self::Success,
            "openrent" | "open-rent" => Self::OpenRent,
            _ => Self::Standard,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
