use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How an application was built, which decides what gets deployed.
///
/// - `Ssr`: a function renders each request; static output goes to a CDN bucket
/// - `Ssg`: every page is pre-rendered under `ssg/`
/// - `Spa`: one shell document under `spa/` with client-side routing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Ssr,
    Ssg,
    Spa,
}

impl BuildMode {
    pub const ALL: [BuildMode; 3] = [BuildMode::Ssr, BuildMode::Ssg, BuildMode::Spa];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ssr => "ssr",
            Self::Ssg => "ssg",
            Self::Spa => "spa",
        }
    }

    /// Whether this mode needs a compute unit (and therefore an artifact bundle).
    pub fn needs_compute(self) -> bool {
        matches!(self, Self::Ssr)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ssr" => Ok(Self::Ssr),
            "ssg" => Ok(Self::Ssg),
            "spa" => Ok(Self::Spa),
            other => Err(crate::Error::UnknownMode(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_display() {
        for mode in BuildMode::ALL {
            assert_eq!(mode.as_str().parse::<BuildMode>().unwrap(), mode);
        }
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert!("SSR".parse::<BuildMode>().is_err());
    }

    #[test]
    fn only_ssr_needs_compute() {
        assert!(BuildMode::Ssr.needs_compute());
        assert!(!BuildMode::Ssg.needs_compute());
        assert!(!BuildMode::Spa.needs_compute());
    }
}
