use serde::Deserialize;

/// Which offset wins when a civil time occurs twice (DST fall-back).
///
/// `Later` picks the post-transition offset, which is the later of the two
/// instants. `Earlier` picks the pre-transition offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldPolicy {
    Earlier,
    #[default]
    Later,
}

impl FoldPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Earlier => "earlier",
            Self::Later => "later",
        }
    }
}

impl std::fmt::Display for FoldPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FoldPolicy {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "earlier" => Ok(Self::Earlier),
            "later" => Ok(Self::Later),
            other => Err(crate::error::CoreError::InvalidInput(format!(
                "unknown fold policy `{other}`"
            ))),
        }
    }
}
