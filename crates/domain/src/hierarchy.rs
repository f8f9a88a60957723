use std::str::FromStr;

use sentra_core::AppError;
use serde::{Deserialize, Serialize};

/// Controls how a team-role assignment radiates through the team tree.
///
/// Propagation is always evaluated relative to the team the assignment is
/// attached to, never to the team a check is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyMode {
    /// Hierarchy evaluation is switched off; the assignment grants its own
    /// team only.
    Disabled,
    /// The assignment explicitly grants its own team only.
    SelfOnly,
    /// The assignment grants its own team and every descendant team.
    Below,
    /// The assignment grants its own team and its sibling teams.
    Neighbours,
    /// The assignment grants its own team, descendants and siblings.
    BelowAndNeighbours,
}

impl HierarchyMode {
    /// Returns whether the mode grants descendant teams.
    #[must_use]
    pub fn grants_below(&self) -> bool {
        matches!(self, Self::Below | Self::BelowAndNeighbours)
    }

    /// Returns whether the mode grants sibling teams.
    #[must_use]
    pub fn grants_neighbours(&self) -> bool {
        matches!(self, Self::Neighbours | Self::BelowAndNeighbours)
    }

    /// Returns a stable storage value for this mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::SelfOnly => "self_only",
            Self::Below => "below",
            Self::Neighbours => "neighbours",
            Self::BelowAndNeighbours => "below_and_neighbours",
        }
    }
}

impl FromStr for HierarchyMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "disabled" => Ok(Self::Disabled),
            "self_only" => Ok(Self::SelfOnly),
            "below" => Ok(Self::Below),
            "neighbours" => Ok(Self::Neighbours),
            "below_and_neighbours" => Ok(Self::BelowAndNeighbours),
            _ => Err(AppError::Validation(format!(
                "unknown hierarchy mode value '{value}'"
            ))),
        }
    }
}
