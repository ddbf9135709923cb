//! Scrim action types and their scoring domains.
//!
//! [`ScrimActionType`] is the closed set of events the match engine can score.
//! Each variant has a stable numeric code used by persisted rule rows and a
//! derived [`ActionDomain`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Every scoreable (and control) action a scrim match can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScrimActionType {
    None,

    // Objective
    FirstBaseCapture,
    SubsequentBaseCapture,
    PointControl,
    PointDefend,

    // Infantry
    InfantryKillInfantry,
    InfantryKillMax,
    InfantryTeamkillInfantry,
    InfantryTeamkillMax,
    InfantrySuicide,
    InfantryKillVehicle,

    // MAX
    MaxKillInfantry,
    MaxKillMax,
    MaxTeamkillMax,
    MaxTeamkillInfantry,
    MaxSuicide,
    MaxKillVehicle,

    // Support
    ReviveInfantry,
    ReviveMax,
    DamageAssist,
    UtilityAssist,
    GrenadeAssist,
    SpotAssist,

    // Control
    Login,
    Logout,
}

/// Scoring domain an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionDomain {
    Objective,
    Infantry,
    Max,
    Support,
    Other,
}

impl ScrimActionType {
    /// All action types in declaration order.
    pub const ALL: [ScrimActionType; 25] = [
        ScrimActionType::None,
        ScrimActionType::FirstBaseCapture,
        ScrimActionType::SubsequentBaseCapture,
        ScrimActionType::PointControl,
        ScrimActionType::PointDefend,
        ScrimActionType::InfantryKillInfantry,
        ScrimActionType::InfantryKillMax,
        ScrimActionType::InfantryTeamkillInfantry,
        ScrimActionType::InfantryTeamkillMax,
        ScrimActionType::InfantrySuicide,
        ScrimActionType::InfantryKillVehicle,
        ScrimActionType::MaxKillInfantry,
        ScrimActionType::MaxKillMax,
        ScrimActionType::MaxTeamkillMax,
        ScrimActionType::MaxTeamkillInfantry,
        ScrimActionType::MaxSuicide,
        ScrimActionType::MaxKillVehicle,
        ScrimActionType::ReviveInfantry,
        ScrimActionType::ReviveMax,
        ScrimActionType::DamageAssist,
        ScrimActionType::UtilityAssist,
        ScrimActionType::GrenadeAssist,
        ScrimActionType::SpotAssist,
        ScrimActionType::Login,
        ScrimActionType::Logout,
    ];

    /// Stable numeric code. Codes are grouped in blocks per domain.
    pub fn code(self) -> i32 {
        match self {
            ScrimActionType::None => 0,
            ScrimActionType::FirstBaseCapture => 10,
            ScrimActionType::SubsequentBaseCapture => 11,
            ScrimActionType::PointControl => 12,
            ScrimActionType::PointDefend => 13,
            ScrimActionType::InfantryKillInfantry => 100,
            ScrimActionType::InfantryKillMax => 101,
            ScrimActionType::InfantryTeamkillInfantry => 102,
            ScrimActionType::InfantryTeamkillMax => 103,
            ScrimActionType::InfantrySuicide => 104,
            ScrimActionType::InfantryKillVehicle => 105,
            ScrimActionType::MaxKillInfantry => 200,
            ScrimActionType::MaxKillMax => 201,
            ScrimActionType::MaxTeamkillMax => 202,
            ScrimActionType::MaxTeamkillInfantry => 203,
            ScrimActionType::MaxSuicide => 204,
            ScrimActionType::MaxKillVehicle => 205,
            ScrimActionType::ReviveInfantry => 300,
            ScrimActionType::ReviveMax => 301,
            ScrimActionType::DamageAssist => 310,
            ScrimActionType::UtilityAssist => 311,
            ScrimActionType::GrenadeAssist => 312,
            ScrimActionType::SpotAssist => 313,
            ScrimActionType::Login => 9000,
            ScrimActionType::Logout => 9001,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.code() == code)
    }

    /// Classify the action into its scoring domain.
    pub fn domain(self) -> ActionDomain {
        match self {
            ScrimActionType::FirstBaseCapture
            | ScrimActionType::SubsequentBaseCapture
            | ScrimActionType::PointControl
            | ScrimActionType::PointDefend => ActionDomain::Objective,

            ScrimActionType::InfantryKillInfantry
            | ScrimActionType::InfantryKillMax
            | ScrimActionType::InfantryTeamkillInfantry
            | ScrimActionType::InfantryTeamkillMax
            | ScrimActionType::InfantrySuicide
            | ScrimActionType::InfantryKillVehicle => ActionDomain::Infantry,

            ScrimActionType::MaxKillInfantry
            | ScrimActionType::MaxKillMax
            | ScrimActionType::MaxTeamkillMax
            | ScrimActionType::MaxTeamkillInfantry
            | ScrimActionType::MaxSuicide
            | ScrimActionType::MaxKillVehicle => ActionDomain::Max,

            ScrimActionType::ReviveInfantry
            | ScrimActionType::ReviveMax
            | ScrimActionType::DamageAssist
            | ScrimActionType::UtilityAssist
            | ScrimActionType::GrenadeAssist
            | ScrimActionType::SpotAssist => ActionDomain::Support,

            ScrimActionType::None | ScrimActionType::Login | ScrimActionType::Logout => {
                ActionDomain::Other
            }
        }
    }

    /// Control actions never carry an action rule.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            ScrimActionType::None | ScrimActionType::Login | ScrimActionType::Logout
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ScrimActionType::None => "None",
            ScrimActionType::FirstBaseCapture => "FirstBaseCapture",
            ScrimActionType::SubsequentBaseCapture => "SubsequentBaseCapture",
            ScrimActionType::PointControl => "PointControl",
            ScrimActionType::PointDefend => "PointDefend",
            ScrimActionType::InfantryKillInfantry => "InfantryKillInfantry",
            ScrimActionType::InfantryKillMax => "InfantryKillMax",
            ScrimActionType::InfantryTeamkillInfantry => "InfantryTeamkillInfantry",
            ScrimActionType::InfantryTeamkillMax => "InfantryTeamkillMax",
            ScrimActionType::InfantrySuicide => "InfantrySuicide",
            ScrimActionType::InfantryKillVehicle => "InfantryKillVehicle",
            ScrimActionType::MaxKillInfantry => "MaxKillInfantry",
            ScrimActionType::MaxKillMax => "MaxKillMax",
            ScrimActionType::MaxTeamkillMax => "MaxTeamkillMax",
            ScrimActionType::MaxTeamkillInfantry => "MaxTeamkillInfantry",
            ScrimActionType::MaxSuicide => "MaxSuicide",
            ScrimActionType::MaxKillVehicle => "MaxKillVehicle",
            ScrimActionType::ReviveInfantry => "ReviveInfantry",
            ScrimActionType::ReviveMax => "ReviveMax",
            ScrimActionType::DamageAssist => "DamageAssist",
            ScrimActionType::UtilityAssist => "UtilityAssist",
            ScrimActionType::GrenadeAssist => "GrenadeAssist",
            ScrimActionType::SpotAssist => "SpotAssist",
            ScrimActionType::Login => "Login",
            ScrimActionType::Logout => "Logout",
        }
    }

    /// Human-readable description: the variant name split into words.
    pub fn description(self) -> String {
        let name = self.name();
        let mut out = String::with_capacity(name.len() + 4);
        let mut prev_lower = false;
        for c in name.chars() {
            if c.is_uppercase() && prev_lower {
                out.push(' ');
            }
            prev_lower = c.is_lowercase();
            out.push(c);
        }
        out
    }

    pub fn info(self) -> ScrimActionInfo {
        ScrimActionInfo {
            action: self,
            name: self.name().to_string(),
            description: self.description(),
            domain: self.domain(),
        }
    }
}

impl fmt::Display for ScrimActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i32> for ScrimActionType {
    type Error = CoreError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(CoreError::UnknownActionCode(code))
    }
}

impl fmt::Display for ActionDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionDomain::Objective => write!(f, "Objective"),
            ActionDomain::Infantry => write!(f, "Infantry"),
            ActionDomain::Max => write!(f, "Max"),
            ActionDomain::Support => write!(f, "Support"),
            ActionDomain::Other => write!(f, "Other"),
        }
    }
}

/// Catalog model describing one action type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrimActionInfo {
    pub action: ScrimActionType,
    pub name: String,
    pub description: String,
    pub domain: ActionDomain,
}
