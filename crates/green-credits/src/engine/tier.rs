use std::fmt;

use serde::{Deserialize, Serialize};

/// Balance-derived status level. Declaration order is the gate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    pub const fn ordered() -> [Self; 4] {
        [Self::Bronze, Self::Silver, Self::Gold, Self::Platinum]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Bronze => Some(Self::Silver),
            Self::Silver => Some(Self::Gold),
            Self::Gold => Some(Self::Platinum),
            Self::Platinum => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive lower bounds for every tier above bronze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    silver: i64,
    gold: i64,
    platinum: i64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            silver: 500,
            gold: 1_500,
            platinum: 3_000,
        }
    }
}

/// Distance from a balance to the next tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTier {
    pub tier: Tier,
    pub points_needed: i64,
}

impl TierThresholds {
    /// Returns `None` unless `0 < silver < gold < platinum`.
    pub fn new(silver: i64, gold: i64, platinum: i64) -> Option<Self> {
        (0 < silver && silver < gold && gold < platinum).then_some(Self {
            silver,
            gold,
            platinum,
        })
    }

    pub const fn silver(&self) -> i64 {
        self.silver
    }

    pub const fn gold(&self) -> i64 {
        self.gold
    }

    pub const fn platinum(&self) -> i64 {
        self.platinum
    }

    pub const fn floor(&self, tier: Tier) -> i64 {
        match tier {
            Tier::Bronze => 0,
            Tier::Silver => self.silver,
            Tier::Gold => self.gold,
            Tier::Platinum => self.platinum,
        }
    }

    pub fn tier_of(&self, points: i64) -> Tier {
        if points >= self.platinum {
            Tier::Platinum
        } else if points >= self.gold {
            Tier::Gold
        } else if points >= self.silver {
            Tier::Silver
        } else {
            Tier::Bronze
        }
    }

    /// `None` means the balance is already at the top tier.
    pub fn points_to_next_tier(&self, points: i64) -> Option<NextTier> {
        let next = self.tier_of(points).next()?;
        Some(NextTier {
            tier: next,
            points_needed: self.floor(next) - points,
        })
    }

    /// Progress through the current tier band, 0..=100.
    pub fn progress_percent(&self, points: i64) -> u8 {
        let current = self.tier_of(points);
        let Some(next) = current.next() else {
            return 100;
        };
        let floor = i128::from(self.floor(current));
        let span = i128::from(self.floor(next)) - floor;
        let into = (i128::from(points) - floor).clamp(0, span);
        // widened so configured thresholds near i64::MAX cannot overflow
        ((into * 100) / span) as u8
    }
}

/// Tier for `points` under the default thresholds.
pub fn tier_of(points: i64) -> Tier {
    TierThresholds::default().tier_of(points)
}

/// Gap to the next tier under the default thresholds.
pub fn points_to_next_tier(points: i64) -> Option<NextTier> {
    TierThresholds::default().points_to_next_tier(points)
}
