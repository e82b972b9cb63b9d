use serde::{Deserialize, Serialize};

use super::tier::TierThresholds;

/// Normalized disposal intent used to look up a credit rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKey {
    Recycle,
    Donate,
    Repair,
    Advice,
}

impl IntentKey {
    /// Map a questionnaire answer to its rate key. Only the exact answer strings match;
    /// anything else recycles.
    pub fn normalize(intent: &str) -> Self {
        match intent {
            "Repair it" => Self::Repair,
            "Donate it" => Self::Donate,
            "Get advice" => Self::Advice,
            _ => Self::Recycle,
        }
    }
}

/// Credits awarded per disposal intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRates {
    pub recycle: i64,
    pub donate: i64,
    pub repair: i64,
    pub advice: i64,
}

impl Default for CreditRates {
    fn default() -> Self {
        Self {
            recycle: 40,
            donate: 30,
            repair: 20,
            advice: 20,
        }
    }
}

impl CreditRates {
    pub const fn rate(&self, key: IntentKey) -> i64 {
        match key {
            IntentKey::Recycle => self.recycle,
            IntentKey::Donate => self.donate,
            IntentKey::Repair => self.repair,
            IntentKey::Advice => self.advice,
        }
    }

    pub fn rate_for(&self, intent: &str) -> i64 {
        self.rate(IntentKey::normalize(intent))
    }
}

/// Runtime knobs shared by every engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineSettings {
    pub rates: CreditRates,
    pub tiers: TierThresholds,
}
