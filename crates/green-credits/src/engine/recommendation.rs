use serde::{Deserialize, Serialize};

use super::domain::DisposalAction;
use super::rates::{CreditRates, IntentKey};

const WORKS_PERFECTLY: &str = "Yes, perfectly";

/// Questionnaire answers that drive the recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAnswers {
    pub device_condition: String,
    pub intent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: DisposalAction,
    pub credits: i64,
}

/// Stateless mapping from answers to a disposal action and its credit value.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine {
    rates: CreditRates,
}

impl RecommendationEngine {
    pub fn new(rates: CreditRates) -> Self {
        Self { rates }
    }

    pub fn recommend(&self, answers: &DeviceAnswers) -> Recommendation {
        let intent = IntentKey::normalize(&answers.intent);
        Recommendation {
            action: disposal_action(&answers.device_condition, intent),
            credits: self.rates.rate(intent),
        }
    }
}

// First match wins: an explicit repair request beats a working device.
fn disposal_action(condition: &str, intent: IntentKey) -> DisposalAction {
    if intent == IntentKey::Repair {
        DisposalAction::Repair
    } else if condition == WORKS_PERFECTLY || intent == IntentKey::Donate {
        DisposalAction::Donate
    } else {
        DisposalAction::Recycle
    }
}
