use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{RedemptionType, Reward, RewardCategory, RewardId, Stock};
use super::error::CreditsError;
use super::tier::Tier;

/// Admin-supplied reward fields; the catalog assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: RewardCategory,
    pub credit_cost: i64,
    pub min_tier: Tier,
    pub stock: Stock,
    pub redemption_type: RedemptionType,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub terms_and_conditions: Option<String>,
}

impl RewardDraft {
    fn validate(&self) -> Result<(), CreditsError> {
        if self.name.trim().is_empty() {
            return Err(CreditsError::Validation(
                "reward name must not be empty".to_string(),
            ));
        }
        if self.credit_cost < 0 {
            return Err(CreditsError::Validation(format!(
                "reward credit cost must be zero or more, got {}",
                self.credit_cost
            )));
        }
        Ok(())
    }

    fn into_reward(self, id: RewardId) -> Reward {
        Reward {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            category: self.category,
            credit_cost: self.credit_cost,
            min_tier: self.min_tier,
            stock: self.stock,
            redemption_type: self.redemption_type,
            image_url: self.image_url,
            terms_and_conditions: self.terms_and_conditions,
        }
    }
}

/// Inventory of redeemable rewards.
#[derive(Debug, Clone, Default)]
pub struct RewardsCatalog {
    rewards: BTreeMap<RewardId, Reward>,
}

impl RewardsCatalog {
    pub fn from_rewards(rewards: impl IntoIterator<Item = Reward>) -> Self {
        Self {
            rewards: rewards
                .into_iter()
                .map(|reward| (reward.id.clone(), reward))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reward> {
        self.rewards.values()
    }

    pub fn get(&self, id: &RewardId) -> Result<&Reward, CreditsError> {
        self.rewards
            .get(id)
            .ok_or_else(|| CreditsError::not_found("reward", id))
    }

    pub fn create(&mut self, id: RewardId, draft: RewardDraft) -> Result<Reward, CreditsError> {
        draft.validate()?;
        if self.rewards.contains_key(&id) {
            return Err(CreditsError::Validation(format!(
                "reward '{id}' already exists"
            )));
        }
        let reward = draft.into_reward(id);
        self.rewards.insert(reward.id.clone(), reward.clone());
        Ok(reward)
    }

    pub fn update(&mut self, id: &RewardId, draft: RewardDraft) -> Result<Reward, CreditsError> {
        draft.validate()?;
        let slot = self
            .rewards
            .get_mut(id)
            .ok_or_else(|| CreditsError::not_found("reward", id))?;
        *slot = draft.into_reward(id.clone());
        Ok(slot.clone())
    }

    /// Past redemptions keep their own copy of the name and cost.
    pub fn remove(&mut self, id: &RewardId) -> Result<Reward, CreditsError> {
        self.rewards
            .remove(id)
            .ok_or_else(|| CreditsError::not_found("reward", id))
    }

    /// Take one unit of stock. Callers check availability first.
    pub(crate) fn take_one(&mut self, id: &RewardId) -> Result<Stock, CreditsError> {
        let reward = self
            .rewards
            .get_mut(id)
            .ok_or_else(|| CreditsError::not_found("reward", id))?;
        reward.stock = reward.stock.decremented();
        Ok(reward.stock)
    }

    /// Rewards a holder of `tier` may claim right now.
    pub fn available_for(&self, tier: Tier) -> Vec<Reward> {
        self.rewards
            .values()
            .filter(|reward| reward.min_tier <= tier && reward.stock.is_available())
            .cloned()
            .collect()
    }
}
