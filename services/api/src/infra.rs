use green_credits::engine::{
    ActivityError, ActivityLog, ActivityPublisher, Collection, CreditsError, GreenCreditsService,
    JsonFileAdapter, MemoryAdapter, PersistenceAdapter, RedemptionType, RewardCategory,
    RewardDraft, Stock, StoreError, Tier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Store selected at start-up: JSON files when a data directory is configured.
#[derive(Debug, Clone)]
pub(crate) enum ConfiguredStore {
    Memory(MemoryAdapter),
    Files(JsonFileAdapter),
}

impl ConfiguredStore {
    pub(crate) fn open(data_dir: Option<&Path>) -> Result<Self, StoreError> {
        match data_dir {
            Some(dir) => {
                let store = JsonFileAdapter::open(dir)?;
                info!(data_dir = %store.root().display(), "using JSON file store");
                Ok(Self::Files(store))
            }
            None => {
                info!("using in-memory store; data is lost on shutdown");
                Ok(Self::Memory(MemoryAdapter::default()))
            }
        }
    }
}

impl PersistenceAdapter for ConfiguredStore {
    fn load(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        match self {
            Self::Memory(store) => store.load(collection),
            Self::Files(store) => store.load(collection),
        }
    }

    fn save(&self, collection: Collection, records: Vec<Value>) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.save(collection, records),
            Self::Files(store) => store.save(collection, records),
        }
    }
}

/// Server-side publisher; activity entries already live in the store, so this only logs them.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TracingActivitySink;

impl ActivityPublisher for TracingActivitySink {
    fn publish(&self, entry: ActivityLog) -> Result<(), ActivityError> {
        debug!(
            target: "green_credits::activity",
            id = %entry.id,
            action = %entry.action,
            actor = %entry.actor_id,
            target_id = %entry.target_id,
            "{}",
            entry.details
        );
        Ok(())
    }
}

fn reward(
    name: &str,
    description: &str,
    category: RewardCategory,
    credit_cost: i64,
    min_tier: Tier,
    stock: Stock,
    redemption_type: RedemptionType,
) -> RewardDraft {
    RewardDraft {
        name: name.to_string(),
        description: description.to_string(),
        category,
        credit_cost,
        min_tier,
        stock,
        redemption_type,
        image_url: String::new(),
        terms_and_conditions: None,
    }
}

pub(crate) fn default_catalog() -> Vec<RewardDraft> {
    vec![
        reward(
            "Green Champion badge",
            "Profile badge for your first verified drop-off",
            RewardCategory::Recognition,
            0,
            Tier::Bronze,
            Stock::Unlimited,
            RedemptionType::Instant,
        ),
        reward(
            "Campus cafe voucher",
            "One hot drink at any campus cafe",
            RewardCategory::CampusPerk,
            150,
            Tier::Bronze,
            Stock::Limited(200),
            RedemptionType::Instant,
        ),
        reward(
            "Reusable bottle",
            "Steel bottle from the sustainability office",
            RewardCategory::PhysicalItem,
            400,
            Tier::Silver,
            Stock::Limited(50),
            RedemptionType::RequiresApproval,
        ),
        reward(
            "Tree planted in your name",
            "A native tree planted at the campus arboretum",
            RewardCategory::Impact,
            1200,
            Tier::Gold,
            Stock::Unlimited,
            RedemptionType::Scheduled,
        ),
    ]
}

/// Fill an empty catalog with the default rewards. Existing catalogs are left alone.
pub(crate) fn seed_catalog<P, A>(
    service: &GreenCreditsService<P, A>,
) -> Result<usize, CreditsError>
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    if !service.list_rewards()?.is_empty() {
        return Ok(0);
    }
    let drafts = default_catalog();
    let count = drafts.len();
    for draft in drafts {
        service.create_reward(draft)?;
    }
    info!(rewards = count, "seeded default rewards catalog");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use green_credits::engine::{EngineSettings, MemoryActivityFeed};

    #[test]
    fn seeding_only_fills_an_empty_catalog() {
        let store = ConfiguredStore::open(None).expect("memory store");
        let service = GreenCreditsService::open(
            Arc::new(store),
            Arc::new(MemoryActivityFeed::default()),
            EngineSettings::default(),
        )
        .expect("engine opens");

        assert_eq!(seed_catalog(&service).unwrap(), default_catalog().len());
        assert_eq!(seed_catalog(&service).unwrap(), 0);
        assert_eq!(
            service.list_rewards().unwrap().len(),
            default_catalog().len()
        );
    }
}
