use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::engine::{
    Clock, Collection, DeviceAnswers, EngineSettings, GreenCreditsService, MemoryActivityFeed,
    MemoryAdapter, NewSubmission, NewUser, PersistenceAdapter, RedemptionType, Reward,
    RewardCategory, RewardDraft, Role, Stock, StoreError, Submission, Tier, User, UserId,
};

pub(super) type TestService = GreenCreditsService<MemoryAdapter, MemoryActivityFeed>;

pub(super) const RECYCLE_INTENT: &str = "Formally recycle it";
pub(super) const BROKEN: &str = "No, it's broken";

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap()
}

/// Clock that only moves when a test tells it to.
#[derive(Debug)]
pub(super) struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub(super) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub(super) struct Harness {
    pub service: Arc<TestService>,
    pub store: MemoryAdapter,
    pub feed: MemoryActivityFeed,
    pub clock: Arc<FixedClock>,
}

pub(super) fn harness() -> Harness {
    harness_with(MemoryAdapter::default(), EngineSettings::default())
}

pub(super) fn harness_with(store: MemoryAdapter, settings: EngineSettings) -> Harness {
    let feed = MemoryActivityFeed::default();
    let clock = Arc::new(FixedClock::new(start()));
    let service =
        GreenCreditsService::open(Arc::new(store.clone()), Arc::new(feed.clone()), settings)
            .expect("engine opens")
            .with_clock(clock.clone());
    Harness {
        service: Arc::new(service),
        store,
        feed,
        clock,
    }
}

pub(super) fn register(service: &TestService, name: &str) -> User {
    service
        .register_user(NewUser {
            name: name.to_string(),
            email: format!("{}@campus.example", name.to_ascii_lowercase()),
            role: Role::User,
        })
        .expect("registration succeeds")
}

/// Bring `user_id` to `balance` with a single bonus entry. Expects a zero balance.
pub(super) fn fund(service: &TestService, user_id: &UserId, balance: i64) {
    service
        .grant_bonus(user_id, balance, "Opening balance")
        .expect("bonus posts");
}

pub(super) fn recycle_request(user_id: &UserId, category: &str) -> NewSubmission {
    NewSubmission {
        user_id: user_id.clone(),
        category: category.to_string(),
        condition: BROKEN.to_string(),
        intent: RECYCLE_INTENT.to_string(),
    }
}

pub(super) fn answers(condition: &str, intent: &str) -> DeviceAnswers {
    DeviceAnswers {
        device_condition: condition.to_string(),
        intent: intent.to_string(),
    }
}

/// Create, drop off and verify a recycling submission.
pub(super) fn completed_submission(service: &TestService, user_id: &UserId) -> Submission {
    let created = service
        .create_submission(recycle_request(user_id, "Laptop"))
        .expect("submission created");
    service.mark_dropped(&created.id).expect("dropped");
    service.verify_submission(&created.id).expect("verified")
}

pub(super) fn draft(
    name: &str,
    cost: i64,
    min_tier: Tier,
    stock: Stock,
    redemption_type: RedemptionType,
) -> RewardDraft {
    RewardDraft {
        name: name.to_string(),
        description: format!("{name} for green champions"),
        category: RewardCategory::CampusPerk,
        credit_cost: cost,
        min_tier,
        stock,
        redemption_type,
        image_url: String::new(),
        terms_and_conditions: Some("Valid on campus only".to_string()),
    }
}

pub(super) fn add_reward(
    service: &TestService,
    name: &str,
    cost: i64,
    min_tier: Tier,
    stock: Stock,
    redemption_type: RedemptionType,
) -> Reward {
    service
        .create_reward(draft(name, cost, min_tier, stock, redemption_type))
        .expect("reward created")
}

/// Memory store whose writes to one collection can be made to fail on demand.
#[derive(Debug, Clone)]
pub(super) struct FlakyAdapter {
    inner: MemoryAdapter,
    failing: Collection,
    armed: Arc<AtomicBool>,
}

impl FlakyAdapter {
    pub(super) fn new(failing: Collection) -> Self {
        Self {
            inner: MemoryAdapter::default(),
            failing,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(super) fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub(super) fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

impl PersistenceAdapter for FlakyAdapter {
    fn load(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        self.inner.load(collection)
    }

    fn save(&self, collection: Collection, records: Vec<Value>) -> Result<(), StoreError> {
        if collection == self.failing && self.armed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "{} is read-only",
                collection.key()
            )));
        }
        self.inner.save(collection, records)
    }
}

pub(super) fn flaky_service(
    failing: Collection,
) -> (GreenCreditsService<FlakyAdapter, MemoryActivityFeed>, FlakyAdapter) {
    let store = FlakyAdapter::new(failing);
    let service = GreenCreditsService::open(
        Arc::new(store.clone()),
        Arc::new(MemoryActivityFeed::default()),
        EngineSettings::default(),
    )
    .expect("engine opens")
    .with_clock(Arc::new(FixedClock::new(start())));
    (service, store)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
