pub mod effects;
pub mod hub;
pub mod leaderboard;
pub mod ledger;
pub mod lifecycle;
pub mod lifeline;
pub mod projection;
pub mod quiz;
pub mod registry;
pub mod replay;
pub mod roster;
pub mod scoring;
pub mod state_machine;
pub mod sudden_death;
pub mod timing;
pub mod transitions;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::session_store::SessionStore,
    error::ServiceError,
    state::{
        hub::NotificationHub,
        lifeline::{ChoicePicker, RandomPicker},
        registry::{SessionHandle, SessionRegistry, is_valid_session_id, normalize_session_id},
        timing::{Clock, SystemClock, Timestamp},
    },
};

pub type SharedState = Arc<AppState>;

/// Capacity of each broadcast room.
const ROOM_CAPACITY: usize = 64;

/// Central application state: live sessions, their connections and the persistence gateway.
pub struct AppState {
    config: Arc<AppConfig>,
    registry: SessionRegistry,
    store: Arc<dyn SessionStore>,
    hubs: NotificationHub,
    picker: Arc<dyn ChoicePicker>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn SessionStore>) -> SharedState {
        Self::with_parts(config, store, Arc::new(RandomPicker), Arc::new(SystemClock))
    }

    /// Same as [`AppState::new`] with explicit randomness and time sources.
    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn SessionStore>,
        picker: Arc<dyn ChoicePicker>,
        clock: Arc<dyn Clock>,
    ) -> SharedState {
        Arc::new(Self {
            config: Arc::new(config),
            registry: SessionRegistry::new(),
            store,
            hubs: NotificationHub::new(ROOM_CAPACITY),
            picker,
            clock,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Live sessions keyed by normalized identifier.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Persistence gateway.
    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    /// Rooms and connections of every session.
    pub fn hubs(&self) -> &NotificationHub {
        &self.hubs
    }

    pub fn picker(&self) -> &dyn ChoicePicker {
        self.picker.as_ref()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn max_points(&self) -> u32 {
        self.config.max_points_per_question
    }

    /// Whether `token` matches the configured admin secret.
    pub fn is_admin_token(&self, token: &str) -> bool {
        token == self.config.admin_secret
    }

    /// Normalized session id, falling back to the configured default session.
    ///
    /// Identifiers outside `[A-Z0-9_-]{1,64}` are refused.
    pub fn resolve_session_id(&self, requested: Option<&str>) -> Result<String, ServiceError> {
        let id = requested
            .map(normalize_session_id)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| normalize_session_id(&self.config.default_session));
        if is_valid_session_id(&id) {
            Ok(id)
        } else {
            Err(ServiceError::InvalidInput(format!("invalid session id `{id}`")))
        }
    }

    /// Live session `id`, or `NotFound`.
    pub fn session(&self, id: &str) -> Result<SessionHandle, ServiceError> {
        self.registry
            .get(id)
            .ok_or_else(|| ServiceError::NotFound(format!("quiz `{}` not found", normalize_session_id(id))))
    }
}
