//! Shared fixtures for service tests.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::session_store::file::FileSessionStore,
    services::quiz_service,
    state::{
        AppState, SharedState,
        lifeline::ChoicePicker,
        timing::{Clock, Timestamp},
    },
};

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<Timestamp>);

impl ManualClock {
    pub fn advance(&self, seconds: f64) {
        *self.0.lock().unwrap() += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.0.lock().unwrap()
    }
}

/// Always keeps the first wrong choice.
pub struct FirstPicker;

impl ChoicePicker for FirstPicker {
    fn pick(&self, _candidates: &[&str]) -> usize {
        0
    }
}

pub struct TestContext {
    pub state: SharedState,
    pub clock: Arc<ManualClock>,
    root: PathBuf,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Context whose configuration is adjusted by `tweak` before the state is built.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let root = std::env::temp_dir().join(format!("quizzer-service-{}", Uuid::new_v4()));
        let store = FileSessionStore::open(root.clone()).await.unwrap();
        let clock = Arc::new(ManualClock(Mutex::new(1_000.0)));
        let mut config = AppConfig {
            admin_secret: "secret".into(),
            data_dir: root.clone(),
            ..AppConfig::default()
        };
        tweak(&mut config);
        let state = AppState::with_parts(config, Arc::new(store), Arc::new(FirstPicker), clock.clone());
        Self { state, clock, root }
    }

    /// Context with the default session already created.
    pub async fn with_default_session() -> Self {
        let ctx = Self::new().await;
        quiz_service::create_session(&ctx.state, None).await.unwrap();
        ctx
    }

    /// Data directory of this context.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Open a socket queue and return its id, sender and receiver.
    pub fn socket(&self) -> (Uuid, mpsc::UnboundedSender<Message>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Uuid::new_v4(), tx, rx)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Event names and payloads queued on a socket so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<(String, serde_json::Value)> {
    let mut frames = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Message::Text(text) = message {
            let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            frames.push((
                value["event"].as_str().unwrap_or_default().to_string(),
                value["data"].clone(),
            ));
        }
    }
    frames
}

/// Event names only.
pub fn names(frames: &[(String, serde_json::Value)]) -> Vec<&str> {
    frames.iter().map(|(name, _)| name.as_str()).collect()
}
