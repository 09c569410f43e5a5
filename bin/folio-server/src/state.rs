//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::entities::SqliteStore;
use crate::inference::InferenceClient;
use crate::mail::{Mailer, Templates};

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Persistent store for every entity.
    pub store: Arc<SqliteStore>,
    /// Outbound email; best-effort.
    pub mailer: Arc<dyn Mailer>,
    /// Email bodies.
    pub templates: Arc<Templates>,
    /// Chatbot backend.
    pub inference: Arc<dyn InferenceClient>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::inference::fake::ScriptedClient;
    use crate::mail::fake::RecordingMailer;

    /// Test state over an in-memory database. The fakes are returned alongside
    /// so tests can inspect what was sent.
    pub(crate) async fn state_with(
        mailer: Arc<RecordingMailer>,
        inference: Arc<ScriptedClient>,
    ) -> Arc<AppState> {
        let config = Config::for_tests();
        let templates = Templates::new(&config.site_name, &config.site_url).unwrap();
        Arc::new(AppState {
            config: Arc::new(config),
            store: Arc::new(SqliteStore::in_memory().await),
            mailer,
            templates: Arc::new(templates),
            inference,
        })
    }

    pub(crate) async fn state() -> Arc<AppState> {
        state_with(Arc::new(RecordingMailer::default()), Arc::new(ScriptedClient::unconfigured())).await
    }
}
