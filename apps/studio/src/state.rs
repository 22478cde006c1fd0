use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::chat::orchestrator::Orchestrator;
use crate::config::Config;
use crate::document::export::ExportSlots;
use crate::document::render::{DocumentRenderer, PreviewSurface};
use crate::session::cooldown::Cooldown;
use crate::session::credentials::CredentialStore;
use crate::session::state::Session;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Never held across an `.await`.
    pub session: Arc<Mutex<Session>>,
    pub cooldown: Cooldown,
    pub credentials: Arc<CredentialStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub renderer: DocumentRenderer,
    /// Async mutex: held while a preview renders on a blocking thread.
    pub preview: Arc<tokio::sync::Mutex<PreviewSurface>>,
    pub exports: ExportSlots,
}

impl AppState {
    pub fn new(config: Config, credentials: CredentialStore, orchestrator: Orchestrator) -> Self {
        Self {
            config,
            session: Arc::new(Mutex::new(Session::new())),
            cooldown: Cooldown::default(),
            credentials: Arc::new(credentials),
            orchestrator: Arc::new(orchestrator),
            renderer: DocumentRenderer::new(),
            preview: Arc::new(tokio::sync::Mutex::new(PreviewSurface::default())),
            exports: ExportSlots::default(),
        }
    }

    pub fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
