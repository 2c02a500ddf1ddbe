use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::generation::TestGenerationService;
use crate::services::google_auth::GoogleAuthService;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    google_auth: GoogleAuthService,
    generation: TestGenerationService,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool) -> Self {
        let google_auth = GoogleAuthService::new(settings.auth());
        let generation = TestGenerationService::new(settings.ai());
        Self { inner: Arc::new(InnerState { settings, db, google_auth, generation }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn google_auth(&self) -> &GoogleAuthService {
        &self.inner.google_auth
    }

    pub(crate) fn generation(&self) -> &TestGenerationService {
        &self.inner.generation
    }
}
