//! Application state - shared across all handlers.

use std::sync::Arc;

use tera::Tera;

use quire_core::ports::{
    CommentRepository, Mailer, PostRepository, TagRepository, UserRepository,
};
use quire_infra::{ConsoleMailer, MemoryStore};

#[cfg(feature = "postgres")]
use quire_infra::database::connect;
#[cfg(feature = "postgres")]
use quire_infra::{
    PostgresCommentRepository, PostgresPostRepository, PostgresTagRepository,
    PostgresUserRepository,
};

use crate::config::{AppConfig, BlogSettings};
use crate::templates;

/// Which storage backend the repositories talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Postgres,
    Memory,
}

impl Storage {
    pub fn as_str(self) -> &'static str {
        match self {
            Storage::Postgres => "postgres",
            Storage::Memory => "memory",
        }
    }
}

/// Failures while assembling the state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Template loading failed: {0}")]
    Templates(#[from] tera::Error),

    #[error("Database unavailable: {0}")]
    Database(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// The four repository handles of one backend.
#[derive(Clone)]
pub struct Repositories {
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub users: Arc<dyn UserRepository>,
    pub storage: Storage,
}

impl Repositories {
    pub fn in_memory(store: &MemoryStore) -> Self {
        Self {
            posts: Arc::new(store.posts()),
            comments: Arc::new(store.comments()),
            tags: Arc::new(store.tags()),
            users: Arc::new(store.users()),
            storage: Storage::Memory,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub users: Arc<dyn UserRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub templates: Arc<Tera>,
    pub blog: BlogSettings,
    pub admin_token: Option<Arc<str>>,
    pub storage: Storage,
}

impl AppState {
    /// Assemble the state from already-built parts.
    pub fn assemble(
        repos: Repositories,
        mailer: Arc<dyn Mailer>,
        blog: BlogSettings,
        admin_token: Option<String>,
    ) -> Result<Self, StateError> {
        let templates = templates::load()?;

        Ok(Self {
            posts: repos.posts,
            comments: repos.comments,
            tags: repos.tags,
            users: repos.users,
            mailer,
            templates: Arc::new(templates),
            blog,
            admin_token: admin_token.map(Arc::from),
            storage: repos.storage,
        })
    }

    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Result<Self, StateError> {
        let repos = Self::repositories(config).await?;
        let mailer = Self::mailer(config);

        if config.admin_token.is_none() {
            tracing::warn!("ADMIN_TOKEN not set. Admin API is disabled.");
        }

        let state = Self::assemble(repos, mailer, config.blog, config.admin_token.clone())?;
        tracing::info!(storage = state.storage.as_str(), "Application state initialized");
        Ok(state)
    }

    #[cfg(feature = "postgres")]
    async fn repositories(config: &AppConfig) -> Result<Repositories, StateError> {
        use migration::MigratorTrait;

        let Some(db_config) = config.database.as_ref() else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Ok(Repositories::in_memory(&MemoryStore::new()));
        };

        let db = connect(db_config).await.map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            StateError::Database(e.to_string())
        })?;

        if config.auto_migrate {
            migration::Migrator::up(&db, None)
                .await
                .map_err(|e| StateError::Migration(e.to_string()))?;
            tracing::info!("Database migrations applied");
        }

        Ok(Repositories {
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            comments: Arc::new(PostgresCommentRepository::new(db.clone())),
            tags: Arc::new(PostgresTagRepository::new(db.clone())),
            users: Arc::new(PostgresUserRepository::new(db)),
            storage: Storage::Postgres,
        })
    }

    #[cfg(not(feature = "postgres"))]
    async fn repositories(config: &AppConfig) -> Result<Repositories, StateError> {
        if config.database.is_some() {
            return Err(StateError::Database(
                "DATABASE_URL is set but the server was built without the postgres feature"
                    .to_string(),
            ));
        }
        tracing::info!("Running without postgres feature - using in-memory repositories");
        Ok(Repositories::in_memory(&MemoryStore::new()))
    }

    fn mailer(config: &AppConfig) -> Arc<dyn Mailer> {
        match config.mail_webhook_url.as_ref() {
            #[cfg(feature = "webhook-mail")]
            Some(url) => {
                tracing::info!("Mail relay webhook configured");
                Arc::new(quire_infra::WebhookMailer::new(url.clone()))
            }
            #[cfg(not(feature = "webhook-mail"))]
            Some(_) => {
                tracing::warn!("MAIL_WEBHOOK_URL ignored: built without the webhook-mail feature");
                Arc::new(ConsoleMailer)
            }
            None => Arc::new(ConsoleMailer),
        }
    }
}
