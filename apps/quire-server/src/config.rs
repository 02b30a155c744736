//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use quire_core::pagination::{DEFAULT_ORPHANS, DEFAULT_PER_PAGE};
use quire_infra::DatabaseConfig;

/// Listing and detail-page knobs of the public blog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlogSettings {
    pub page_size: u64,
    pub orphans: u64,
    pub max_page_size: u64,
    pub similar_posts: u64,
}

impl Default for BlogSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PER_PAGE,
            orphans: DEFAULT_ORPHANS,
            max_page_size: 50,
            similar_posts: 4,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    /// Apply pending migrations before serving.
    pub auto_migrate: bool,
    pub blog: BlogSettings,
    /// Mail relay endpoint; console mail when absent.
    pub mail_webhook_url: Option<String>,
    /// Bearer token of the admin API; the API is disabled when absent.
    pub admin_token: Option<String>,
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = non_empty("DATABASE_URL").map(|url| DatabaseConfig {
            url,
            max_connections: parsed("DB_MAX_CONNECTIONS", 100),
            min_connections: parsed("DB_MIN_CONNECTIONS", 10),
        });

        let defaults = BlogSettings::default();
        let page_size = parsed("BLOG_PAGE_SIZE", defaults.page_size).max(1);
        let blog = BlogSettings {
            page_size,
            orphans: parsed("BLOG_PAGE_ORPHANS", defaults.orphans),
            max_page_size: parsed("BLOG_MAX_PAGE_SIZE", defaults.max_page_size).max(page_size),
            similar_posts: parsed("BLOG_SIMILAR_POSTS", defaults.similar_posts),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed("PORT", 8080),
            database,
            auto_migrate: env::var("DB_AUTO_MIGRATE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            blog,
            mail_webhook_url: non_empty("MAIL_WEBHOOK_URL"),
            admin_token: non_empty("ADMIN_TOKEN"),
        }
    }
}
