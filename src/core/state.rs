use axum::http::HeaderMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::config::AppConfig;
use crate::core::notify::{BroadcastEmitter, NotificationEmitter};
use crate::core::utils::DbPool;

pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub notifier: Arc<dyn NotificationEmitter>,
}

impl AppState {
    pub fn new(conn: DbPool, config: AppConfig) -> Self {
        Self {
            conn,
            config,
            notifier: Arc::new(BroadcastEmitter::default()),
        }
    }
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            config: self.config.clone(),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("conn", &"DbPool")
            .field("config", &self.config)
            .field("notifier", &"Arc<dyn NotificationEmitter>")
            .finish()
    }
}

/// Resolve the calling organization and actor from request headers.
/// Authentication happens upstream; absent headers fall back to the
/// nil UUID so single-tenant deployments work without them.
pub fn request_context(headers: &HeaderMap) -> (Uuid, Uuid) {
    let parse = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .unwrap_or(Uuid::nil())
    };
    (parse("x-org-id"), parse("x-actor-id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn context_falls_back_to_nil() {
        let headers = HeaderMap::new();
        assert_eq!(request_context(&headers), (Uuid::nil(), Uuid::nil()));
    }

    #[test]
    fn context_parses_headers() {
        let org = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert("x-org-id", HeaderValue::from_str(&org.to_string()).unwrap());
        headers.insert(
            "x-actor-id",
            HeaderValue::from_str(&actor.to_string()).unwrap(),
        );
        assert_eq!(request_context(&headers), (org, actor));
    }

    #[test]
    fn context_ignores_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert("x-org-id", HeaderValue::from_static("not-a-uuid"));
        assert_eq!(request_context(&headers).0, Uuid::nil());
    }
}
