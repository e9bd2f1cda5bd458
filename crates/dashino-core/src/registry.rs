// ── Session registry ──
//
// Entry id → live session. Owned by whoever hosts the entries; there is no
// global instance.

use std::sync::Arc;

use dashino_config::ResolvedSettings;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::services::Dashino;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Dashino>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, returning the one it replaced.
    pub fn insert(
        &self,
        entry_id: impl Into<String>,
        session: Arc<Dashino>,
    ) -> Option<Arc<Dashino>> {
        let entry_id = entry_id.into();
        debug!(entry_id = %entry_id, "registering Dashino session");
        self.sessions.insert(entry_id, session)
    }

    /// Build a session from settings and register it under `entry_id`.
    pub fn setup(
        &self,
        entry_id: impl Into<String>,
        settings: &ResolvedSettings,
        http: Option<reqwest::Client>,
    ) -> Result<Arc<Dashino>, CoreError> {
        let entry_id = entry_id.into();
        let session = Arc::new(Dashino::from_settings(settings, http)?);
        info!(
            entry_id = %entry_id,
            base_url = %session.client().base_url(),
            "Dashino entry set up"
        );
        self.insert(entry_id, Arc::clone(&session));
        Ok(session)
    }

    /// Tear down an entry. In-flight calls keep their own `Arc`.
    pub fn remove(&self, entry_id: &str) -> Option<Arc<Dashino>> {
        let removed = self.sessions.remove(entry_id).map(|(_, s)| s);
        if removed.is_some() {
            info!(entry_id, "Dashino entry unloaded");
        }
        removed
    }

    pub fn get(&self, entry_id: &str) -> Option<Arc<Dashino>> {
        self.sessions.get(entry_id).map(|s| Arc::clone(s.value()))
    }

    pub fn contains(&self, entry_id: &str) -> bool {
        self.sessions.contains_key(entry_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Registered entry ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use dashino_config::{Settings, validate};

    use super::*;

    fn settings(base_url: &str) -> ResolvedSettings {
        validate(&Settings {
            base_url: Some(base_url.into()),
            ..Settings::default()
        })
        .unwrap()
    }

    #[test]
    fn insert_get_remove() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());

        let http = reqwest::Client::new();
        let first = registry
            .setup("entry-a", &settings("http://a.local"), Some(http.clone()))
            .unwrap();
        registry
            .setup("entry-b", &settings("http://b.local"), Some(http))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["entry-a", "entry-b"]);
        assert!(Arc::ptr_eq(&registry.get("entry-a").unwrap(), &first));

        let removed = registry.remove("entry-a").unwrap();
        assert_eq!(removed.client().base_url(), "http://a.local");
        assert!(!registry.contains("entry-a"));
        assert!(registry.remove("entry-a").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn insert_returns_replaced_session() {
        let registry = SessionRegistry::new();
        let http = reqwest::Client::new();
        let session = |url: &str, http: reqwest::Client| {
            Arc::new(Dashino::from_settings(&settings(url), Some(http)).unwrap())
        };
        let old = session("http://old.local", http.clone());
        let new = session("http://new.local", http);

        assert!(registry.insert("entry", old).is_none());
        let replaced = registry.insert("entry", new).unwrap();
        assert_eq!(replaced.client().base_url(), "http://old.local");
        assert_eq!(
            registry.get("entry").unwrap().client().base_url(),
            "http://new.local"
        );
    }
}
