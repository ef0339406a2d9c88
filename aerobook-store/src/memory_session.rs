use aerobook_core::repository::SessionStore;
use aerobook_core::{CoreResult, WizardState};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Process-local wizard storage. Sessions vanish on restart, which is fine
/// for a single instance; use the Redis store when running several.
pub struct MemorySessionStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, WizardState)>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session_id: &str) -> CoreResult<Option<WizardState>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(session_id)
            .filter(|(expires_at, _)| *expires_at > Instant::now())
            .map(|(_, state)| state.clone()))
    }

    async fn save(&self, session_id: &str, state: &WizardState) -> CoreResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (expires_at, _)| *expires_at > now);
        entries.insert(session_id.to_string(), (now + self.ttl, state.clone()));
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> CoreResult<()> {
        self.entries.write().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerobook_core::{FareClass, SearchCriteria};
    use chrono::NaiveDate;

    fn state() -> WizardState {
        WizardState::start(SearchCriteria {
            city_from: "Cairo".into(),
            city_to: "Nairobi".into(),
            depart_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            return_date: None,
            fclass: FareClass::Economy,
            passenger_count: 1,
        })
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        assert!(store.load("sid").await.unwrap().is_none());

        store.save("sid", &state()).await.unwrap();
        assert_eq!(store.load("sid").await.unwrap(), Some(state()));
        assert!(store.load("other").await.unwrap().is_none());

        store.clear("sid").await.unwrap();
        assert!(store.load("sid").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_invisible() {
        let store = MemorySessionStore::new(Duration::ZERO);
        store.save("sid", &state()).await.unwrap();
        assert!(store.load("sid").await.unwrap().is_none());
    }
}
