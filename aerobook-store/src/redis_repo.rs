use aerobook_core::repository::SessionStore;
use aerobook_core::{CoreError, CoreResult, WizardState};
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

/// Wizard storage shared by every API instance. Each session is one JSON
/// value under `wizard:{session_id}`, refreshed to the full TTL on save.
#[derive(Clone)]
pub struct RedisSessionStore {
    client: redis::Client,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    pub fn new(connection_string: &str, ttl_seconds: u64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client, ttl_seconds })
    }

    /// Fails fast at start-up instead of on the first wizard request.
    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await
    }

    fn key(session_id: &str) -> String {
        format!("wizard:{}", session_id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, session_id: &str) -> CoreResult<Option<WizardState>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(CoreError::storage)?;

        let raw: Option<String> = conn.get(Self::key(session_id)).await.map_err(CoreError::storage)?;

        raw.map(|json| serde_json::from_str(&json).map_err(CoreError::storage))
            .transpose()
    }

    async fn save(&self, session_id: &str, state: &WizardState) -> CoreResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(CoreError::storage)?;

        let json = serde_json::to_string(state).map_err(CoreError::storage)?;
        conn.set_ex::<_, _, ()>(Self::key(session_id), json, self.ttl_seconds)
            .await
            .map_err(CoreError::storage)?;

        debug!("Wizard session saved at stage {:?}", state.stage());
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> CoreResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(CoreError::storage)?;

        conn.del::<_, ()>(Self::key(session_id))
            .await
            .map_err(CoreError::storage)
    }
}
