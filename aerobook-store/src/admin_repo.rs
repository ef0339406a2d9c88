use aerobook_core::repository::AdminRepository;
use aerobook_core::{AdminAccount, CoreError, CoreResult};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::info;

pub struct SqliteAdminRepository {
    pool: SqlitePool,
}

impl SqliteAdminRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: i64,
    username: String,
    hash: String,
}

impl From<AdminRow> for AdminAccount {
    fn from(row: AdminRow) -> Self {
        AdminAccount {
            id: row.id,
            username: row.username,
            hash: row.hash,
        }
    }
}

#[async_trait]
impl AdminRepository for SqliteAdminRepository {
    async fn find_admin(&self, username: &str) -> CoreResult<Option<AdminAccount>> {
        let row = sqlx::query_as::<_, AdminRow>("SELECT id, username, hash FROM admin WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::storage)?;

        Ok(row.map(AdminAccount::from))
    }

    async fn create_admin(&self, username: &str, hash: &str) -> CoreResult<AdminAccount> {
        let id = sqlx::query("INSERT INTO admin (username, hash) VALUES (?, ?)")
            .bind(username)
            .bind(hash)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    CoreError::Conflict("Username already exists".to_string())
                }
                other => CoreError::storage(other),
            })?
            .last_insert_rowid();

        info!("Admin account {} created: {}", id, username);

        Ok(AdminAccount {
            id,
            username: username.to_string(),
            hash: hash.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbClient;
    use aerobook_core::identity::hash_password;

    #[tokio::test]
    async fn test_create_find_and_duplicate() {
        let db = DbClient::in_memory().await.unwrap();
        let repo = SqliteAdminRepository::new(db.pool);

        let hash = hash_password("s3cret").unwrap();
        let created = repo.create_admin("ops", &hash).await.unwrap();

        let found = repo.find_admin("ops").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(found.verify("s3cret"));
        assert!(repo.find_admin("nobody").await.unwrap().is_none());

        let err = repo.create_admin("ops", &hash).await.unwrap_err();
        assert_eq!(err.to_string(), "Username already exists");
    }
}
