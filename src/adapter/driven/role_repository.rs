use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{Role, UserId};
use crate::domain::port::{RepositoryError, RoleRepository};
use async_trait::async_trait;
use sqlx::{MySql, Pool, Row};

/// MySQLロールリポジトリ
#[derive(Clone)]
pub struct MySqlRoleRepository {
    pool: Pool<MySql>,
}

impl MySqlRoleRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for MySqlRoleRepository {
    async fn find_role(&self, user_id: UserId) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query("SELECT role FROM user_roles WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify("ロールの取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let role: String = row
            .try_get("role")
            .map_err(|e| DatabaseError::classify("ロールの変換に失敗しました", e))
            .map_err(RepositoryError::from)?;
        Role::from_string(&role)
            .map(Some)
            .map_err(|e| RepositoryError::FetchFailed(e.to_string()))
    }

    async fn insert_if_absent(&self, user_id: UserId, role: Role) -> Result<Role, RepositoryError> {
        // 既にロールがある場合は何もしない
        sqlx::query("INSERT IGNORE INTO user_roles (user_id, role) VALUES (?, ?)")
            .bind(user_id.to_string())
            .bind(role.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify("ロールの登録に失敗しました", e))
            .map_err(RepositoryError::from)?;

        self.find_role(user_id).await?.ok_or_else(|| {
            RepositoryError::FetchFailed(format!("登録したロールが見つかりません: {}", user_id))
        })
    }
}
