use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{Purchase, PurchaseId, SweetId, UserId};
use crate::domain::port::{PurchaseRepository, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

// MySQL関連のインポート
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};

/// MySQL購入記録リポジトリ
/// MySQLデータベースを使用して購入記録を永続化する
#[derive(Clone)]
pub struct MySqlPurchaseRepository {
    pool: Pool<MySql>,
}

impl MySqlPurchaseRepository {
    /// 新しいMySQL購入記録リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

fn parse_id<T>(
    raw: &str,
    label: &str,
    parse: impl Fn(&str) -> Result<T, uuid::Error>,
) -> Result<T, RepositoryError> {
    parse(raw).map_err(|e| RepositoryError::FetchFailed(format!("{}の解析に失敗しました: {}", label, e)))
}

/// 取得した行から購入記録を再構築
fn purchase_from_row(row: &MySqlRow) -> Result<Purchase, RepositoryError> {
    let decode =
        |e: sqlx::Error| RepositoryError::from(DatabaseError::classify("購入記録の変換に失敗しました", e));

    let id: String = row.try_get("id").map_err(decode)?;
    let user_id: String = row.try_get("user_id").map_err(decode)?;
    let sweet_id: String = row.try_get("sweet_id").map_err(decode)?;
    let total_price: Decimal = row.try_get("total_price").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;

    Ok(Purchase::reconstruct(
        parse_id(&id, "購入ID", PurchaseId::from_string)?,
        parse_id(&user_id, "利用者ID", UserId::from_string)?,
        parse_id(&sweet_id, "商品ID", SweetId::from_string)?,
        row.try_get::<u32, _>("quantity").map_err(decode)?,
        total_price,
        created_at,
    ))
}

#[async_trait]
impl PurchaseRepository for MySqlPurchaseRepository {
    async fn insert(&self, purchase: &Purchase) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO purchases (id, user_id, sweet_id, quantity, total_price, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(purchase.id().to_string())
        .bind(purchase.user_id().to_string())
        .bind(purchase.sweet_id().to_string())
        .bind(purchase.quantity())
        .bind(purchase.total_price())
        .bind(purchase.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::classify("購入記録の保存に失敗しました", e))
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn find_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, sweet_id, quantity, total_price, created_at FROM purchases WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::classify("購入記録の取得に失敗しました", e))
        .map_err(RepositoryError::from)?;

        row.as_ref().map(purchase_from_row).transpose()
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Purchase>, RepositoryError> {
        // 購入日時の降順で並べる
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, sweet_id, quantity, total_price, created_at
            FROM purchases
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::classify("購入履歴の取得に失敗しました", e))
        .map_err(RepositoryError::from)?;

        rows.iter().map(purchase_from_row).collect()
    }

    async fn delete(&self, id: PurchaseId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM purchases WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify("購入記録の削除に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_owned(&self, id: PurchaseId, owner: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM purchases WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(owner.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify("購入記録の削除に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    fn next_identity(&self) -> PurchaseId {
        PurchaseId::new()
    }
}
