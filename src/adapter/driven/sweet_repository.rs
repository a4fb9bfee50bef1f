use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{Pagination, Price, Sweet, SweetChanges, SweetFilter, SweetId};
use crate::domain::port::{RepositoryError, StockDecrement, SweetRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

// MySQL関連のインポート
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, QueryBuilder, Row};

const SELECT_COLUMNS: &str = "SELECT id, name, category, price, quantity, image_url, created_at FROM sweets";

// 条件付き減算が競合で失敗した場合に読み直して再試行する回数
const DECREMENT_ATTEMPTS: u32 = 3;

/// MySQL商品リポジトリ
/// MySQLデータベースを使用して商品と在庫数を永続化する
#[derive(Clone)]
pub struct MySqlSweetRepository {
    pool: Pool<MySql>,
}

impl MySqlSweetRepository {
    /// 新しいMySQL商品リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    async fn fetch_one(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify("商品の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        row.as_ref().map(sweet_from_row).transpose()
    }
}

/// 取得した行から商品を再構築
fn sweet_from_row(row: &MySqlRow) -> Result<Sweet, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::from(DatabaseError::classify("商品の変換に失敗しました", e));

    let id: String = row.try_get("id").map_err(decode)?;
    let id = SweetId::from_string(&id)
        .map_err(|e| RepositoryError::FetchFailed(format!("商品IDの解析に失敗しました: {}", e)))?;
    let price: Decimal = row.try_get("price").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;

    Ok(Sweet::reconstruct(
        id,
        row.try_get("name").map_err(decode)?,
        row.try_get("category").map_err(decode)?,
        Price::from_stored(price),
        row.try_get::<u32, _>("quantity").map_err(decode)?,
        row.try_get::<Option<String>, _>("image_url").map_err(decode)?,
        created_at,
    ))
}

/// LIKEのワイルドカードをエスケープした部分一致パターン
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// 検索条件をWHERE句として追加
fn push_filter(builder: &mut QueryBuilder<'_, MySql>, filter: &SweetFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(search) = &filter.search {
        builder
            .push(" AND LOWER(name) LIKE ")
            .push_bind(contains_pattern(search));
    }
    if let Some(category) = &filter.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(min_price) = filter.min_price {
        builder.push(" AND price >= ").push_bind(min_price);
    }
    if let Some(max_price) = filter.max_price {
        builder.push(" AND price <= ").push_bind(max_price);
    }
}

#[async_trait]
impl SweetRepository for MySqlSweetRepository {
    async fn insert(&self, sweet: &Sweet) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO sweets (id, name, category, price, quantity, image_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sweet.id().to_string())
        .bind(sweet.name())
        .bind(sweet.category())
        .bind(sweet.price().amount())
        .bind(sweet.quantity())
        .bind(sweet.image_url())
        .bind(sweet.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::classify("商品の保存に失敗しました", e))
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn find_by_id(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError> {
        self.fetch_one(id).await
    }

    async fn find_by_ids(&self, ids: &[SweetId]) -> Result<Vec<Sweet>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<MySql>::new(SELECT_COLUMNS);
        builder.push(" WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify("商品の一括取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        rows.iter().map(sweet_from_row).collect()
    }

    async fn search(
        &self,
        filter: &SweetFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Sweet>, u64), RepositoryError> {
        // 全件数はページングとは別に同じ条件で数える
        let mut count_builder = QueryBuilder::<MySql>::new("SELECT COUNT(*) AS total FROM sweets");
        push_filter(&mut count_builder, filter);
        let total: i64 = count_builder
            .build()
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("total"))
            .map_err(|e| DatabaseError::classify("商品件数の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        // 商品名の昇順、同名の場合は登録順
        let mut builder = QueryBuilder::<MySql>::new(SELECT_COLUMNS);
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY name ASC, created_at ASC, id ASC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify("商品一覧の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        let sweets = rows.iter().map(sweet_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((sweets, u64::try_from(total).unwrap_or(0)))
    }

    async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query("SELECT DISTINCT category FROM sweets ORDER BY category ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify("カテゴリ一覧の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        rows.iter()
            .map(|row| {
                row.try_get("category")
                    .map_err(|e| DatabaseError::classify("カテゴリの変換に失敗しました", e))
                    .map_err(RepositoryError::from)
            })
            .collect()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM sweets")
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("total"))
            .map_err(|e| DatabaseError::classify("商品件数の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn update(
        &self,
        id: SweetId,
        changes: &SweetChanges,
    ) -> Result<Option<Sweet>, RepositoryError> {
        if changes.is_empty() {
            return self.fetch_one(id).await;
        }

        // 指定されたカラムのみ更新する
        let mut builder = QueryBuilder::<MySql>::new("UPDATE sweets SET ");
        let mut assignments = builder.separated(", ");
        if let Some(name) = &changes.name {
            assignments.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(category) = &changes.category {
            assignments.push("category = ").push_bind_unseparated(category.clone());
        }
        if let Some(price) = changes.price {
            assignments.push("price = ").push_bind_unseparated(price.amount());
        }
        if let Some(quantity) = changes.quantity {
            assignments.push("quantity = ").push_bind_unseparated(quantity);
        }
        if let Some(image_url) = &changes.image_url {
            assignments.push("image_url = ").push_bind_unseparated(image_url.clone());
        }
        builder.push(" WHERE id = ").push_bind(id.to_string());

        builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify("商品の更新に失敗しました", e))
            .map_err(RepositoryError::from)?;

        // 値が変わらない更新では影響行数が0になるため、存在確認は再取得で行う
        self.fetch_one(id).await
    }

    async fn delete(&self, id: SweetId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sweets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify("商品の削除に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn decrement_if_available(
        &self,
        id: SweetId,
        quantity: u32,
    ) -> Result<StockDecrement, RepositoryError> {
        let mut attempts = 0;
        loop {
            attempts += 1;

            // 在庫数の確認と減算を1文で行う
            let result = sqlx::query(
                "UPDATE sweets SET quantity = quantity - ? WHERE id = ? AND quantity >= ?",
            )
            .bind(quantity)
            .bind(id.to_string())
            .bind(quantity)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify("在庫の減算に失敗しました", e))
            .map_err(RepositoryError::from)?;

            let current = self.fetch_one(id).await?;
            if result.rows_affected() == 1 {
                return match current {
                    Some(sweet) => Ok(StockDecrement::Applied(sweet)),
                    // 減算直後に削除された
                    None => Ok(StockDecrement::NotFound),
                };
            }

            match current {
                None => return Ok(StockDecrement::NotFound),
                // 更新と再取得の間に補充された場合は再試行する
                Some(sweet) if sweet.has_available_stock(quantity) && attempts < DECREMENT_ATTEMPTS => {
                    continue;
                }
                Some(sweet) => {
                    return Ok(StockDecrement::Insufficient {
                        available: sweet.quantity(),
                    })
                }
            }
        }
    }

    async fn increment_quantity(
        &self,
        id: SweetId,
        delta: u32,
    ) -> Result<Option<Sweet>, RepositoryError> {
        let result = sqlx::query("UPDATE sweets SET quantity = quantity + ? WHERE id = ?")
            .bind(delta)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify("在庫の補充に失敗しました", e))
            .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_one(id).await
    }
}
