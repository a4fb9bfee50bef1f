use crate::domain::port::RepositoryError;

// MySQLのエラー番号
const ER_DBACCESS_DENIED: u16 = 1044;
const ER_ACCESS_DENIED: u16 = 1045;
const ER_BAD_FIELD: u16 = 1054;
const ER_TABLEACCESS_DENIED: u16 = 1142;
const ER_NO_SUCH_TABLE: u16 = 1146;
const ER_WARN_DATA_OUT_OF_RANGE: u16 = 1264;
const ER_TRUNCATED_WRONG_VALUE: u16 = 1366;
const ER_DATA_TOO_LONG: u16 = 1406;
const ER_DATA_OUT_OF_RANGE: u16 = 1690;

/// データベースエラー型
/// データベース操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseError {
    /// データベース接続エラー
    ConnectionError(String),
    /// SQLクエリエラー
    QueryError(String),
    /// テーブルまたはカラムが存在しない
    SchemaError(String),
    /// データベース側の権限エラー
    AccessDenied(String),
    /// 値の範囲外・長さ超過など、データベースが受け付けない値
    InvalidValue(String),
    /// 取得した行の変換エラー
    DecodeError(String),
    /// マイグレーションエラー
    MigrationError(String),
}

impl DatabaseError {
    /// sqlxのエラーを分類する
    ///
    /// # Arguments
    /// * `context` - 失敗した操作の説明
    /// * `error` - sqlxのエラー
    pub fn classify(context: &str, error: sqlx::Error) -> Self {
        let message = format!("{}: {}", context, error);
        match &error {
            sqlx::Error::Database(db_error) => {
                let number = db_error
                    .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                    .map(|e| e.number());
                match number {
                    Some(ER_NO_SUCH_TABLE | ER_BAD_FIELD) => DatabaseError::SchemaError(message),
                    Some(ER_DBACCESS_DENIED | ER_ACCESS_DENIED | ER_TABLEACCESS_DENIED) => {
                        DatabaseError::AccessDenied(message)
                    }
                    Some(
                        ER_WARN_DATA_OUT_OF_RANGE
                        | ER_TRUNCATED_WRONG_VALUE
                        | ER_DATA_TOO_LONG
                        | ER_DATA_OUT_OF_RANGE,
                    ) => DatabaseError::InvalidValue(message),
                    _ => DatabaseError::QueryError(message),
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DatabaseError::ConnectionError(message),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_) => DatabaseError::DecodeError(message),
            _ => DatabaseError::QueryError(message),
        }
    }
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseError::ConnectionError(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::QueryError(msg) => write!(f, "Database query error: {}", msg),
            DatabaseError::SchemaError(msg) => write!(f, "Database schema error: {}", msg),
            DatabaseError::AccessDenied(msg) => write!(f, "Database access denied: {}", msg),
            DatabaseError::InvalidValue(msg) => write!(f, "Database rejected value: {}", msg),
            DatabaseError::DecodeError(msg) => write!(f, "Database decode error: {}", msg),
            DatabaseError::MigrationError(msg) => write!(f, "Migration error: {}", msg),
        }
    }
}

impl std::error::Error for DatabaseError {}

/// DatabaseErrorからRepositoryErrorへの変換
impl From<DatabaseError> for RepositoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionError(msg) => RepositoryError::ConnectionFailed(msg),
            DatabaseError::QueryError(msg) => RepositoryError::OperationFailed(msg),
            DatabaseError::SchemaError(msg) => RepositoryError::SchemaMissing(msg),
            DatabaseError::AccessDenied(msg) => RepositoryError::PermissionDenied(msg),
            DatabaseError::InvalidValue(msg) => RepositoryError::MalformedRequest(msg),
            DatabaseError::DecodeError(msg) => RepositoryError::FetchFailed(msg),
            DatabaseError::MigrationError(msg) => RepositoryError::OperationFailed(msg),
        }
    }
}
