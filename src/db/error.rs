use sqlx::error::ErrorKind;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage errors as seen by callers of the repository.
///
/// Constraint failures get their own variants so the bot can tell a duplicate
/// department or a dangling reference apart from an unreachable database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error("not-null constraint violated: {0}")]
    NotNullViolation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("database unreachable: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("destructive reset refused: no explicit confirmation was given")]
    ResetNotConfirmed,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StoreError::UniqueViolation(_)
                | StoreError::ForeignKeyViolation(_)
                | StoreError::NotNullViolation(_)
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => StoreError::UniqueViolation(message),
                    ErrorKind::ForeignKeyViolation => StoreError::ForeignKeyViolation(message),
                    ErrorKind::NotNullViolation => StoreError::NotNullViolation(message),
                    _ if db_err.code().is_some_and(|c| is_connectivity_code(&c)) => {
                        StoreError::Connection(err)
                    }
                    _ => StoreError::Database(err),
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Connection(err),
            _ => StoreError::Database(err),
        }
    }
}

/// SQLite result codes meaning the database file itself cannot be reached:
/// SQLITE_IOERR (10) and SQLITE_CANTOPEN (14), with any extended code.
fn is_connectivity_code(code: &str) -> bool {
    const SQLITE_IOERR: i32 = 10;
    const SQLITE_CANTOPEN: i32 = 14;
    code.parse::<i32>()
        .map(|c| matches!(c & 0xff, SQLITE_IOERR | SQLITE_CANTOPEN))
        .unwrap_or(false)
}
