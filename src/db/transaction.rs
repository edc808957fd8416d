//! Scoped write transactions.
//!
//! [`TransactionManager::with_tx`] is the only place a transaction is begun or
//! ended around a chain of repository operations.

use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::{SqliteConnection, SqlitePool};

use crate::errors::AppError;

/// Runs operations inside a single SQLite write transaction.
#[derive(Clone)]
pub struct TransactionManager {
    pool: SqlitePool,
    deadline: Duration,
}

impl TransactionManager {
    pub fn new(pool: SqlitePool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run `op` inside a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// A panic inside `op`, or the returned future being dropped before it
    /// completes, drops the open `sqlx::Transaction`, which rolls back. Taking
    /// the write lock and running `op` are bounded by the configured deadline;
    /// when it expires the transaction is rolled back and `Internal` is
    /// returned. The commit runs outside the deadline, so a timeout never
    /// reports failure for work that was committed.
    ///
    /// ```ignore
    /// let id = tx
    ///     .with_tx(move |conn| {
    ///         Box::pin(async move {
    ///             let row = sqlx::query("INSERT INTO skills (name) VALUES (?)")
    ///                 .bind(name)
    ///                 .execute(&mut *conn)
    ///                 .await?;
    ///             Ok(row.last_insert_rowid())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn with_tx<T, F>(&self, op: F) -> Result<T, AppError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, AppError>> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let work = async {
            // SQLite has no row locks. Writing first takes the database write
            // lock for the rest of the transaction, so every read in `op` is a
            // locked read.
            match sqlx::query("UPDATE meta SET revision_id = revision_id + 1 WHERE id = 1")
                .execute(&mut *tx)
                .await
            {
                Ok(_) => op(&mut *tx).await,
                Err(err) => Err(AppError::from(err)),
            }
        };

        let outcome = tokio::time::timeout(self.deadline, work).await;
        let err = match outcome {
            Ok(Ok(value)) => {
                tx.commit().await?;
                return Ok(value);
            }
            Ok(Err(err)) => err,
            Err(_) => {
                tracing::warn!(
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Transaction deadline exceeded, rolling back"
                );
                AppError::Internal("transaction deadline exceeded".to_string())
            }
        };

        if let Err(rollback_err) = tx.rollback().await {
            tracing::error!("Rollback failed after {}: {}", err, rollback_err);
        }
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_database, revision_id};
    use sqlx::Row;
    use tempfile::TempDir;

    async fn setup() -> (TransactionManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("tx.sqlite"))
            .await
            .unwrap();
        (
            TransactionManager::new(pool, Duration::from_secs(5)),
            temp_dir,
        )
    }

    async fn skill_count(tx: &TransactionManager) -> i64 {
        sqlx::query("SELECT COUNT(*) AS n FROM skills")
            .fetch_one(tx.pool())
            .await
            .unwrap()
            .get("n")
    }

    #[tokio::test]
    async fn test_commit_on_ok() {
        let (tx, _dir) = setup().await;

        let id = tx
            .with_tx(|conn| {
                Box::pin(async move {
                    let result = sqlx::query("INSERT INTO skills (name) VALUES ('Rust')")
                        .execute(&mut *conn)
                        .await?;
                    Ok(result.last_insert_rowid())
                })
            })
            .await
            .unwrap();

        assert!(id > 0);
        assert_eq!(skill_count(&tx).await, 1);
        assert_eq!(revision_id(tx.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rollback_on_err() {
        let (tx, _dir) = setup().await;

        let result: Result<(), AppError> = tx
            .with_tx(|conn| {
                Box::pin(async move {
                    sqlx::query("INSERT INTO skills (name) VALUES ('Rust')")
                        .execute(&mut *conn)
                        .await?;
                    Err(AppError::Conflict("abort".to_string()))
                })
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(skill_count(&tx).await, 0);
        assert_eq!(revision_id(tx.pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rollback_on_panic() {
        let (tx, _dir) = setup().await;

        let manager = tx.clone();
        let handle = tokio::spawn(async move {
            let result: Result<(), AppError> = manager
                .with_tx(|conn| {
                    Box::pin(async move {
                        sqlx::query("INSERT INTO skills (name) VALUES ('Rust')")
                            .execute(&mut *conn)
                            .await?;
                        panic!("boom")
                    })
                })
                .await;
            result
        });

        assert!(handle.await.is_err());
        assert_eq!(skill_count(&tx).await, 0);
    }

    #[tokio::test]
    async fn test_rollback_on_deadline() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("tx.sqlite"))
            .await
            .unwrap();
        let tx = TransactionManager::new(pool, Duration::from_millis(50));

        let result: Result<(), AppError> = tx
            .with_tx(|conn| {
                Box::pin(async move {
                    sqlx::query("INSERT INTO skills (name) VALUES ('Rust')")
                        .execute(&mut *conn)
                        .await?;
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                })
            })
            .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(skill_count(&tx).await, 0);
        assert_eq!(revision_id(tx.pool()).await.unwrap(), 0);

        // The lock is released and the next transaction commits normally.
        tx.with_tx(|conn| {
            Box::pin(async move {
                sqlx::query("INSERT INTO skills (name) VALUES ('Go')")
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .await
        .unwrap();
        assert_eq!(skill_count(&tx).await, 1);
        assert_eq!(revision_id(tx.pool()).await.unwrap(), 1);
    }
}
