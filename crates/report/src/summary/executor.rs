//! Paginated query execution.
//!
//! Runs count and row statements built with SeaQuery against PostgreSQL.
//! Statements are rendered to SQL and bound arguments up front, so nothing
//! built by SeaQuery is held across an await. Every call runs inside a
//! transaction with a statement timeout so a slow report cannot hold a
//! connection indefinitely.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use sea_query::{SelectStatement, Value, Values};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Arguments, FromRow, PgPool, Postgres, Transaction};

use super::query_builder::to_sql;

/// Default per-statement timeout.
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// A statement rendered to PostgreSQL with its arguments bound.
pub struct BoundStatement {
    sql: String,
    args: PgArguments,
}

impl BoundStatement {
    pub fn new(statement: &SelectStatement) -> Result<Self> {
        let (sql, values) = to_sql(statement);
        Ok(Self {
            sql,
            args: pg_arguments(values)?,
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// Executes rendered statements.
#[derive(Clone)]
pub struct QueryExecutor {
    pool: PgPool,
    statement_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run a `SELECT COUNT(...)` statement.
    pub async fn count(&self, statement: BoundStatement) -> Result<u64> {
        let mut tx = self.begin().await?;
        let total = count_in(&mut tx, statement).await?;
        tx.commit()
            .await
            .context("failed to commit count transaction")?;
        Ok(total)
    }

    /// Run a row statement and decode every row.
    pub async fn fetch<T>(&self, statement: BoundStatement) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut tx = self.begin().await?;
        let rows = fetch_in(&mut tx, statement).await?;
        tx.commit()
            .await
            .context("failed to commit fetch transaction")?;
        Ok(rows)
    }

    /// Run a count and a row statement in one transaction.
    pub async fn count_and_fetch<T>(
        &self,
        count: BoundStatement,
        rows: BoundStatement,
    ) -> Result<(u64, Vec<T>)>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut tx = self.begin().await?;
        let total = count_in(&mut tx, count).await?;
        let rows = fetch_in(&mut tx, rows).await?;

        tx.commit()
            .await
            .context("failed to commit report transaction")?;
        Ok((total, rows))
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;

        // SET LOCAL resets on commit/rollback. The value is a number from
        // configuration, never user input.
        let timeout_ms = self.statement_timeout.as_millis();
        sqlx::query(&format!("SET LOCAL statement_timeout = {timeout_ms}"))
            .execute(&mut *tx)
            .await
            .context("failed to set statement timeout")?;

        Ok(tx)
    }
}

async fn count_in(
    tx: &mut Transaction<'static, Postgres>,
    statement: BoundStatement,
) -> Result<u64> {
    let BoundStatement { sql, args } = statement;
    tracing::debug!(%sql, "executing count query");

    let total: i64 = sqlx::query_scalar_with(&sql, args)
        .fetch_one(&mut **tx)
        .await
        .context("failed to execute count query")?;

    u64::try_from(total).context("count query returned a negative total")
}

async fn fetch_in<T>(
    tx: &mut Transaction<'static, Postgres>,
    statement: BoundStatement,
) -> Result<Vec<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let BoundStatement { sql, args } = statement;
    tracing::debug!(%sql, "executing row query");

    sqlx::query_as_with::<_, T, _>(&sql, args)
        .fetch_all(&mut **tx)
        .await
        .context("failed to execute row query")
}

/// Convert SeaQuery values into sqlx arguments.
///
/// Unsigned values (SeaQuery's LIMIT/OFFSET) are narrowed to BIGINT since
/// PostgreSQL has no unsigned types.
pub(crate) fn pg_arguments(values: Values) -> Result<PgArguments> {
    let mut args = PgArguments::default();

    for value in values.0 {
        let bound = match value {
            Value::Bool(v) => args.add(v),
            Value::SmallInt(v) => args.add(v),
            Value::Int(v) => args.add(v),
            Value::BigInt(v) => args.add(v),
            Value::SmallUnsigned(v) => args.add(v.map(i32::from)),
            Value::Unsigned(v) => args.add(v.map(i64::from)),
            Value::BigUnsigned(v) => {
                let v = v
                    .map(i64::try_from)
                    .transpose()
                    .context("unsigned parameter does not fit in BIGINT")?;
                args.add(v)
            }
            Value::Float(v) => args.add(v),
            Value::Double(v) => args.add(v),
            Value::String(v) => args.add(v.map(|s| *s)),
            other => bail!("unsupported query parameter: {other:?}"),
        };
        bound.map_err(|e| anyhow!("failed to bind query parameter: {e}"))?;
    }

    Ok(args)
}
