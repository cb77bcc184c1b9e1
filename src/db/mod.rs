use async_trait::async_trait;
use sqlx::mysql::MySqlPool;
use tracing::{debug, info, warn};

use crate::models::{Quote, Subscriber};

pub mod currency;
pub mod subscriber;

const MIGRATIONS_FILE: &str = "migrations/create_tables.sql";

/// Latest price per symbol, last write wins
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn upsert(&self, quote: &Quote) -> Result<(), sqlx::Error>;
}

/// Who receives scheduled updates
#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    async fn save(&self, subscriber: &Subscriber) -> Result<(), sqlx::Error>;
    async fn get(&self, user_id: u64) -> Result<Option<Subscriber>, sqlx::Error>;
    async fn list_active(&self) -> Result<Vec<Subscriber>, sqlx::Error>;
    async fn count(&self) -> Result<i64, sqlx::Error>;
}

/// MySQL-backed implementation of both stores
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceStore for MySqlStore {
    async fn upsert(&self, quote: &Quote) -> Result<(), sqlx::Error> {
        debug!(symbol = %quote.symbol, "Saving currency");
        currency::upsert_price(&self.pool, quote).await
    }
}

#[async_trait]
impl SubscriberDirectory for MySqlStore {
    async fn save(&self, subscriber: &Subscriber) -> Result<(), sqlx::Error> {
        debug!(user_id = subscriber.user_id, active = subscriber.active, "Saving subscriber");
        subscriber::save_subscriber(&self.pool, subscriber).await
    }

    async fn get(&self, user_id: u64) -> Result<Option<Subscriber>, sqlx::Error> {
        subscriber::get_subscriber(&self.pool, user_id).await
    }

    async fn list_active(&self) -> Result<Vec<Subscriber>, sqlx::Error> {
        subscriber::get_active_subscribers(&self.pool).await
    }

    async fn count(&self) -> Result<i64, sqlx::Error> {
        subscriber::count_subscribers(&self.pool).await
    }
}

/// Initialize the MySQL connection pool and create tables
pub async fn init_db(database_url: &str) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPool::connect(database_url).await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Apply the idempotent schema file
pub async fn run_migrations(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    let sql_content = match std::fs::read_to_string(MIGRATIONS_FILE) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {}: {}", MIGRATIONS_FILE, e);
            return Ok(());
        }
    };

    let mut applied = 0;
    for statement in split_statements(&sql_content) {
        sqlx::raw_sql(statement).execute(pool).await?;
        applied += 1;
    }

    info!(statements = applied, "Migrations applied");
    Ok(())
}

/// Split a schema file on `;`, dropping blank statements and `--` comment lines
fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| {
            stmt.lines()
                .any(|line| !line.trim().is_empty() && !line.trim_start().starts_with("--"))
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_statements_skips_comments_and_blanks() {
        let sql = "-- schema\nCREATE TABLE a (id INT);\n\n  ;\nCREATE TABLE b (id INT);\n-- trailing\n";

        let statements = split_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].ends_with("CREATE TABLE a (id INT)"));
        assert_eq!(statements[1], "CREATE TABLE b (id INT)");
    }
}
