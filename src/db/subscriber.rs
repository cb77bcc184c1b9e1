use sqlx::mysql::MySqlPool;

use crate::models::Subscriber;

type SubscriberRow = (u64, String, bool);

fn from_row((user_id, username, active): SubscriberRow) -> Subscriber {
    Subscriber {
        user_id,
        username,
        active,
    }
}

/// Create or update a subscriber keyed by Discord user ID
pub async fn save_subscriber(pool: &MySqlPool, subscriber: &Subscriber) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO subscriber (user_id, username, active) VALUES (?, ?, ?) \
         ON DUPLICATE KEY UPDATE username = VALUES(username), active = VALUES(active)",
    )
    .bind(subscriber.user_id)
    .bind(&subscriber.username)
    .bind(subscriber.active)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get subscriber by Discord user ID
pub async fn get_subscriber(pool: &MySqlPool, user_id: u64) -> Result<Option<Subscriber>, sqlx::Error> {
    let row = sqlx::query_as::<_, SubscriberRow>(
        "SELECT user_id, username, active FROM subscriber WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(from_row))
}

/// Get all subscribers that still want scheduled updates
pub async fn get_active_subscribers(pool: &MySqlPool) -> Result<Vec<Subscriber>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SubscriberRow>(
        "SELECT user_id, username, active FROM subscriber WHERE active = TRUE",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(from_row).collect())
}

/// Count all known subscribers, active or not
pub async fn count_subscribers(pool: &MySqlPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscriber")
        .fetch_one(pool)
        .await
}
