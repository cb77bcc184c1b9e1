use sqlx::mysql::MySqlPool;

use crate::models::Quote;

/// Insert or replace the latest price for a symbol
pub async fn upsert_price(pool: &MySqlPool, quote: &Quote) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO currency_price (symbol, price, updated_at) VALUES (?, ?, ?) \
         ON DUPLICATE KEY UPDATE price = VALUES(price), updated_at = VALUES(updated_at)",
    )
    .bind(quote.symbol.as_str())
    .bind(&quote.price)
    .bind(quote.observed_at)
    .execute(pool)
    .await?;

    Ok(())
}
