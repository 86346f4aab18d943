use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::booking::NewOrder;

/// Order persistence used by booking submission.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// True when `tailor_id` names a profile with the tailor role.
    async fn tailor_exists(&self, tailor_id: Uuid) -> Result<bool, sqlx::Error>;

    /// Insert the order and its item atomically, returning the order id.
    async fn create_order(&self, order: &NewOrder) -> Result<Uuid, sqlx::Error>;
}

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn tailor_exists(&self, tailor_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE id = $1 AND role = 'tailor')",
        )
        .bind(tailor_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Uuid, sqlx::Error> {
        let measurements = serde_json::to_value(&order.measurements)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        // Dropping the transaction on an early return rolls it back
        let mut tx = self.pool.begin().await?;

        let order_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO orders (customer_id, tailor_id, status, total_amount, notes)
            VALUES ($1, $2, 'pending', 0, $3)
            RETURNING id
            "#,
        )
        .bind(order.customer_id)
        .bind(order.tailor_id)
        .bind(&order.notes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO order_items
                (order_id, garment_type, fabric_type, measurements, tryon_image_url, price)
            VALUES ($1, $2, $3, $4, $5, 0)
            "#,
        )
        .bind(order_id)
        .bind(&order.garment_type)
        .bind(&order.fabric_type)
        .bind(measurements)
        .bind(&order.tryon_image_url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            customer_id = %order.customer_id,
            tailor_id = %order.tailor_id,
            "Order created"
        );

        Ok(order_id)
    }
}
