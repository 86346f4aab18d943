use std::sync::Arc;

use tailor_market::{
    auth::profiles::{ProfileLoader, ProfileRepository, RetryPolicy},
    auth::session::{Session, UserMetadata},
    config::AppConfig,
    db::{self, orders::OrderRepository, orders::PgOrderRepository, profiles::PgProfileRepository},
    models::booking::{BookingDraft, Measurements, NewOrder},
    models::profile::{NewProfile, UserRole},
    services::drafts::{self, DraftScope, DraftStore, RedisDraftStore},
};
use uuid::Uuid;

/// Integration test: profile repair, order creation and Redis drafts
///
/// Note: This requires a running PostgreSQL and Redis instance
/// configured via environment variables.
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_full_integration() {
    let config = AppConfig::from_env().expect("Failed to load config");

    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run migrations");

    let profiles = Arc::new(PgProfileRepository::new(db_pool.clone()));
    let orders = PgOrderRepository::new(db_pool.clone());

    // Tailor created directly, customer repaired from sign-up metadata
    let tailor_id = Uuid::new_v4();
    profiles
        .create_profile(&NewProfile {
            id: tailor_id,
            email: format!("{tailor_id}@example.com"),
            full_name: "Integration Tailor".to_string(),
            role: UserRole::Tailor,
        })
        .await
        .expect("Failed to create tailor");

    let customer_id = Uuid::new_v4();
    let session = Session {
        user_id: customer_id,
        email: Some(format!("{customer_id}@example.com")),
        metadata: UserMetadata {
            full_name: None,
            role: Some(UserRole::Customer),
        },
        expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
    };
    let loader = ProfileLoader::new(profiles.clone(), RetryPolicy::default());
    let customer = loader.load(&session).await.expect("Profile repair failed");
    assert_eq!(customer.role, UserRole::Customer);
    assert_eq!(customer.full_name, customer_id.to_string());

    let customer_rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM customer_profiles WHERE user_id = $1")
            .bind(customer_id)
            .fetch_one(&db_pool)
            .await
            .expect("Failed to count customer rows");
    assert_eq!(customer_rows, 1);

    assert!(orders.tailor_exists(tailor_id).await.unwrap());
    assert!(!orders.tailor_exists(customer_id).await.unwrap());

    let order_id = orders
        .create_order(&NewOrder {
            customer_id,
            tailor_id,
            garment_type: "Suit".to_string(),
            fabric_type: Some("Wool".to_string()),
            notes: None,
            measurements: Measurements {
                chest: 100.0,
                ..Measurements::default()
            },
            tryon_image_url: None,
        })
        .await
        .expect("Failed to create order");

    let (status, price): (String, f64) = sqlx::query_as(
        r#"
        SELECT o.status, i.price::float8
        FROM orders o JOIN order_items i ON i.order_id = o.id
        WHERE o.id = $1
        "#,
    )
    .bind(order_id)
    .fetch_one(&db_pool)
    .await
    .expect("Failed to read order");
    assert_eq!(status, "pending");
    assert_eq!(price, 0.0);

    // Redis drafts
    let redis_url = config.redis_url.expect("REDIS_URL must be set");
    let store = RedisDraftStore::new(&redis_url).expect("Failed to initialize Redis");
    store.health_check().await.expect("Redis unreachable");

    let scope = DraftScope::new(customer_id, tailor_id);
    let draft = BookingDraft {
        garment_type: "Suit".to_string(),
        step: 2,
        ..BookingDraft::default()
    };
    drafts::save_draft(&store, &scope, &draft).await.unwrap();
    assert_eq!(drafts::load_draft(&store, &scope).await.unwrap(), Some(draft));

    drafts::delete_draft(&store, &scope).await.unwrap();
    assert_eq!(drafts::load_draft(&store, &scope).await.unwrap(), None);

    // Cleanup
    sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(order_id)
        .execute(&db_pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM profiles WHERE id = ANY($1)")
        .bind(vec![customer_id, tailor_id])
        .execute(&db_pool)
        .await
        .unwrap();
}
