use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::auth::profiles::ProfileRepository;
use crate::models::profile::{NewProfile, Profile, UserRole};

/// Profiles stored in PostgreSQL.
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, email, full_name, role, avatar_url, created_at, updated_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn create_profile(&self, profile: &NewProfile) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, full_name, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(profile.role.to_string())
        .execute(&mut *tx)
        .await?;

        let role_table = match profile.role {
            UserRole::Tailor => Some("tailor_profiles"),
            UserRole::Customer => Some("customer_profiles"),
            UserRole::Admin => None,
        };

        if let Some(table) = role_table {
            sqlx::query(&format!(
                "INSERT INTO {table} (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING"
            ))
            .bind(profile.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }
}

fn profile_from_row(row: &PgRow) -> Result<Profile, sqlx::Error> {
    let role: String = row.try_get("role")?;
    let role = UserRole::from_str(&role).map_err(|e| sqlx::Error::ColumnDecode {
        index: "role".to_string(),
        source: Box::new(e),
    })?;

    Ok(Profile {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        role,
        avatar_url: row.try_get("avatar_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
