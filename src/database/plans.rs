use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Plan, Subscription};

const PLAN_COLUMNS: &str = "id, name, price, max_clients, max_storage_mb, max_team, created_at";

/// Catalog ordered by price, then name
pub async fn list<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Plan>, DatabaseError> {
    let plans = sqlx::query_as::<_, Plan>(&format!("SELECT {} FROM plans ORDER BY price ASC, name ASC", PLAN_COLUMNS))
        .fetch_all(executor)
        .await?;

    Ok(plans)
}

pub async fn find_by_name<'e, E: PgExecutor<'e>>(executor: E, name: &str) -> Result<Option<Plan>, DatabaseError> {
    let plan = sqlx::query_as::<_, Plan>(&format!("SELECT {} FROM plans WHERE name = $1", PLAN_COLUMNS))
        .bind(name)
        .fetch_optional(executor)
        .await?;

    Ok(plan)
}

/// Insert or update a plan by name
pub async fn upsert<'e, E: PgExecutor<'e>>(
    executor: E,
    name: &str,
    price: Decimal,
    max_clients: Option<i32>,
    max_storage_mb: Option<i32>,
    max_team: Option<i32>,
) -> Result<Plan, DatabaseError> {
    let plan = sqlx::query_as::<_, Plan>(&format!(
        "INSERT INTO plans (name, price, max_clients, max_storage_mb, max_team)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (name) DO UPDATE SET
             price = EXCLUDED.price,
             max_clients = EXCLUDED.max_clients,
             max_storage_mb = EXCLUDED.max_storage_mb,
             max_team = EXCLUDED.max_team
         RETURNING {}",
        PLAN_COLUMNS
    ))
    .bind(name)
    .bind(price)
    .bind(max_clients)
    .bind(max_storage_mb)
    .bind(max_team)
    .fetch_one(executor)
    .await?;

    Ok(plan)
}

#[derive(FromRow)]
struct CurrentSubscriptionRow {
    #[sqlx(flatten)]
    subscription: Subscription,
    plan_name: String,
    plan_price: Decimal,
    plan_max_clients: Option<i32>,
    plan_max_storage_mb: Option<i32>,
    plan_max_team: Option<i32>,
    plan_created_at: DateTime<Utc>,
}

/// Latest-started subscription that is active and has not ended
pub async fn current_subscription<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<(Subscription, Plan)>, DatabaseError> {
    let row = sqlx::query_as::<_, CurrentSubscriptionRow>(
        "SELECT s.id, s.user_id, s.plan_id, s.is_active, s.starts_at, s.ends_at,
                s.provider_subscription_id, s.created_at,
                p.name AS plan_name, p.price AS plan_price, p.max_clients AS plan_max_clients,
                p.max_storage_mb AS plan_max_storage_mb, p.max_team AS plan_max_team,
                p.created_at AS plan_created_at
         FROM subscriptions s
         JOIN plans p ON p.id = s.plan_id
         WHERE s.user_id = $1 AND s.is_active AND s.ends_at > $2
         ORDER BY s.starts_at DESC, s.created_at DESC
         LIMIT 1",
    )
    .bind(user_id)
    .bind(now)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(|row| {
        let plan = Plan {
            id: row.subscription.plan_id,
            name: row.plan_name,
            price: row.plan_price,
            max_clients: row.plan_max_clients,
            max_storage_mb: row.plan_max_storage_mb,
            max_team: row.plan_max_team,
            created_at: row.plan_created_at,
        };
        (row.subscription, plan)
    }))
}

/// Operator grant; deactivates any other active subscription for the user
pub async fn grant_subscription(
    conn: &mut sqlx::PgConnection,
    user_id: Uuid,
    plan_id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Result<Subscription, DatabaseError> {
    sqlx::query("UPDATE subscriptions SET is_active = false WHERE user_id = $1 AND is_active")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let subscription = sqlx::query_as::<_, Subscription>(
        "INSERT INTO subscriptions (user_id, plan_id, is_active, starts_at, ends_at)
         VALUES ($1, $2, true, $3, $4)
         RETURNING id, user_id, plan_id, is_active, starts_at, ends_at, provider_subscription_id, created_at",
    )
    .bind(user_id)
    .bind(plan_id)
    .bind(starts_at)
    .bind(ends_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(subscription)
}
