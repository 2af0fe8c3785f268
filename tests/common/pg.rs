use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

/// A throwaway database with migrations applied.
pub struct TestDb {
    pub pool: PgPool,
    pub db_name: String,
    admin_url: String,
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Create a fresh test database, or `None` when `DATABASE_URL` is not set.
pub async fn spawn_db() -> Option<TestDb> {
    let _ = dotenvy::dotenv();

    let Ok(base_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres store test");
        return None;
    };

    let db_name = format!("crosspost_test_{}", Uuid::now_v7().simple());
    let admin_url = admin_url(&base_url);

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    Some(TestDb {
        pool,
        db_name,
        admin_url,
    })
}

/// Drop the test database after the test completes.
pub async fn cleanup(db: TestDb) {
    db.pool.close().await;

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&db.admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!(
        "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
        db.db_name
    ))
    .execute(&admin_pool)
    .await;

    admin_pool.close().await;
}
