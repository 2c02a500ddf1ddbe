use sqlx::Row;

fn database_url() -> Option<String> {
    dotenvy::dotenv().ok();

    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            return Some(url);
        }
    }

    let password = std::env::var("POSTGRES_PASSWORD").ok()?;
    if password.trim().is_empty() {
        return None;
    }
    let server = std::env::var("POSTGRES_SERVER").unwrap_or_else(|_| "localhost".into());
    let port = std::env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".into());
    let user = std::env::var("POSTGRES_USER").unwrap_or_else(|_| "kviz".into());
    let db = std::env::var("POSTGRES_DB").unwrap_or_else(|_| "kviz_db".into());

    Some(format!("postgresql://{user}:{password}@{server}:{port}/{db}"))
}

#[tokio::test]
async fn migrations_apply_and_tables_exist() -> anyhow::Result<()> {
    let database_url = match database_url() {
        Some(url) => url,
        None => {
            eprintln!("skipping: DATABASE_URL and POSTGRES_* are not set");
            return Ok(());
        }
    };

    let pool =
        sqlx::postgres::PgPoolOptions::new().max_connections(1).connect(&database_url).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new("migrations")).await?;
    migrator.run(&pool).await?;

    let tables = ["users", "students", "tests", "questions", "exam_sessions", "attempts"];
    for table in tables {
        let row = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name = $1",
        )
        .bind(table)
        .fetch_one(&pool)
        .await?;
        let count: i64 = row.get("cnt");
        assert_eq!(count, 1, "table {table} missing after migrations");
    }

    Ok(())
}
