use crate::entities::{
    cv_education, cv_experience, cv_level, cv_license_certificate, cv_portfolio, cv_portfolio_url,
    cv_profile, cv_skill, users,
};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::info;

pub async fn setup_database(db_url: &str) -> anyhow::Result<DatabaseConnection> {
    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    // Order matters for foreign keys: users, cv_level -> cv_* -> cv_portfolio_url
    let stmts = vec![
        (
            "users",
            schema
                .create_table_from_entity(users::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "cv_level",
            schema
                .create_table_from_entity(cv_level::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "cv_profile",
            schema
                .create_table_from_entity(cv_profile::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "cv_education",
            schema
                .create_table_from_entity(cv_education::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "cv_experience",
            schema
                .create_table_from_entity(cv_experience::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "cv_portfolio",
            schema
                .create_table_from_entity(cv_portfolio::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "cv_skill",
            schema
                .create_table_from_entity(cv_skill::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "cv_license_certificate",
            schema
                .create_table_from_entity(cv_license_certificate::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "cv_portfolio_url",
            schema
                .create_table_from_entity(cv_portfolio_url::Entity)
                .if_not_exists()
                .to_owned(),
        ),
    ];

    for (name, stmt) in stmts {
        let stmt = builder.build(&stmt);
        db.execute(stmt).await?;
        info!("   - Table '{}' checked/created", name);
    }

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_cv_education_users_id ON cv_education(users_id)",
        "CREATE INDEX IF NOT EXISTS idx_cv_experience_users_id ON cv_experience(users_id)",
        "CREATE INDEX IF NOT EXISTS idx_cv_portfolio_users_id ON cv_portfolio(users_id)",
        "CREATE INDEX IF NOT EXISTS idx_cv_skill_users_id ON cv_skill(users_id)",
        "CREATE INDEX IF NOT EXISTS idx_cv_license_certificate_users_id ON cv_license_certificate(users_id)",
        "CREATE INDEX IF NOT EXISTS idx_cv_portfolio_url_portfolio_id ON cv_portfolio_url(portfolio_id)",
    ];

    for query in indexes {
        if let Err(e) = db
            .execute(sea_orm::Statement::from_string(builder, query.to_owned()))
            .await
        {
            tracing::warn!("   - Index creation warning: {} -> {}", query, e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::EntityTrait;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        run_migrations(&db).await.unwrap();
        run_migrations(&db).await.unwrap();

        let rows = users::Entity::find().all(&db).await.unwrap();
        assert!(rows.is_empty());
    }
}
