//! Test utilities with testcontainers support
//!
//! Every caller gets its own container, kept alive by the returned handle.
//! Tests that use them are `#[ignore]`d because they require Docker.

pub mod containers {
    use sqlx::PgPool;
    use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
    use testcontainers_modules::{postgres::Postgres, redis::Redis};

    /// Start PostgreSQL and return a migrated pool
    pub async fn postgres() -> (ContainerAsync<Postgres>, PgPool) {
        let container = Postgres::default()
            .with_user("grader")
            .with_password("grader_test")
            .with_db_name("grader_test")
            .with_tag("16-alpine")
            .start()
            .await
            .expect("Failed to start PostgreSQL container");

        let host = container.get_host().await.unwrap();
        let port = container.get_host_port_ipv4(5432).await.unwrap();
        let url = format!("postgres://grader:grader_test@{}:{}/grader_test", host, port);

        let pool = PgPool::connect(&url)
            .await
            .expect("Failed to connect to test database");
        crate::db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        (container, pool)
    }

    /// Start Redis and return its connection URL
    pub async fn redis() -> (ContainerAsync<Redis>, String) {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let host = container.get_host().await.unwrap();
        let port = container.get_host_port_ipv4(6379).await.unwrap();

        (container, format!("redis://{}:{}", host, port))
    }
}
