//! PostgreSQL client for the WRDS data service.

use crate::error::Result;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};

/// Default WRDS PostgreSQL host.
pub const WRDS_HOST: &str = "wrds-pgdata.wharton.upenn.edu";
/// Default WRDS PostgreSQL port.
pub const WRDS_PORT: u16 = 9737;
/// Default WRDS database name.
pub const WRDS_DB: &str = "wrds";

/// Connection to the WRDS PostgreSQL endpoint.
#[derive(Debug, Clone)]
pub struct WrdsClient {
    pool: PgPool,
}

impl WrdsClient {
    /// Connect to the standard WRDS endpoint with username/password
    /// credentials. WRDS requires TLS.
    pub async fn connect(username: &str, password: &str) -> Result<Self> {
        Self::connect_with(WRDS_HOST, WRDS_PORT, WRDS_DB, username, password).await
    }

    /// Connect to a specific host/port/database (useful for testing
    /// against a local mirror).
    pub async fn connect_with(
        host: &str,
        port: u16,
        database: &str,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database)
            .username(username)
            .password(password)
            .ssl_mode(PgSslMode::Prefer);

        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Run a raw SQL query and return all rows.
    pub async fn query(&self, sql: &str) -> Result<Vec<PgRow>> {
        Ok(sqlx::query(sql).fetch_all(&self.pool).await?)
    }
}
