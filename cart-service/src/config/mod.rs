use service_core::config as core_config;
use std::env;
use std::time::Duration;

pub const SERVICE_NAME: &str = "cart-service";

/// Prefix of the database environment variables.
pub const ENV_PREFIX: &str = "CARTAPI";

pub const DEFAULT_PORT: u16 = 27000;
pub const DEFAULT_CONNECTION_STRING: &str = "mongodb://localhost:27018";
pub const DEFAULT_DATABASE: &str = "cart_api";
pub const DEFAULT_COLLECTION: &str = "carts";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Shared settings plus the cart-specific ones. Only the shared part comes
/// from the config file and `APP__*`; the rest is fixed or read from `CARTAPI_*`.
#[derive(Debug, Clone)]
pub struct CartConfig {
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub request_timeout: Duration,
    pub shutdown_grace_period: Duration,
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// Deadline for the initial connection handshake.
    pub connect_timeout: Duration,
}

impl MongoConfig {
    /// Picks the database from `CARTAPI_CONNECTION_STRING` / `CARTAPI_DB_NAME`.
    ///
    /// The pair is only honoured when both values are present; otherwise both
    /// fall back to the local defaults.
    pub fn resolve(connection_string: Option<String>, database: Option<String>) -> Self {
        let connection_string = connection_string.filter(|v| !v.is_empty());
        let database = database.filter(|v| !v.is_empty());

        let (uri, database) = match (connection_string, database) {
            (Some(uri), Some(database)) => (uri, database),
            (None, None) => (
                DEFAULT_CONNECTION_STRING.to_string(),
                DEFAULT_DATABASE.to_string(),
            ),
            (uri, database) => {
                tracing::warn!(
                    connection_string_set = uri.is_some(),
                    db_name_set = database.is_some(),
                    "{}_CONNECTION_STRING and {}_DB_NAME must both be set; using defaults",
                    ENV_PREFIX,
                    ENV_PREFIX
                );
                (
                    DEFAULT_CONNECTION_STRING.to_string(),
                    DEFAULT_DATABASE.to_string(),
                )
            }
        };

        Self {
            uri,
            database,
            collection: DEFAULT_COLLECTION.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

impl CartConfig {
    /// Completes already-loaded shared settings with the cart-specific ones.
    pub fn with_common(common: core_config::Config) -> Self {
        let mongodb = MongoConfig::resolve(
            env::var(format!("{}_CONNECTION_STRING", ENV_PREFIX)).ok(),
            env::var(format!("{}_DB_NAME", ENV_PREFIX)).ok(),
        );

        CartConfig {
            common,
            mongodb,
            request_timeout: REQUEST_TIMEOUT,
            shutdown_grace_period: SHUTDOWN_GRACE_PERIOD,
            service_name: SERVICE_NAME.to_string(),
        }
    }
}
