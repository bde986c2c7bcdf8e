use crate::config::{MongoConfig, SERVICE_NAME};
use mongodb::{bson::doc, options::ClientOptions, Client as MongoClient, Database};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoDb {
    db: Database,
}

impl MongoDb {
    /// Connects and pings the server, both bounded by `connect_timeout`.
    pub async fn connect(config: &MongoConfig) -> Result<Self, AppError> {
        tracing::info!(database = %config.database, "Connecting to MongoDB");

        let mut client_options = ClientOptions::parse(&config.uri).await.map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::from(e)
        })?;
        client_options.app_name = Some(SERVICE_NAME.to_string());
        client_options.connect_timeout = Some(config.connect_timeout);
        client_options.server_selection_timeout = Some(config.connect_timeout);

        let client = MongoClient::with_options(client_options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(&config.database);

        let ping = db.run_command(doc! { "ping": 1 }, None);
        tokio::time::timeout(config.connect_timeout, ping)
            .await
            .map_err(|_| {
                tracing::error!(
                    timeout = ?config.connect_timeout,
                    "Timed out waiting for MongoDB to answer ping"
                );
                AppError::DatabaseError(anyhow::anyhow!(
                    "could not ping mongo client within {:?}",
                    config.connect_timeout
                ))
            })?
            .map_err(|e| {
                tracing::error!("Failed to ping MongoDB: {}", e);
                AppError::from(e)
            })?;

        tracing::info!(database = %config.database, "Successfully connected to MongoDB database");
        Ok(Self { db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
