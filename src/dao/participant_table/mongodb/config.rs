use std::{env, time::Duration};

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DB: &str = "scoreboard";
const DEFAULT_COLLECTION: &str = "participants";
/// Bounds a single connect attempt so the supervisor's backoff stays in charge.
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the participant collection lives.
#[derive(Clone)]
pub struct MongoConfig {
    /// Parsed driver options, with a short server selection timeout.
    pub options: ClientOptions,
    /// Database holding the participant collection.
    pub database_name: String,
    /// Collection storing one document per participant.
    pub collection_name: String,
}

impl MongoConfig {
    /// Parse `uri`, falling back to the default database and collection names.
    pub async fn from_uri(
        uri: &str,
        database: Option<&str>,
        collection: Option<&str>,
    ) -> MongoResult<Self> {
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;
        options
            .server_selection_timeout
            .get_or_insert(SERVER_SELECTION_TIMEOUT);
        options.app_name.get_or_insert_with(|| "scoreboard-back".to_owned());

        Ok(Self {
            options,
            database_name: non_blank(database).unwrap_or(DEFAULT_DB).to_owned(),
            collection_name: non_blank(collection)
                .unwrap_or(DEFAULT_COLLECTION)
                .to_owned(),
        })
    }

    /// Read `MONGO_URI` (required), `MONGO_DB` and `MONGO_COLLECTION`.
    pub async fn from_env() -> MongoResult<Self> {
        let uri = env::var("MONGO_URI")
            .map_err(|_| MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        let database = env::var("MONGO_DB").ok();
        let collection = env::var("MONGO_COLLECTION").ok();
        Self::from_uri(&uri, database.as_deref(), collection.as_deref()).await
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
