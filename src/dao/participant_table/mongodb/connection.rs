use mongodb::{Client, Database, bson::doc};

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

/// Open a client on the configured database and check it answers a ping.
///
/// A single attempt only; the storage supervisor owns retry and backoff.
pub async fn open(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    ping(&database).await.map_err(|source| MongoDaoError::Unreachable {
        database: config.database_name.clone(),
        source,
    })?;
    Ok((client, database))
}

/// Round-trip a `ping` command.
pub async fn ping(database: &Database) -> Result<(), mongodb::error::Error> {
    database.run_command(doc! { "ping": 1 }).await.map(|_| ())
}
