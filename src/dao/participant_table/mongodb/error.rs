use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result alias for MongoDB table operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures raised by the MongoDB participant table.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// A required setting is absent from the environment.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    /// The driver rejected the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    /// The server did not answer the connect-time ping.
    #[error("MongoDB database `{database}` is unreachable")]
    Unreachable {
        database: String,
        #[source]
        source: MongoError,
    },
    /// A periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    /// The rank index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: String,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    /// Reading the ranked table failed.
    #[error("failed to list participants")]
    ListParticipants {
        #[source]
        source: MongoError,
    },
    /// Inserting a record failed.
    #[error("failed to insert participant")]
    InsertParticipant {
        #[source]
        source: MongoError,
    },
    /// Updating a record failed.
    #[error("failed to update participant `{id}`")]
    UpdateParticipant {
        id: String,
        #[source]
        source: MongoError,
    },
    /// Deleting a record failed.
    #[error("failed to delete participant `{id}`")]
    DeleteParticipant {
        id: String,
        #[source]
        source: MongoError,
    },
    /// No record has the requested id.
    #[error("participant `{id}` not found")]
    ParticipantMissing { id: String },
    /// The change stream could not be opened or broke.
    #[error("participant change stream failed")]
    Watch {
        #[source]
        source: MongoError,
    },
}
