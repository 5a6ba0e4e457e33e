mod config;
mod error;
mod models;
mod store;

pub use config::{CouchConfig, CouchCredentials};
pub use error::CouchDaoError;
pub use store::CouchParticipantTable;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::ParticipantMissing { id } => StorageError::NotFound { id },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
