/// CouchDB backed table.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process table.
pub mod memory;
/// MongoDB backed table.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::{future::BoxFuture, stream::BoxStream};

use crate::dao::models::{
    ChangeEvent, NewParticipantEntity, ParticipantEntity, ParticipantPatchEntity,
};
use crate::dao::storage::StorageResult;

/// Abstraction over the remote table holding participant records.
///
/// Implementations own identity assignment and timestamps, keep a stored
/// `total_score` in sync with the rounds, and publish every write (from any
/// client) on the change feed returned by [`ParticipantTable::subscribe`].
pub trait ParticipantTable: Send + Sync {
    /// Read every record, ordered by stored total score descending.
    fn fetch_ranked(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Insert a record and return the identifier assigned to it.
    fn insert(&self, participant: NewParticipantEntity) -> BoxFuture<'static, StorageResult<String>>;
    /// Apply a partial update to an existing record.
    fn update(&self, id: String, patch: ParticipantPatchEntity)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Remove an existing record.
    fn delete(&self, id: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Open a push feed yielding changes made after the call.
    fn subscribe(&self) -> BoxStream<'static, StorageResult<ChangeEvent>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Stable descending sort on stored totals, used by backends without server-side ordering.
pub(crate) fn sort_by_stored_total(records: &mut [ParticipantEntity]) {
    records.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
