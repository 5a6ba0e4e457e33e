use std::{sync::Arc, time::SystemTime};

use async_stream::stream;
use futures::{StreamExt, TryStreamExt, future::BoxFuture, stream::BoxStream};
use mongodb::{
    Client, Collection, Database,
    bson::doc,
    options::{FullDocumentType, IndexOptions},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::{open, ping},
    error::{MongoDaoError, MongoResult},
    models::{MongoParticipantDocument, change_from_parts, doc_id, update_pipeline},
};
use crate::dao::{
    models::{ChangeEvent, NewParticipantEntity, ParticipantEntity, ParticipantPatchEntity},
    participant_table::ParticipantTable,
    storage::{StorageError, StorageResult},
};

const RANK_INDEX_NAME: &str = "participant_rank_idx";

/// Participant table backed by a MongoDB collection.
///
/// The push feed relies on change streams, so the server must run as a replica set.
#[derive(Clone)]
pub struct MongoParticipantTable {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        ping(&database)
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = open(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoParticipantTable {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = open(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let table = Self { inner };
        table.ensure_indexes().await?;
        Ok(table)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"total_score": -1, "created_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some(RANK_INDEX_NAME.to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: self.inner.config.collection_name.clone(),
                index: RANK_INDEX_NAME,
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoParticipantDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoParticipantDocument>(&self.inner.config.collection_name)
    }

    async fn fetch_ranked(&self) -> MongoResult<Vec<ParticipantEntity>> {
        let collection = self.collection().await;

        let documents: Vec<MongoParticipantDocument> = collection
            .find(doc! {})
            .sort(doc! {"total_score": -1, "created_at": 1})
            .await
            .map_err(|source| MongoDaoError::ListParticipants { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListParticipants { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, participant: NewParticipantEntity) -> MongoResult<String> {
        let id = Uuid::new_v4().to_string();
        let entity = ParticipantEntity::from_new(id.clone(), participant, SystemTime::now());
        let document = MongoParticipantDocument::from(entity);

        self.collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::InsertParticipant { source })?;

        Ok(id)
    }

    async fn update(&self, id: &str, patch: &ParticipantPatchEntity) -> MongoResult<()> {
        let result = self
            .collection()
            .await
            .update_one(doc_id(id), update_pipeline(patch))
            .await
            .map_err(|source| MongoDaoError::UpdateParticipant {
                id: id.to_owned(),
                source,
            })?;

        if result.matched_count == 0 {
            return Err(MongoDaoError::ParticipantMissing { id: id.to_owned() });
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> MongoResult<()> {
        let result = self
            .collection()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteParticipant {
                id: id.to_owned(),
                source,
            })?;

        if result.deleted_count == 0 {
            return Err(MongoDaoError::ParticipantMissing { id: id.to_owned() });
        }
        Ok(())
    }
}

impl ParticipantTable for MongoParticipantTable {
    fn fetch_ranked(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let table = self.clone();
        Box::pin(async move { table.fetch_ranked().await.map_err(Into::into) })
    }

    fn insert(&self, participant: NewParticipantEntity) -> BoxFuture<'static, StorageResult<String>> {
        let table = self.clone();
        Box::pin(async move { table.insert(participant).await.map_err(Into::into) })
    }

    fn update(
        &self,
        id: String,
        patch: ParticipantPatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let table = self.clone();
        Box::pin(async move { table.update(&id, &patch).await.map_err(Into::into) })
    }

    fn delete(&self, id: String) -> BoxFuture<'static, StorageResult<()>> {
        let table = self.clone();
        Box::pin(async move { table.delete(&id).await.map_err(Into::into) })
    }

    fn subscribe(&self) -> BoxStream<'static, StorageResult<ChangeEvent>> {
        let table = self.clone();
        Box::pin(stream! {
            let collection = table.collection().await;
            let opened = collection
                .watch()
                .full_document(FullDocumentType::UpdateLookup)
                .await;
            let mut changes = match opened {
                Ok(changes) => changes,
                Err(source) => {
                    yield Err(StorageError::from(MongoDaoError::Watch { source }));
                    return;
                }
            };

            while let Some(item) = changes.next().await {
                match item {
                    Ok(event) => {
                        if let Some(change) =
                            change_from_parts(event.operation_type, event.full_document, event.document_key)
                        {
                            yield Ok(change);
                        }
                    }
                    Err(source) => yield Err(StorageError::from(MongoDaoError::Watch { source })),
                }
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let table = self.clone();
        Box::pin(async move { table.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let table = self.clone();
        Box::pin(async move { table.inner.reconnect().await.map_err(Into::into) })
    }
}
