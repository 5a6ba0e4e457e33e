use std::{sync::Arc, time::Duration, time::SystemTime};

use async_stream::stream;
use futures::{future::BoxFuture, stream::BoxStream};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::from_value;
use tokio::time::sleep;
use tracing::debug;

use crate::dao::{
    models::{ChangeEvent, NewParticipantEntity, ParticipantEntity, ParticipantPatchEntity},
    participant_table::{ParticipantTable, sort_by_stored_total},
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchOp, CouchResult},
    models::{
        AllDocsResponse, ChangesResponse, CouchParticipantDocument, DESIGN_PREFIX,
        ParticipantBody, WriteResponse, seq_param,
    },
};

const ALL_DOCS: &str = "_all_docs";
const CHANGES: &str = "_changes";
const MAX_WRITE_ATTEMPTS: u32 = 3;
const FEED_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Participant table stored as one CouchDB document per participant.
#[derive(Clone)]
pub struct CouchParticipantTable {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
    feed_timeout: Duration,
}

/// Result of a conditional document write.
enum WriteOutcome {
    Written,
    Conflict,
}

impl CouchParticipantTable {
    /// Build the HTTP client and make sure the participant database exists.
    ///
    /// One attempt only; the storage supervisor retries with backoff.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|source| CouchDaoError::Client { source })?;

        let table = Self {
            client,
            base_url: Arc::from(config.base_url),
            database: Arc::from(config.database),
            auth: config
                .credentials
                .map(|c| (Arc::<str>::from(c.username), Arc::<str>::from(c.password))),
            feed_timeout: config.feed_timeout,
        };

        table.ensure_database().await?;
        Ok(table)
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.authorize(self.client.request(method, url))
    }

    async fn send(&self, op: CouchOp, builder: RequestBuilder) -> CouchResult<Response> {
        builder
            .send()
            .await
            .map_err(|source| CouchDaoError::Transport { op, source })
    }

    async fn decode<T: DeserializeOwned>(op: CouchOp, response: Response) -> CouchResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|source| CouchDaoError::Decode { op, source })
    }

    /// `GET` the database, creating it on 404.
    async fn ensure_database(&self) -> CouchResult<()> {
        let op = CouchOp::EnsureDatabase;
        let url = self.database_url();
        let response = self.send(op, self.authorize(self.client.get(&url))).await?;

        let status = match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(database = %self.database, "creating participant database");
                self.send(op, self.authorize(self.client.put(&url)))
                    .await?
                    .status()
            }
            status => status,
        };

        // 412: created concurrently by another instance.
        if status.is_success() || status == StatusCode::PRECONDITION_FAILED {
            Ok(())
        } else {
            Err(CouchDaoError::Status { op, status })
        }
    }

    async fn get_document(&self, id: &str) -> CouchResult<Option<CouchParticipantDocument>> {
        let op = CouchOp::ReadParticipant;
        let response = self.send(op, self.request(Method::GET, id)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Self::decode(op, response).await.map(Some),
            status => Err(CouchDaoError::Status { op, status }),
        }
    }

    async fn require_document(&self, id: &str) -> CouchResult<CouchParticipantDocument> {
        self.get_document(id)
            .await?
            .ok_or_else(|| CouchDaoError::ParticipantMissing { id: id.to_string() })
    }

    async fn put_document(&self, document: &CouchParticipantDocument) -> CouchResult<WriteOutcome> {
        let op = CouchOp::WriteParticipant;
        let response = self
            .send(op, self.request(Method::PUT, &document.id).json(document))
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Ok(WriteOutcome::Conflict),
            status if status.is_success() => Ok(WriteOutcome::Written),
            status => Err(CouchDaoError::Status { op, status }),
        }
    }

    async fn delete_revision(&self, id: &str, rev: &str) -> CouchResult<WriteOutcome> {
        let op = CouchOp::DeleteParticipant;
        let response = self
            .send(op, self.request(Method::DELETE, id).query(&[("rev", rev)]))
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Ok(WriteOutcome::Conflict),
            StatusCode::NOT_FOUND => Err(CouchDaoError::ParticipantMissing { id: id.to_string() }),
            status if status.is_success() => Ok(WriteOutcome::Written),
            status => Err(CouchDaoError::Status { op, status }),
        }
    }

    async fn fetch_ranked(&self) -> CouchResult<Vec<ParticipantEntity>> {
        let op = CouchOp::ListParticipants;
        let response = self
            .send(
                op,
                self.request(Method::GET, ALL_DOCS)
                    .query(&[("include_docs", "true")]),
            )
            .await?;
        if !response.status().is_success() {
            return Err(CouchDaoError::Status {
                op,
                status: response.status(),
            });
        }
        let payload: AllDocsResponse = Self::decode(op, response).await?;

        let mut records = Vec::with_capacity(payload.rows.len());
        for row in payload.rows {
            if row.id.starts_with(DESIGN_PREFIX) {
                continue;
            }
            if let Some(doc) = row.doc {
                let parsed: CouchParticipantDocument =
                    from_value(doc).map_err(|source| CouchDaoError::MalformedDocument {
                        id: row.id.clone(),
                        source,
                    })?;
                records.push(parsed.into_entity());
            }
        }

        // `_all_docs` walks ids, so creation order is the closest stable tie-break we have.
        records.sort_by_key(|record| record.created_at);
        sort_by_stored_total(&mut records);
        Ok(records)
    }

    async fn insert(&self, participant: NewParticipantEntity) -> CouchResult<String> {
        let op = CouchOp::WriteParticipant;
        let entity = ParticipantEntity::from_new(String::new(), participant, SystemTime::now());
        let body = ParticipantBody::from(entity);
        let url = self.database_url();

        let response = self
            .send(op, self.authorize(self.client.post(&url)).json(&body))
            .await?;
        if !response.status().is_success() {
            return Err(CouchDaoError::Status {
                op,
                status: response.status(),
            });
        }

        let ack: WriteResponse = Self::decode(op, response).await?;
        Ok(ack.id)
    }

    async fn update(&self, id: &str, patch: &ParticipantPatchEntity) -> CouchResult<()> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let document = self.require_document(id).await?;
            let rev = document.rev.clone();
            let mut entity = document.into_entity();
            patch.apply_to(&mut entity);

            let document = CouchParticipantDocument::from_entity(entity, rev);
            match self.put_document(&document).await? {
                WriteOutcome::Written => return Ok(()),
                WriteOutcome::Conflict => debug!(id, attempt, "revision conflict on update"),
            }
        }

        Err(CouchDaoError::RevisionConflict {
            id: id.to_string(),
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    async fn delete(&self, id: &str) -> CouchResult<()> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let document = self.require_document(id).await?;
            let rev = document
                .rev
                .ok_or_else(|| CouchDaoError::ParticipantMissing { id: id.to_string() })?;

            match self.delete_revision(id, &rev).await? {
                WriteOutcome::Written => return Ok(()),
                WriteOutcome::Conflict => debug!(id, attempt, "revision conflict on delete"),
            }
        }

        Err(CouchDaoError::RevisionConflict {
            id: id.to_string(),
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    async fn poll_changes(&self, since: &str) -> CouchResult<ChangesResponse> {
        let op = CouchOp::PollChanges;
        let timeout_ms = self.feed_timeout.as_millis().to_string();
        let request = self.request(Method::GET, CHANGES).query(&[
            ("feed", "longpoll"),
            ("include_docs", "true"),
            ("since", since),
            ("timeout", timeout_ms.as_str()),
        ]);

        let response = self.send(op, request).await?;
        if !response.status().is_success() {
            return Err(CouchDaoError::Status {
                op,
                status: response.status(),
            });
        }
        Self::decode(op, response).await
    }
}

impl ParticipantTable for CouchParticipantTable {
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
            let mut since = String::from("now");
            loop {
                match table.poll_changes(&since).await {
                    Ok(response) => {
                        since = seq_param(&response.last_seq);
                        for row in response.results {
                            match row.into_event() {
                                Ok(Some(event)) => yield Ok(event),
                                Ok(None) => {}
                                Err(err) => yield Err(StorageError::from(err)),
                            }
                        }
                    }
                    Err(err) => {
                        yield Err(StorageError::from(err));
                        sleep(FEED_RETRY_DELAY).await;
                    }
                }
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let table = self.clone();
        Box::pin(async move {
            let op = CouchOp::EnsureDatabase;
            let url = table.database_url();
            let response = table
                .send(op, table.authorize(table.client.get(&url)))
                .await?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::Status {
                    op,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let table = self.clone();
        Box::pin(async move { table.ensure_database().await.map_err(Into::into) })
    }
}
