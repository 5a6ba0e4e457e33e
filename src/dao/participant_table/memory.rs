//! In-process participant table used when no remote database is configured.

use std::{sync::Arc, time::SystemTime};

use futures::{StreamExt, future::BoxFuture, stream::BoxStream};
use tokio::sync::{Mutex, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::dao::{
    models::{ChangeEvent, NewParticipantEntity, ParticipantEntity, ParticipantPatchEntity},
    participant_table::{ParticipantTable, sort_by_stored_total},
    storage::{StorageError, StorageResult},
};

const FEED_CAPACITY: usize = 256;

/// Table kept in memory; records are lost on restart.
#[derive(Clone)]
pub struct MemoryParticipantTable {
    rows: Arc<Mutex<Vec<ParticipantEntity>>>,
    feed: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryParticipantTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryParticipantTable {
    /// Empty table with its own change feed.
    pub fn new() -> Self {
        let (feed, _rx) = broadcast::channel(FEED_CAPACITY);
        Self {
            rows: Arc::new(Mutex::new(Vec::new())),
            feed,
        }
    }

    /// Seed the table with existing records without emitting change events.
    pub async fn seed(&self, records: Vec<ParticipantEntity>) {
        let mut rows = self.rows.lock().await;
        rows.extend(records);
    }

    fn publish(&self, event: ChangeEvent) {
        let _ = self.feed.send(event);
    }
}

impl ParticipantTable for MemoryParticipantTable {
    fn fetch_ranked(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let table = self.clone();
        Box::pin(async move {
            let mut records = table.rows.lock().await.clone();
            sort_by_stored_total(&mut records);
            Ok(records)
        })
    }

    fn insert(&self, participant: NewParticipantEntity) -> BoxFuture<'static, StorageResult<String>> {
        let table = self.clone();
        Box::pin(async move {
            let id = Uuid::new_v4().to_string();
            let entity = ParticipantEntity::from_new(id.clone(), participant, SystemTime::now());
            let mut rows = table.rows.lock().await;
            rows.push(entity.clone());
            table.publish(ChangeEvent::Inserted(entity));
            Ok(id)
        })
    }

    fn update(
        &self,
        id: String,
        patch: ParticipantPatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let table = self.clone();
        Box::pin(async move {
            let mut rows = table.rows.lock().await;
            let row = rows
                .iter_mut()
                .find(|row| row.id == id)
                .ok_or_else(|| StorageError::not_found(id.clone()))?;
            patch.apply_to(row);
            let updated = row.clone();
            table.publish(ChangeEvent::Updated(updated));
            Ok(())
        })
    }

    fn delete(&self, id: String) -> BoxFuture<'static, StorageResult<()>> {
        let table = self.clone();
        Box::pin(async move {
            let mut rows = table.rows.lock().await;
            let before = rows.len();
            rows.retain(|row| row.id != id);
            if rows.len() == before {
                return Err(StorageError::not_found(id));
            }
            table.publish(ChangeEvent::Deleted { id });
            Ok(())
        })
    }

    fn subscribe(&self) -> BoxStream<'static, StorageResult<ChangeEvent>> {
        BroadcastStream::new(self.feed.subscribe())
            .map(|item| {
                item.map_err(|err| StorageError::unavailable("change feed lagged".into(), err))
            })
            .boxed()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_participant(name: &str, round1: f64) -> NewParticipantEntity {
        NewParticipantEntity {
            name: name.into(),
            college: "Central".into(),
            round1,
            round2: 0.0,
            round3: 0.0,
            round4: 0.0,
            round5: 0.0,
        }
    }

    #[tokio::test]
    async fn fetch_orders_by_total_keeping_insertion_order_on_ties() {
        let table = MemoryParticipantTable::new();
        table.insert(new_participant("A", 10.0)).await.unwrap();
        table.insert(new_participant("B", 30.0)).await.unwrap();
        table.insert(new_participant("C", 10.0)).await.unwrap();

        let names: Vec<String> = table
            .fetch_ranked()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["B", "A", "C"]);
    }

    #[tokio::test]
    async fn writes_are_published_on_the_feed() {
        let table = MemoryParticipantTable::new();
        let mut feed = table.subscribe();

        let id = table.insert(new_participant("A", 1.0)).await.unwrap();
        table
            .update(
                id.clone(),
                ParticipantPatchEntity {
                    name: None,
                    college: None,
                    round1: None,
                    round2: Some(2.0),
                    round3: None,
                    round4: None,
                    round5: None,
                    updated_at: SystemTime::now(),
                },
            )
            .await
            .unwrap();
        table.delete(id.clone()).await.unwrap();

        match feed.next().await.unwrap().unwrap() {
            ChangeEvent::Inserted(record) => assert_eq!(record.id, id),
            other => panic!("expected insert, got {other:?}"),
        }
        match feed.next().await.unwrap().unwrap() {
            ChangeEvent::Updated(record) => assert_eq!(record.total_score, 3.0),
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(
            feed.next().await.unwrap().unwrap(),
            ChangeEvent::Deleted { id }
        );
    }

    #[tokio::test]
    async fn seeded_rows_are_fetched_without_feed_events() {
        let table = MemoryParticipantTable::new();
        let mut feed = table.subscribe();
        let now = SystemTime::now();
        table
            .seed(vec![
                ParticipantEntity::from_new("low".into(), new_participant("Low", 1.0), now),
                ParticipantEntity::from_new("high".into(), new_participant("High", 9.0), now),
            ])
            .await;

        let ids: Vec<String> = table
            .fetch_ranked()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, ["high", "low"]);

        table.insert(new_participant("Next", 2.0)).await.unwrap();
        match feed.next().await.unwrap().unwrap() {
            ChangeEvent::Inserted(record) => assert_eq!(record.name, "Next"),
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_ids_are_rejected() {
        let table = MemoryParticipantTable::new();
        let err = table.delete("missing".into()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { id } if id == "missing"));
    }
}
