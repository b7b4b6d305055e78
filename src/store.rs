use bson::to_bson;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteError, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::schemas::{Expense, Participant, Trip};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("trip \"{0}\" already exists")]
    DuplicateTrip(String),
    #[error("participant \"{0}\" already exists")]
    DuplicateParticipant(String),
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    #[error(transparent)]
    Bson(#[from] bson::ser::Error),
}

/// Mutations return `Ok(false)` when the trip (or expense) they target
/// does not exist.
pub trait TripStore: Send + Sync {
    fn list_trips(&self) -> BoxFuture<'_, Result<Vec<Trip>, StoreError>>;

    fn find_trip<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Trip>, StoreError>>;

    fn create_trip(&self, trip: Trip) -> BoxFuture<'_, Result<(), StoreError>>;

    fn add_participant<'a>(
        &'a self,
        trip_id: &'a str,
        participant: Participant,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;

    fn push_expense<'a>(
        &'a self,
        trip_id: &'a str,
        expense: Expense,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;

    /// Replaces the expense with the same id.
    fn replace_expense<'a>(
        &'a self,
        trip_id: &'a str,
        expense: Expense,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;

    fn remove_expense<'a>(
        &'a self,
        trip_id: &'a str,
        expense_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;
}

pub struct MongoTripStore {
    trips: Collection<Trip>,
}

impl MongoTripStore {
    pub fn new(database: &Database) -> Self {
        MongoTripStore {
            trips: database.collection("Trips"),
        }
    }

    /// Trip ids are unique at the database level, so concurrent creations
    /// of the same trip cannot both succeed.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique_id = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.trips.create_index(unique_id, None).await?;
        Ok(())
    }

    fn touched() -> bson::DateTime {
        bson::DateTime::from_chrono(Utc::now())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code: 11000, .. }))
    )
}

impl TripStore for MongoTripStore {
    fn list_trips(&self) -> BoxFuture<'_, Result<Vec<Trip>, StoreError>> {
        async move {
            let cursor = self.trips.find(doc! {}, None).await?;
            let trips: Vec<Trip> = cursor.try_collect().await?;
            Ok(trips)
        }
        .boxed()
    }

    fn find_trip<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Trip>, StoreError>> {
        async move { Ok(self.trips.find_one(doc! { "id": id }, None).await?) }.boxed()
    }

    fn create_trip(&self, trip: Trip) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            match self.trips.insert_one(&trip, None).await {
                Ok(_) => Ok(()),
                Err(err) if is_duplicate_key(&err) => Err(StoreError::DuplicateTrip(trip.id)),
                Err(err) => Err(err.into()),
            }
        }
        .boxed()
    }

    fn add_participant<'a>(
        &'a self,
        trip_id: &'a str,
        participant: Participant,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            let result = self
                .trips
                .update_one(
                    doc! { "id": trip_id, "participants.id": { "$ne": participant.id.as_str() } },
                    doc! {
                        "$push": { "participants": to_bson(&participant)? },
                        "$set": { "updated_at": Self::touched() },
                    },
                    None,
                )
                .await?;
            if result.matched_count > 0 {
                return Ok(true);
            }
            // Either the trip is missing or the participant is already there.
            match self.trips.find_one(doc! { "id": trip_id }, None).await? {
                Some(_) => Err(StoreError::DuplicateParticipant(participant.id)),
                None => Ok(false),
            }
        }
        .boxed()
    }

    fn push_expense<'a>(
        &'a self,
        trip_id: &'a str,
        expense: Expense,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            let result = self
                .trips
                .update_one(
                    doc! { "id": trip_id },
                    doc! {
                        "$push": { "expenses": to_bson(&expense)? },
                        "$set": { "updated_at": Self::touched() },
                    },
                    None,
                )
                .await?;
            Ok(result.matched_count > 0)
        }
        .boxed()
    }

    fn replace_expense<'a>(
        &'a self,
        trip_id: &'a str,
        expense: Expense,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            let result = self
                .trips
                .update_one(
                    doc! { "id": trip_id, "expenses.id": expense.id.as_str() },
                    doc! {
                        "$set": {
                            "expenses.$": to_bson(&expense)?,
                            "updated_at": Self::touched(),
                        },
                    },
                    None,
                )
                .await?;
            Ok(result.matched_count > 0)
        }
        .boxed()
    }

    fn remove_expense<'a>(
        &'a self,
        trip_id: &'a str,
        expense_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            let result = self
                .trips
                .update_one(
                    doc! { "id": trip_id, "expenses.id": expense_id },
                    doc! {
                        "$pull": { "expenses": { "id": expense_id } },
                        "$set": { "updated_at": Self::touched() },
                    },
                    None,
                )
                .await?;
            Ok(result.modified_count > 0)
        }
        .boxed()
    }
}

/// In-process store, one instance per owner; nothing is shared globally.
#[derive(Default)]
pub struct MemoryTripStore {
    trips: RwLock<Vec<Trip>>,
}

impl MemoryTripStore {
    #[cfg(test)]
    pub(crate) fn with_trips(trips: Vec<Trip>) -> Self {
        MemoryTripStore {
            trips: RwLock::new(trips),
        }
    }

    async fn update<F>(&self, trip_id: &str, apply: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Trip) -> Result<bool, StoreError>,
    {
        let mut trips = self.trips.write().await;
        match trips.iter_mut().find(|t| t.id == trip_id) {
            Some(trip) => apply(trip),
            None => Ok(false),
        }
    }
}

impl TripStore for MemoryTripStore {
    fn list_trips(&self) -> BoxFuture<'_, Result<Vec<Trip>, StoreError>> {
        async move { Ok(self.trips.read().await.clone()) }.boxed()
    }

    fn find_trip<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Trip>, StoreError>> {
        async move {
            let trips = self.trips.read().await;
            Ok(trips.iter().find(|t| t.id == id).cloned())
        }
        .boxed()
    }

    fn create_trip(&self, trip: Trip) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            let mut trips = self.trips.write().await;
            if trips.iter().any(|t| t.id == trip.id) {
                return Err(StoreError::DuplicateTrip(trip.id));
            }
            trips.push(trip);
            Ok(())
        }
        .boxed()
    }

    fn add_participant<'a>(
        &'a self,
        trip_id: &'a str,
        participant: Participant,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            self.update(trip_id, |trip| {
                if trip.has_participant(&participant.id) {
                    return Err(StoreError::DuplicateParticipant(participant.id));
                }
                trip.participants.push(participant);
                Ok(true)
            })
            .await
        }
        .boxed()
    }

    fn push_expense<'a>(
        &'a self,
        trip_id: &'a str,
        expense: Expense,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            self.update(trip_id, |trip| {
                trip.expenses.push(expense);
                Ok(true)
            })
            .await
        }
        .boxed()
    }

    fn replace_expense<'a>(
        &'a self,
        trip_id: &'a str,
        expense: Expense,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            self.update(trip_id, |trip| {
                match trip.expenses.iter_mut().find(|e| e.id == expense.id) {
                    Some(slot) => {
                        *slot = expense;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            })
            .await
        }
        .boxed()
    }

    fn remove_expense<'a>(
        &'a self,
        trip_id: &'a str,
        expense_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            self.update(trip_id, |trip| {
                let before = trip.expenses.len();
                trip.expenses.retain(|e| e.id != expense_id);
                Ok(trip.expenses.len() < before)
            })
            .await
        }
        .boxed()
    }
}
