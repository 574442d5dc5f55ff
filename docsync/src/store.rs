use std::{collections::HashMap, future::IntoFuture, sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, info};
use mongodb::{Client, bson::doc, options::ClientOptions};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::watch;

use crate::error::{Result, SyncError};

pub use mongodb::bson::Bson;

/// Id the store assigned to a single inserted document.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneOutcome {
    pub inserted_id: Bson,
}

/// Ids the store assigned to a batch, keyed by position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertManyOutcome {
    pub inserted_ids: HashMap<usize, Bson>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_one<T>(
        &self,
        database: &str,
        collection: &str,
        record: &T,
    ) -> Result<InsertOneOutcome>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync;

    async fn insert_many<T>(
        &self,
        database: &str,
        collection: &str,
        records: &[T],
    ) -> Result<InsertManyOutcome>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync;

    async fn find_by_id<T>(&self, database: &str, collection: &str, id: &str) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync;

    async fn count(&self, database: &str, collection: &str) -> Result<u64>;
}

/// Cancellation signal shared by a connection and every call made on it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Cancelled,
    Closed,
}

/// A live MongoDB connection with its cancellation handle.
pub struct StoreConnection {
    client: Client,
    cancel: CancelHandle,
    op_timeout: Duration,
    state: ConnectionState,
}

impl StoreConnection {
    /// Connect and prove the server is reachable with a `ping`, all within
    /// `connect_timeout`. Later calls are bounded by `op_timeout`.
    pub async fn connect(
        uri: &str,
        connect_timeout: Duration,
        op_timeout: Duration,
    ) -> Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(SyncError::connect)?;
        options.connect_timeout = Some(connect_timeout);
        options.server_selection_timeout = Some(connect_timeout);
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

        let client = Client::with_options(options).map_err(SyncError::connect)?;

        let admin = client.database("admin");
        let ping = admin.run_command(doc! { "ping": 1 }).into_future();
        match tokio::time::timeout(connect_timeout, ping).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(SyncError::connect(e)),
            Err(_) => {
                return Err(SyncError::Timeout {
                    op: "connect".to_string(),
                    after: connect_timeout,
                });
            }
        }

        info!("connected to store");
        Ok(Self::from_client(client, op_timeout))
    }

    /// Wrap an existing driver client without contacting the server.
    pub fn from_client(client: Client, op_timeout: Duration) -> Self {
        Self {
            client,
            cancel: CancelHandle::new(),
            op_timeout,
            state: ConnectionState::Open,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Teardown: fire the cancel handle, then shut the client down.
    ///
    /// Calling it again after a successful close is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }

        self.cancel.cancel();
        self.state = ConnectionState::Cancelled;
        debug!("store connection cancelled, shutting down client");

        let client = self.client.clone();
        tokio::time::timeout(self.op_timeout, async move { client.shutdown().await })
            .await
            .map_err(|_| {
                SyncError::Close(format!("shutdown did not finish within {:?}", self.op_timeout))
            })?;

        self.state = ConnectionState::Closed;
        info!("store connection closed");
        Ok(())
    }

    async fn guarded<F, T>(&self, op: &'static str, call: F) -> Result<T>
    where
        F: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        let mut cancelled = self.cancel.subscribe();
        if *cancelled.borrow_and_update() {
            return Err(SyncError::Cancelled(op.to_string()));
        }

        tokio::select! {
            _ = cancelled.changed() => Err(SyncError::Cancelled(op.to_string())),
            outcome = tokio::time::timeout(self.op_timeout, call.into_future()) => match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(SyncError::store(op, e)),
                Err(_) => Err(SyncError::Timeout {
                    op: op.to_string(),
                    after: self.op_timeout,
                }),
            },
        }
    }
}

#[async_trait]
impl RecordStore for StoreConnection {
    async fn insert_one<T>(
        &self,
        database: &str,
        collection: &str,
        record: &T,
    ) -> Result<InsertOneOutcome>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync,
    {
        let target = self.client.database(database).collection::<T>(collection);
        let result = self.guarded("insert_one", target.insert_one(record)).await?;
        debug!("inserted {} into {database}.{collection}", result.inserted_id);

        Ok(InsertOneOutcome {
            inserted_id: result.inserted_id,
        })
    }

    async fn insert_many<T>(
        &self,
        database: &str,
        collection: &str,
        records: &[T],
    ) -> Result<InsertManyOutcome>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync,
    {
        let target = self.client.database(database).collection::<T>(collection);
        let result = self.guarded("insert_many", target.insert_many(records)).await?;
        debug!(
            "inserted {} documents into {database}.{collection}",
            result.inserted_ids.len()
        );

        Ok(InsertManyOutcome {
            inserted_ids: result.inserted_ids,
        })
    }

    async fn find_by_id<T>(&self, database: &str, collection: &str, id: &str) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync,
    {
        let target = self.client.database(database).collection::<T>(collection);
        self.guarded("find_one", target.find_one(doc! { "id": id }))
            .await
    }

    async fn count(&self, database: &str, collection: &str) -> Result<u64> {
        let target = self
            .client
            .database(database)
            .collection::<mongodb::bson::Document>(collection);
        self.guarded("count_documents", target.count_documents(doc! {}))
            .await
    }
}
