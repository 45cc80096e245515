//! Connection setup and per-call plumbing shared by both adapters.

use std::{future::Future, marker::PhantomData, time::Duration};
use bson::doc;
use mongodb::{Client, options::ClientOptions};
use tracing::Instrument;

use storer_core::{
    error::{StorerError, StorerResult},
    page::PaginationParams,
};

/// Upper bound for establishing the connection, including the initial ping.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for a single storer operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings collected by [`MongoStorerBuilder`].
#[derive(Debug, Clone)]
pub(crate) struct ConnectConfig {
    pub(crate) uri: String,
    pub(crate) database: Option<String>,
    pub(crate) connect_timeout: Duration,
    pub(crate) operation_timeout: Duration,
    pub(crate) default_pagination: Option<PaginationParams>,
}

/// Builder shared by the MongoDB adapters. `S` is the adapter it builds.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use storer_mongodb::MongoPooledStorer;
/// use storer_core::storer::StorerBuilder;
///
/// let storer = MongoPooledStorer::builder("mongodb://localhost:27017/app")
///     .with_operation_timeout(Duration::from_secs(5))
///     .build()
///     .await?;
/// ```
#[derive(Debug)]
pub struct MongoStorerBuilder<S> {
    pub(crate) config: ConnectConfig,
    _storer: PhantomData<fn() -> S>,
}

impl<S> MongoStorerBuilder<S> {
    pub(crate) fn new(uri: &str) -> Self {
        Self {
            config: ConnectConfig {
                uri: uri.to_string(),
                database: None,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
                operation_timeout: DEFAULT_OPERATION_TIMEOUT,
                default_pagination: None,
            },
            _storer: PhantomData,
        }
    }

    /// Uses `database` instead of the one named in the URI path.
    pub fn with_database(mut self, database: &str) -> Self {
        self.config.database = Some(database.to_string());
        self
    }

    /// Bounds connection establishment, including the initial ping.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Bounds every storer operation; expiry fails the call with a driver error.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = timeout;
        self
    }

    /// Overrides the adapter's default pagination.
    pub fn with_default_pagination(mut self, params: PaginationParams) -> Self {
        self.config.default_pagination = Some(params);
        self
    }
}

impl ConnectConfig {
    /// Resolves the database name without touching the network.
    async fn resolve(&self) -> StorerResult<(ClientOptions, String)> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| StorerError::Driver(format!("invalid MongoDB URI: {e}")))?;

        let database = self.database
            .clone()
            .or_else(|| options.default_database.clone())
            .ok_or_else(|| StorerError::Driver("no database named in the URI or the builder".into()))?;

        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.connect_timeout);

        Ok((options, database))
    }

    /// Dials the server and pings it, so a returned client is known usable.
    pub(crate) async fn connect(&self) -> StorerResult<(Client, String)> {
        if let Some(params) = &self.default_pagination {
            params.validate()?;
        }

        let (options, database) = self.resolve().await?;
        let client = Client::with_options(options)
            .map_err(|e| StorerError::Driver(format!("can't connect to MongoDB: {e}")))?;

        tokio::time::timeout(
            self.connect_timeout,
            client
                .database(&database)
                .run_command(doc! { "ping": 1 }),
        )
        .await
        .map_err(|_| StorerError::Driver(format!("can't connect to MongoDB within {:?}", self.connect_timeout)))?
        .map_err(|e| StorerError::Driver(format!("can't connect to MongoDB: {e}")))?;

        tracing::debug!(database = %database, "connected to MongoDB");

        Ok((client, database))
    }
}

/// Runs one storer operation inside a tracing span and under a deadline.
///
/// The span is entered for every poll and closed when the call returns,
/// whichever way it returns. A missed deadline becomes
/// [`StorerError::Driver`].
pub(crate) async fn run_op<T, F>(
    backend: &'static str,
    op: &'static str,
    table: &str,
    timeout: Duration,
    call: F,
) -> StorerResult<T>
where
    F: Future<Output = StorerResult<T>>,
{
    let span = tracing::debug_span!("storer", backend, op, table);

    async move {
        let outcome = match tokio::time::timeout(timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(StorerError::Driver(format!("{op} on `{table}` timed out after {timeout:?}"))),
        };

        match &outcome {
            Ok(_) => tracing::debug!("completed"),
            Err(err) => tracing::warn!(error = %err, "failed"),
        }

        outcome
    }
    .instrument(span)
    .await
}
