//! Connection handles: lifecycle policy and operations.
//!
//! A [`Database`] names one identifier and reaches the engine only through a
//! [`CommandChannel`]. It is either constructed eagerly with
//! [`Database::load`], which confirms the identifier with the engine before
//! returning, or lazily with [`Database::get`], which performs no round trip
//! and resolves on the first statement.
//!
//! ## Lifecycle
//!
//! ```text
//! Unresolved ──(load succeeds)──▶ Resolved(confirmed id)
//! ```
//!
//! The transition happens at most once. There is no local closed state:
//! [`Database::close`] is forwarded to the engine and the handle stays usable
//! afterwards. Whether a statement after close reconnects or fails is the
//! engine's decision, so callers must not reuse a handle after closing it
//! unless their engine supports reconnection.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::OnceCell;
use tracing::Instrument;

use crate::{
    codec, projection, BindValues, ChannelError, Command, CommandChannel, CommandId,
    ConnectionId, MutationResult, Result, Row, SqlError,
};

/// Lifecycle state of a [`Database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Identifier known, not yet confirmed by the engine.
    Unresolved,
    /// Identifier confirmed; the engine holds a live connection for it.
    Resolved,
}

/// Handle to one logical database behind a command channel.
///
/// Handles are independent values: nothing in this crate keeps a table of
/// open handles. A handle is `Send + Sync` and may be shared by reference or
/// `Arc` across concurrent tasks; the ordering of concurrent statements is
/// whatever the engine makes of them.
pub struct Database<C: ?Sized = dyn CommandChannel> {
    channel: Arc<C>,
    requested: ConnectionId,
    resolved: OnceCell<ConnectionId>,
}

impl<C> Database<C>
where
    C: CommandChannel + ?Sized,
{
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Connects eagerly: sends `load` and returns a resolved handle carrying
    /// the identifier the engine confirmed, which may differ from `db`.
    ///
    /// # Errors
    ///
    /// [`SqlError::Connection`] if the engine rejects the identifier or the
    /// channel fails. Not retried.
    pub async fn load(channel: Arc<C>, db: ConnectionId) -> Result<Self> {
        let confirmed = resolve_with(channel.as_ref(), &db).await?;
        Ok(Self {
            channel,
            requested: db,
            resolved: OnceCell::new_with(Some(confirmed)),
        })
    }

    /// Creates an unresolved handle without contacting the engine.
    ///
    /// Never fails; an unusable identifier is reported by the first
    /// statement.
    pub fn get(channel: Arc<C>, db: ConnectionId) -> Self {
        Self {
            channel,
            requested: db,
            resolved: OnceCell::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The identifier this handle was created with.
    pub fn requested(&self) -> &ConnectionId {
        &self.requested
    }

    /// The engine-confirmed identifier, once resolved.
    pub fn resolved(&self) -> Option<&ConnectionId> {
        self.resolved.get()
    }

    /// The identifier statements are sent to: the confirmed one if resolved,
    /// otherwise the requested one.
    pub fn identifier(&self) -> &ConnectionId {
        self.resolved().unwrap_or(&self.requested)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HandleState {
        if self.resolved.initialized() {
            HandleState::Resolved
        } else {
            HandleState::Unresolved
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Runs a non-selecting statement with no bind parameters.
    pub async fn execute(&self, query: &str) -> Result<MutationResult> {
        self.execute_inner(query, None).await
    }

    /// Runs a non-selecting statement with positional bind parameters.
    ///
    /// # Errors
    ///
    /// [`SqlError::Connection`] if the handle could not be resolved,
    /// [`SqlError::Execution`] with the engine's message verbatim, or
    /// [`SqlError::Transport`] if the channel failed.
    pub async fn execute_with(
        &self,
        query: &str,
        values: impl Into<BindValues>,
    ) -> Result<MutationResult> {
        self.execute_inner(query, Some(values.into())).await
    }

    /// Runs a selecting statement and projects the rows into `T`.
    pub async fn select<T: DeserializeOwned>(&self, query: &str) -> Result<T> {
        projection::project(self.select_inner(query, None).await?)
    }

    /// Runs a selecting statement with bind parameters and projects the rows
    /// into `T`.
    ///
    /// # Errors
    ///
    /// As [`Database::execute_with`], plus [`SqlError::SchemaMismatch`] when
    /// the engine's rows do not decode into `T`.
    pub async fn select_with<T: DeserializeOwned>(
        &self,
        query: &str,
        values: impl Into<BindValues>,
    ) -> Result<T> {
        projection::project(self.select_inner(query, Some(values.into())).await?)
    }

    /// Runs a selecting statement and returns rows as column-ordered maps.
    pub async fn select_rows(&self, query: &str) -> Result<Vec<Row>> {
        projection::project_rows(self.select_inner(query, None).await?)
    }

    /// As [`Database::select_rows`], with bind parameters.
    pub async fn select_rows_with(
        &self,
        query: &str,
        values: impl Into<BindValues>,
    ) -> Result<Vec<Row>> {
        projection::project_rows(self.select_inner(query, Some(values.into())).await?)
    }

    /// Runs a selecting statement and returns the engine's value unchanged.
    pub async fn select_value(&self, query: &str) -> Result<JsonValue> {
        self.select_inner(query, None).await
    }

    /// As [`Database::select_value`], with bind parameters.
    pub async fn select_value_with(
        &self,
        query: &str,
        values: impl Into<BindValues>,
    ) -> Result<JsonValue> {
        self.select_inner(query, Some(values.into())).await
    }

    /// Asks the engine to release the connection for `db`, or every open
    /// connection when `db` is `None`.
    ///
    /// Does not resolve a deferred handle and does not invalidate this one.
    /// An engine-side rejection (unknown or already closed identifier) is
    /// reported as `Ok(false)` so repeated closes never fail the caller.
    ///
    /// # Errors
    ///
    /// [`SqlError::Transport`] if the channel failed, or
    /// [`SqlError::Protocol`] if the engine answered with a non-boolean.
    pub async fn close(&self, db: Option<&ConnectionId>) -> Result<bool> {
        match self.dispatch(codec::close(db)).await {
            Ok(response) => codec::decode_close(response),
            Err(ChannelError::Engine(message)) => {
                tracing::warn!(
                    db = db.map(ConnectionId::as_str),
                    message = %message,
                    "engine rejected close"
                );
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Closes this handle's own identifier.
    pub async fn close_self(&self) -> Result<bool> {
        self.close(Some(self.identifier())).await
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn execute_inner(
        &self,
        query: &str,
        values: Option<BindValues>,
    ) -> Result<MutationResult> {
        let db = self.resolve().await?;
        let response = self.dispatch(codec::execute(db, query, values)).await?;
        codec::decode_execute(response)
    }

    async fn select_inner(&self, query: &str, values: Option<BindValues>) -> Result<JsonValue> {
        let db = self.resolve().await?;
        let response = self.dispatch(codec::select(db, query, values)).await?;
        Ok(codec::decode_select(response))
    }

    /// Returns the confirmed identifier, sending `load` first if needed.
    ///
    /// Concurrent callers share one `load`. A failed attempt leaves the
    /// handle unresolved so the next operation tries again.
    async fn resolve(&self) -> Result<&ConnectionId> {
        self.resolved
            .get_or_try_init(|| resolve_with(self.channel.as_ref(), &self.requested))
            .await
    }

    async fn dispatch(&self, command: Command) -> std::result::Result<JsonValue, ChannelError> {
        dispatch_on(self.channel.as_ref(), command).await
    }
}

impl<C: ?Sized> std::fmt::Debug for Database<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("requested", &self.requested)
            .field("resolved", &self.resolved.get())
            .finish_non_exhaustive()
    }
}

async fn resolve_with<C>(channel: &C, db: &ConnectionId) -> Result<ConnectionId>
where
    C: CommandChannel + ?Sized,
{
    let response = dispatch_on(channel, codec::load(db))
        .await
        .map_err(|err| SqlError::connection(db, err))?;
    let confirmed = codec::decode_load(db, response)?;
    if &confirmed != db {
        tracing::debug!(requested = %db, confirmed = %confirmed, "engine canonicalized identifier");
    }
    Ok(confirmed)
}

async fn dispatch_on<C>(channel: &C, command: Command) -> std::result::Result<JsonValue, ChannelError>
where
    C: CommandChannel + ?Sized,
{
    let span = tracing::debug_span!(
        "sqlbridge.command",
        command = command.name(),
        command_id = %CommandId::new_random(),
        db = command.db().map(ConnectionId::as_str),
        scheme = command.db().and_then(ConnectionId::scheme),
    );

    async move {
        if let Command::Execute { query, values, .. } | Command::Select { query, values, .. } =
            &command
        {
            tracing::debug!(query = %query, params = values.len(), "dispatching statement");
        }

        let outcome = channel.invoke(command).await;
        match &outcome {
            Ok(_) => tracing::debug!("engine answered"),
            Err(ChannelError::Engine(message)) => tracing::debug!(%message, "engine rejected command"),
            Err(ChannelError::Transport(message)) => tracing::warn!(%message, "channel failed"),
        }
        outcome
    }
    .instrument(span)
    .await
}
