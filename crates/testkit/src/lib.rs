//! Test tooling for `sqlbridge`.
//!
//! Implements the [`sqlbridge::CommandChannel`] trait with [`StubEngine`], an
//! in-memory engine whose answers are scripted per command and which records
//! every [`Command`] it receives, and provides [`init_tracing`] for tests
//! that want log output.
//!
//! ## Engine behaviour
//!
//! Unless scripted otherwise, a [`StubEngine`] behaves like a real host-side
//! engine keyed by identifier:
//!
//! - `load` confirms the identifier unchanged and marks it open.
//! - `execute` / `select` against an identifier that is not open are
//!   rejected with `database <id> not loaded`.
//! - `execute` answers `[0, 0]`; `select` answers `[]`.
//! - `close(Some(id))` answers `true` and marks `id` closed, or is rejected
//!   when `id` is not open; `close(None)` closes everything and answers `true`.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, Once};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use sqlbridge::{BindValues, ChannelError, Command, CommandChannel, ConnectionId, LastInsertId};

type LoadHandler = Box<dyn Fn(&ConnectionId) -> Result<String, String> + Send + Sync>;
type ExecuteHandler =
    Box<dyn Fn(&str, &BindValues) -> Result<(u64, LastInsertId), String> + Send + Sync>;
type SelectHandler = Box<dyn Fn(&str, &BindValues) -> Result<JsonValue, String> + Send + Sync>;

// ---------------------------------------------------------------------------
// StubEngine
// ---------------------------------------------------------------------------

/// Scriptable in-memory engine.
pub struct StubEngine {
    on_load: LoadHandler,
    on_execute: ExecuteHandler,
    on_select: SelectHandler,
    unreachable: bool,
    require_loaded: bool,
    state: Mutex<EngineState>,
}

#[derive(Default)]
struct EngineState {
    open: BTreeSet<String>,
    received: Vec<Command>,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StubEngine {
    /// Creates an engine with the default behaviour described at crate level.
    pub fn new() -> Self {
        Self {
            on_load: Box::new(|db| Ok(db.to_string())),
            on_execute: Box::new(|_, _| Ok((0, LastInsertId::default()))),
            on_select: Box::new(|_, _| Ok(json!([]))),
            unreachable: false,
            require_loaded: true,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Every command fails with [`ChannelError::Transport`]; nothing is recorded
    /// as reaching the engine beyond the attempt itself.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new()
        }
    }

    /// Scripts the `load` answer: `Ok(confirmed)` or `Err(engine message)`.
    #[must_use]
    pub fn on_load(
        mut self,
        handler: impl Fn(&ConnectionId) -> Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        self.on_load = Box::new(handler);
        self
    }

    /// Scripts the `execute` answer as `(rowsAffected, lastInsertId)`.
    #[must_use]
    pub fn on_execute(
        mut self,
        handler: impl Fn(&str, &BindValues) -> Result<(u64, LastInsertId), String>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.on_execute = Box::new(handler);
        self
    }

    /// Scripts the `select` answer.
    #[must_use]
    pub fn on_select(
        mut self,
        handler: impl Fn(&str, &BindValues) -> Result<JsonValue, String> + Send + Sync + 'static,
    ) -> Self {
        self.on_select = Box::new(handler);
        self
    }

    /// Accepts statements for identifiers that were never loaded.
    #[must_use]
    pub fn allow_unloaded(mut self) -> Self {
        self.require_loaded = false;
        self
    }

    /// Every command received so far, in arrival order.
    pub fn received(&self) -> Vec<Command> {
        self.lock().received.clone()
    }

    /// Number of received commands with the given name.
    pub fn count(&self, name: &str) -> usize {
        self.lock()
            .received
            .iter()
            .filter(|command| command.name() == name)
            .count()
    }

    /// Identifiers currently open, sorted.
    pub fn open_databases(&self) -> Vec<String> {
        self.lock().open.iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        // A panicking test thread must not hide the recorded commands.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_loaded(&self, state: &EngineState, db: &ConnectionId) -> Result<(), ChannelError> {
        if self.require_loaded && !state.open.contains(db.as_str()) {
            return Err(not_loaded(db.as_str()));
        }
        Ok(())
    }

    fn answer(&self, command: &Command) -> Result<JsonValue, ChannelError> {
        let mut state = self.lock();
        match command {
            Command::Load { db } => {
                let confirmed = (self.on_load)(db).map_err(ChannelError::Engine)?;
                state.open.insert(confirmed.clone());
                Ok(JsonValue::String(confirmed))
            }
            Command::Execute { db, query, values } => {
                self.ensure_loaded(&state, db)?;
                let (rows_affected, last_insert_id) =
                    (self.on_execute)(query, values).map_err(ChannelError::Engine)?;
                Ok(json!([rows_affected, last_insert_id]))
            }
            Command::Select { db, query, values } => {
                self.ensure_loaded(&state, db)?;
                (self.on_select)(query, values).map_err(ChannelError::Engine)
            }
            Command::Close { db: Some(db) } => {
                if state.open.remove(db.as_str()) {
                    Ok(JsonValue::Bool(true))
                } else {
                    Err(not_loaded(db.as_str()))
                }
            }
            Command::Close { db: None } => {
                state.open.clear();
                Ok(JsonValue::Bool(true))
            }
        }
    }
}

fn not_loaded(db: &str) -> ChannelError {
    ChannelError::Engine(format!("database {db} not loaded"))
}

#[async_trait]
impl CommandChannel for StubEngine {
    async fn invoke(&self, command: Command) -> Result<JsonValue, ChannelError> {
        self.lock().received.push(command.clone());
        if self.unreachable {
            return Err(ChannelError::Transport("stub engine is unreachable".into()));
        }
        let answer = self.answer(&command);
        tracing::trace!(command = command.name(), ok = answer.is_ok(), "stub engine answered");
        answer
    }
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Installs a test-friendly `tracing` subscriber once per process.
///
/// Honours `RUST_LOG`; defaults to `sqlbridge=debug`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sqlbridge=debug"));
        // Another harness may already own the global subscriber.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ConnectionId {
        ConnectionId::new(s).unwrap()
    }

    #[tokio::test]
    async fn statements_require_a_load() {
        let engine = StubEngine::new();
        let err = engine
            .invoke(Command::Select {
                db: id("sqlite:a.db"),
                query: "SELECT 1".into(),
                values: BindValues::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, ChannelError::Engine("database sqlite:a.db not loaded".into()));

        engine.invoke(Command::Load { db: id("sqlite:a.db") }).await.unwrap();
        assert_eq!(engine.open_databases(), ["sqlite:a.db"]);
        assert_eq!(engine.count("load"), 1);
        assert_eq!(engine.count("select"), 1);
    }

    #[tokio::test]
    async fn close_all_clears_open_set() {
        let engine = StubEngine::new();
        for db in ["sqlite:a.db", "sqlite:b.db"] {
            engine.invoke(Command::Load { db: id(db) }).await.unwrap();
        }
        assert_eq!(engine.invoke(Command::Close { db: None }).await.unwrap(), json!(true));
        assert!(engine.open_databases().is_empty());
    }

    #[tokio::test]
    async fn unreachable_fails_every_command() {
        let engine = StubEngine::unreachable();
        let err = engine.invoke(Command::Close { db: None }).await.unwrap_err();
        assert!(matches!(err, ChannelError::Transport(_)));
        assert_eq!(engine.received().len(), 1);
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
