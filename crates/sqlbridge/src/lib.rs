//! Database access facade over a pluggable command channel.
//!
//! Applications hold [`Database`] handles and issue SQL text with positional
//! parameters; every operation becomes one [`Command`] shipped through a
//! [`CommandChannel`] to an engine this crate never sees. Results come back as
//! a [`MutationResult`] or as a row set projected into the caller's own type.
//!
//! ## Architectural Layer
//!
//! **Handle lifecycle + dispatch.** No drivers, no transport, no pooling and no
//! process-wide registry live here. Engines and transports implement
//! [`CommandChannel`]; everything stateful (sessions, pools, transactions) is
//! on the engine side.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `ConnectionId`, `CommandId` |
//! | [`types`] | `BindValues`, `MutationResult`, `LastInsertId`, `Row` |
//! | [`errors`] | `SqlError`, `ChannelError` |
//! | [`command`] | `Command` variants and the `CommandChannel` trait |
//! | [`codec`] | Command builders and response decoders |
//! | [`projection`] | Row-set projection into caller types |
//! | [`handle`] | `Database` handles: `load`, `get`, `execute`, `select`, `close` |
//! | [`config`] | `ClientConfig` and eager preloading |
//!
//! ## Example
//!
//! ```no_run
//! # async fn demo(channel: std::sync::Arc<dyn sqlbridge::CommandChannel>) -> sqlbridge::Result<()> {
//! use sqlbridge::{BindValues, ConnectionId, Database};
//!
//! let id = ConnectionId::new("sqlite:test.db").expect("non-empty");
//! let db = Database::load(channel, id).await?;
//! let result = db
//!     .execute_with("DELETE FROM todos WHERE id = $1", BindValues::new().with(5))
//!     .await?;
//! assert_eq!(result.last_insert_id.as_i64(), Some(0));
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod command;
pub mod config;
pub mod errors;
pub mod handle;
pub mod identifiers;
pub mod projection;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use command::{Command, CommandChannel};
pub use config::{preload_all, ClientConfig};
pub use errors::{ChannelError, Result, SqlError};
pub use handle::{Database, HandleState};
pub use identifiers::{CommandId, ConnectionId};
pub use types::{BindValues, LastInsertId, MutationResult, Row};
