//! SDK for building Drasi reactions in Rust.
//!
//! A reaction subscribes to the result streams of one or more continuous
//! queries and runs application code for every change. This crate covers
//! the platform plumbing: discovering which queries to serve from the
//! mounted configuration directory, registering one webhook route per
//! query plus the pub/sub subscription manifest, and validating and
//! dispatching incoming events to the callbacks a reaction registers.
//!
//! ```no_run
//! use drasi_reaction::Reaction;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reaction = Reaction::builder()
//!         .on_change_event(|event, _config| async move {
//!             println!(
//!                 "Query {} added {} and deleted {} results",
//!                 event.query_id,
//!                 event.added_results.len(),
//!                 event.deleted_results.len()
//!             );
//!             Ok(())
//!         })
//!         .build()?;
//!
//!     reaction.start().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
mod dispatch;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod queries;
pub mod reaction;
pub mod result_view;

pub use config::{config_value, config_value_or, ReactionSettings};
pub use error::{ReactionError, ReactionResult};
pub use handlers::{ChangeEventHandler, ControlEventHandler};
pub use logging::init_logging;
pub use models::{ChangeEvent, ControlEvent, ControlSignal, UpdatedResult};
pub use queries::{
    load_query_configs, JsonQueryConfigParser, QueryConfigParser, YamlQueryConfigParser,
};
pub use reaction::{QuerySubscription, Reaction, ReactionBuilder};
pub use result_view::{ResultViewClient, ViewElement};
