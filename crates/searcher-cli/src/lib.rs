//! Track subito.it searches and report listings that appeared since the last refresh.
//!
//! - `config`: environment parsing for data directory, timeouts and API base.
//! - `model`: tracked queries and the products they have seen.
//! - `store` / `credentials`: flat-file persistence of queries and Telegram settings.
//! - `runner`: search execution against the classifieds site.
//! - `notifier`: Telegram delivery of new-product messages.
//! - `refresh`: one-shot and daemon refresh loops.
//! - `commands`: session-scoped command handlers used by the binary.

pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod model;
pub mod notifier;
pub mod refresh;
pub mod runner;
pub mod store;
