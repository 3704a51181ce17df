//! # Directory Watcher
//!
//! This crate watches a directory tree and reports what changed in it as a
//! single ordered stream of created / modified / removed events.
//!
//! ## Features
//!
//! - **Per-directory subscriptions**: every directory is registered on its
//!   own, and the set follows the tree as directories appear and disappear
//! - **Exclusions**: root-relative subtrees are never subscribed nor reported
//! - **Noise filtering**: metadata-only changes and write echoes on
//!   directories are dropped
//! - **Backpressure**: a slow consumer stalls the watcher instead of growing
//!   an event backlog
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Watcher                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  notify ──► RawEvent ──► WatchTree ──► ChangeEvent ──► Stream   │
//! │                             │                                   │
//! │                             ▼                                   │
//! │                 ExclusionSet + subscriptions                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod subscriptions;
pub mod watcher;

pub use config::{ExclusionSet, WatchConfig};
pub use error::{Result, WatcherError};
pub use event::{ChangeEvent, ChangeKind, RawEvent, RawKind, relative_path};
pub use subscriptions::{SubscriptionBackend, WatchTree};
pub use watcher::{DirectoryWatcher, EventStream};

pub use tokio_util::sync::CancellationToken;
