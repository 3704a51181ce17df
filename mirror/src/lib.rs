//! # Mirror
//!
//! Keeps a remote copy of a local directory tree up to date.
//!
//! ## Features
//!
//! - **Initial sync**: the whole tree is copied once at startup
//! - **Incremental sync**: every change event re-syncs just the affected path
//! - **Local truth**: removals are resolved against the remote listing, so a
//!   deleted path is removed correctly whether it was a file or a directory
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Mirror Service                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  DirectoryWatcher ──► ChangeEvent ──► Mirror ──► RemoteFs       │
//! │          │                              │                       │
//! │          ▼                              ▼                       │
//! │   CancellationToken              sync / sync_all                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod service;

pub use config::MirrorConfig;
pub use engine::Mirror;
pub use error::{MirrorError, Result};
pub use service::MirrorService;

pub use treemirror_directory_watcher::CancellationToken;
