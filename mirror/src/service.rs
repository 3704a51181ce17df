//! Long-running mirror: initial sync, then one reconciliation per change.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use treemirror_directory_watcher::DirectoryWatcher;
use treemirror_remote::RemoteFs;

use crate::config::MirrorConfig;
use crate::engine::Mirror;
use crate::error::{MirrorError, Result};

/// Ties a [`DirectoryWatcher`] to a [`Mirror`].
pub struct MirrorService {
    config: MirrorConfig,
    remote: Arc<dyn RemoteFs>,
}

impl MirrorService {
    /// Validate the configuration and set up the remote named by its
    /// destination.
    pub fn new(config: MirrorConfig) -> Result<Self> {
        config.validate()?;
        let remote = treemirror_remote::connect(&config.destination)?;
        Ok(Self { config, remote })
    }

    /// Use an already constructed remote instead of the configured
    /// destination.
    pub fn with_remote(config: MirrorConfig, remote: Arc<dyn RemoteFs>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, remote })
    }

    /// Mirror `config` until `cancel` fires.
    pub async fn run(config: MirrorConfig, cancel: CancellationToken) -> Result<()> {
        Self::new(config)?.serve(cancel).await
    }

    /// Watch, sync everything once, then follow changes until cancelled.
    ///
    /// Failing to reach the remote or to sync a path is logged and the
    /// service carries on; only a watcher that cannot start, or one that
    /// stops on its own, ends it with an error.
    pub async fn serve(self, cancel: CancellationToken) -> Result<()> {
        if let Err(e) = self.remote.ping().await {
            warn!("Remote not reachable yet: {e}");
        }

        let mut watcher = DirectoryWatcher::new(self.config.watch_config())?;
        let mirror = Mirror::for_watcher(&watcher, self.remote);

        if let Err(e) = mirror.sync_all().await {
            error!("Initial sync failed: {e}");
        }

        let events = watcher.watch(cancel.clone());
        info!("Mirroring {}", mirror.root().display());

        let outcome = loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => break Ok(()),
                event = events.recv() => event,
            };

            let Some(event) = event else {
                if cancel.is_cancelled() {
                    break Ok(());
                }
                break Err(MirrorError::StreamClosed);
            };

            if let Err(e) = mirror.apply(&event).await {
                error!("Failed to sync {event}: {e}");
            }
        };

        cancel.cancel();
        watcher.stopped().await;
        info!("Mirror stopped");
        outcome
    }
}
