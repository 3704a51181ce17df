//! Directory watcher implementation.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ExclusionSet, WatchConfig};
use crate::error::{Result, WatcherError};
use crate::event::{ChangeEvent, RawEvent};
use crate::subscriptions::{SubscriptionBackend, WatchTree};

/// Raw notifications as delivered by the OS watcher callback.
type RawQueue = mpsc::UnboundedReceiver<notify::Result<notify::Event>>;

/// Ordered stream of change events.
///
/// Clones share one underlying queue: each event is received by exactly one
/// of them. The stream ends once the watcher has shut down.
///
/// The hand-off holds at most one event. While it is full the watcher stops
/// classifying, and further OS notifications wait in the raw queue until the
/// consumer receives.
#[derive(Debug, Clone)]
pub struct EventStream {
    rx: async_channel::Receiver<ChangeEvent>,
}

impl EventStream {
    /// Receive the next event, or `None` once the watcher has stopped.
    pub async fn recv(&self) -> Option<ChangeEvent> {
        self.rx.recv().await.ok()
    }

    /// Check if the watcher has stopped producing events.
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}

/// Watches a directory tree and turns OS notifications into [`ChangeEvent`]s.
pub struct DirectoryWatcher {
    /// Canonical watch root.
    root: PathBuf,

    /// Excluded subtrees.
    exclusions: ExclusionSet,

    /// Subscriptions and raw queue, until [`Self::watch`] moves them into the
    /// processing task.
    pending: Option<Pipeline>,

    /// The stream handed out by the first [`Self::watch`] call.
    stream: Option<EventStream>,

    /// The processing task.
    task: Option<JoinHandle<()>>,
}

impl DirectoryWatcher {
    /// Create a watcher and subscribe to every non-excluded directory under
    /// the root.
    pub fn new(config: WatchConfig) -> Result<Self> {
        let root = match dunce::canonicalize(&config.root) {
            Ok(root) if root.is_dir() => root,
            Ok(root) => return Err(WatcherError::NotADirectory(root)),
            Err(_) => return Err(WatcherError::NotADirectory(config.root)),
        };
        let exclusions = ExclusionSet::new(&root, &config.excludes);

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| {
                // The receiver is gone only after shutdown.
                let _ = raw_tx.send(res);
            },
        )?;

        Self::with_backend(root, exclusions, Box::new(watcher), raw_rx)
    }

    pub(crate) fn with_backend(
        root: PathBuf,
        exclusions: ExclusionSet,
        backend: Box<dyn SubscriptionBackend>,
        raw_rx: RawQueue,
    ) -> Result<Self> {
        let mut tree = WatchTree::new(root.clone(), exclusions.clone(), backend);
        let subscribed = tree.subscribe_all()?;
        info!(
            "Subscribed to {subscribed} director(ies) under {}",
            root.display()
        );

        Ok(Self {
            root,
            exclusions,
            pending: Some(Pipeline { tree, raw_rx }),
            stream: None,
            task: None,
        })
    }

    /// Start the processing task and return the event stream.
    ///
    /// Calling this again returns the stream of the running pipeline. The
    /// task stops, releases its subscriptions and closes the stream when
    /// `cancel` fires.
    pub fn watch(&mut self, cancel: CancellationToken) -> EventStream {
        if let Some(stream) = &self.stream {
            return stream.clone();
        }

        let (tx, rx) = async_channel::bounded(1);
        let stream = EventStream { rx };

        if let Some(pipeline) = self.pending.take() {
            self.task = Some(tokio::spawn(pipeline.run(tx, cancel)));
        }

        self.stream = Some(stream.clone());
        stream
    }

    /// Wait for the processing task to finish after cancellation.
    pub async fn stopped(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Directory watcher task failed: {e}");
            }
        }
    }

    /// Check if the processing task is running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// The canonical watch root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The resolved exclusions.
    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }
}

/// Everything the processing task owns.
struct Pipeline {
    tree: WatchTree<Box<dyn SubscriptionBackend>>,
    raw_rx: RawQueue,
}

impl Pipeline {
    async fn run(mut self, events: async_channel::Sender<ChangeEvent>, cancel: CancellationToken) {
        info!("Directory watcher started: {}", self.tree.root().display());

        'drain: loop {
            let notification = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                notification = self.raw_rx.recv() => notification,
            };

            let event = match notification {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    warn!("Watch error: {e}");
                    continue;
                }
                None => {
                    warn!("OS watcher queue closed");
                    break;
                }
            };

            for raw in RawEvent::from_notify(event) {
                let Some(change) = self.tree.process(raw) else {
                    continue;
                };

                debug!("Event: {change}");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'drain,
                    sent = events.send(change) => {
                        if sent.is_err() {
                            debug!("No event receivers left");
                            break 'drain;
                        }
                    }
                }
            }
        }

        self.tree.shutdown();
        events.close();
        info!("Directory watcher stopped");
    }
}
