use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use kernel::aggregate::OverallStatus;
use kernel::{Completion, ItemId, UploadError, UploadFile, UploadItem, UploadStatus};
use tokio::runtime::Handle;
use tokio::sync::{watch, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::auth::AuthProvider;
use crate::config::UploadOptions;
use crate::registry::{Registry, Snapshot, Ticket};
use crate::transport::{HttpTransport, ProgressFn, Transport};
use crate::ClientError;

/// Runs the uploads of one session.
///
/// Commands (`add`, `upload`, `clear`, `retry`, `cancel`) apply their state
/// change before returning; transfers continue in the background as Tokio
/// tasks and report back into the same registry. Every change is published
/// to [`subscribe`](Self::subscribe) receivers.
///
/// Handles are cheap to clone and share one session. Dropping the last handle
/// aborts all transfers still running.
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

/// Granularity of progress changes pushed to subscribers. Every report is
/// still stored, so the views always read the latest fraction.
pub const PROGRESS_STEP: f64 = 0.01;

struct Shared {
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthProvider>,
    options: UploadOptions,
    limiter: Arc<Semaphore>,
    registry: Mutex<Registry>,
    changes: watch::Sender<Snapshot>,
}

/// What a transfer task needs. Holds the session weakly.
struct Link {
    shared: Weak<Shared>,
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthProvider>,
    limiter: Arc<Semaphore>,
}

struct Dispatch {
    ticket: Ticket,
    cancel: CancellationToken,
    file: UploadFile,
    bucket: String,
}

impl Coordinator {
    /// Session against the backend at `base_url`, options from the environment.
    pub fn new(base_url: &str, auth: Arc<dyn AuthProvider>) -> Result<Self, ClientError> {
        Self::with_options(base_url, auth, UploadOptions::from_env())
    }

    pub fn with_options(
        base_url: &str,
        auth: Arc<dyn AuthProvider>,
        options: UploadOptions,
    ) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(base_url)?.with_chunk_size(options.chunk_size);
        Ok(Self::with_transport(Arc::new(transport), auth, options))
    }

    #[must_use]
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        auth: Arc<dyn AuthProvider>,
        options: UploadOptions,
    ) -> Self {
        let options = options.normalized();
        let (changes, _) = watch::channel(Snapshot::default());
        let shared = Shared {
            transport,
            auth,
            limiter: Arc::new(Semaphore::new(options.max_concurrency)),
            options,
            registry: Mutex::new(Registry::default()),
            changes,
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    #[must_use]
    pub fn options(&self) -> &UploadOptions {
        &self.shared.options
    }

    /// Appends files as idle items. Starts no network activity.
    pub fn add<I>(&self, files: I) -> Vec<ItemId>
    where
        I: IntoIterator<Item = UploadFile>,
    {
        let mut registry = self.shared.lock();
        let ids: Vec<ItemId> = files.into_iter().map(|f| registry.push(f)).collect();
        if !ids.is_empty() {
            tracing::debug!("added {} file(s), {} tracked", ids.len(), registry.items().len());
            self.shared.publish(&registry);
        }
        ids
    }

    pub fn add_one(&self, file: UploadFile) -> ItemId {
        let mut registry = self.shared.lock();
        let id = registry.push(file);
        self.shared.publish(&registry);
        id
    }

    /// Dispatches every idle item into `bucket`, or the default bucket when
    /// `None`. Items in any other state are left alone. Idle items that fail
    /// validation move to error without a transfer. Returns how many
    /// transfers were started.
    ///
    /// Fails with [`ClientError::NoRuntime`] outside a Tokio runtime, leaving
    /// every item untouched.
    pub fn upload(&self, bucket: Option<&str>) -> Result<usize, ClientError> {
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        let bucket = bucket
            .filter(|b| !b.is_empty())
            .unwrap_or(self.shared.options.default_bucket.as_str())
            .to_owned();

        let mut dispatches = Vec::new();
        {
            let mut registry = self.shared.lock();
            let idle = registry.idle_ids();
            if idle.is_empty() {
                return Ok(0);
            }
            for id in idle {
                let Some(item) = registry.get_mut(id) else {
                    continue;
                };
                if let Err(e) = self.shared.validate(item.file()) {
                    tracing::warn!("{} rejected: {e}", item.file().name);
                    item.fail(e);
                    continue;
                }
                item.start(bucket.clone());
                let file = item.file().clone();
                let (ticket, cancel) = registry.track(id);
                dispatches.push(Dispatch {
                    ticket,
                    cancel,
                    file,
                    bucket: bucket.clone(),
                });
            }
            self.shared.publish(&registry);
        }

        let started = dispatches.len();
        if started > 0 {
            tracing::info!("dispatching {started} file(s) into bucket {bucket}");
        }
        for dispatch in dispatches {
            let link = self.shared.link();
            runtime.spawn(transfer(link, dispatch));
        }
        Ok(started)
    }

    /// Discards every item and aborts transfers still running. Results that
    /// arrive later are ignored.
    pub fn clear(&self) {
        let tokens = {
            let mut registry = self.shared.lock();
            let dropped = registry.items().len();
            let tokens = registry.clear();
            self.shared.publish(&registry);
            tracing::debug!("cleared {dropped} item(s), aborting {} transfer(s)", tokens.len());
            tokens
        };
        for token in tokens {
            token.cancel();
        }
    }

    /// Returns a failed item to idle so the next `upload` sends it again.
    pub fn retry(&self, id: ItemId) -> Result<(), ClientError> {
        let mut registry = self.shared.lock();
        let item = registry.get_mut(id).ok_or(ClientError::UnknownItem(id))?;
        let status = item.status();
        if !item.reset() {
            return Err(ClientError::InvalidState {
                id,
                status,
                action: "retry",
            });
        }
        self.shared.publish(&registry);
        Ok(())
    }

    /// Stops one item for good, aborting its transfer if running.
    pub fn cancel(&self, id: ItemId) -> Result<(), ClientError> {
        let mut registry = self.shared.lock();
        let item = registry.get_mut(id).ok_or(ClientError::UnknownItem(id))?;
        let status = item.status();
        if !item.cancel() {
            return Err(ClientError::InvalidState {
                id,
                status,
                action: "cancel",
            });
        }
        if let Some(token) = registry.forget(id) {
            token.cancel();
        }
        self.shared.publish(&registry);
        tracing::debug!("{id} canceled");
        Ok(())
    }

    /// Mean progress of all items, 0 when there are none.
    #[must_use]
    pub fn progress(&self) -> f64 {
        kernel::aggregate::overall_progress(self.shared.lock().items())
    }

    #[must_use]
    pub fn status(&self) -> OverallStatus {
        kernel::aggregate::overall_status(self.shared.lock().items())
    }

    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        self.status() == OverallStatus::Uploaded
    }

    #[must_use]
    pub fn is_uploading(&self) -> bool {
        self.status() == OverallStatus::Uploading
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.status() == OverallStatus::Error
    }

    /// Items in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<UploadItem> {
        self.shared.lock().items().to_vec()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.shared.lock().snapshot()
    }

    /// Receiver of a fresh snapshot after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.changes.subscribe()
    }

    /// Resolves once no item is uploading.
    pub async fn settled(&self) -> Snapshot {
        let mut changes = self.subscribe();
        let snapshot = match changes.wait_for(|s| !s.is_uploading()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        snapshot
    }

    /// Accessor bound to a single item, `None` for unknown ids.
    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<ItemHandle> {
        let last = self.shared.lock().get(id).cloned()?;
        Some(ItemHandle {
            id,
            coordinator: self.clone(),
            changes: self.subscribe(),
            last: Some(last),
        })
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, registry: &Registry) {
        self.changes.send_replace(registry.snapshot());
    }

    fn validate(&self, file: &UploadFile) -> Result<(), UploadError> {
        let name = file.name.trim();
        if name.is_empty() {
            return Err(UploadError::validation("file name is empty"));
        }
        // Dot segments and separators would address another resource once
        // the name is joined into the target url.
        if matches!(name, "." | "..") || name.contains(['/', '\\']) {
            return Err(UploadError::validation(format!(
                "'{}' is not a plain file name",
                file.name
            )));
        }
        match self.options.max_file_size {
            Some(limit) if file.size > limit => Err(UploadError::validation(format!(
                "{} is {} bytes, limit is {limit}",
                file.name, file.size
            ))),
            _ => Ok(()),
        }
    }

    fn link(self: &Arc<Self>) -> Link {
        Link {
            shared: Arc::downgrade(self),
            transport: Arc::clone(&self.transport),
            auth: Arc::clone(&self.auth),
            limiter: Arc::clone(&self.limiter),
        }
    }

    /// Records progress on every report but publishes a snapshot only when
    /// the item enters a new [`PROGRESS_STEP`].
    fn progress(&self, ticket: Ticket, fraction: f64) {
        let mut registry = self.lock();
        let Some(item) = registry.current_mut(ticket) else {
            return;
        };
        let before = item.progress();
        if item.report_progress(fraction)
            && (before / PROGRESS_STEP).floor() < (item.progress() / PROGRESS_STEP).floor()
        {
            self.publish(&registry);
        }
    }

    fn finish(&self, ticket: Ticket, outcome: Result<Completion, UploadError>) {
        let mut registry = self.lock();
        let Some(item) = registry.settle(ticket) else {
            tracing::debug!("dropping stale result for {}", ticket.id);
            return;
        };
        let applied = match outcome {
            Ok(completion) => {
                let name = item.file().name.clone();
                let applied = item.complete(completion);
                if applied {
                    tracing::info!("{name} uploaded");
                }
                applied
            }
            Err(e) => {
                tracing::warn!("{} failed: {e}", item.file().name);
                item.fail(e)
            }
        };
        if applied {
            self.publish(&registry);
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let registry = self
            .registry
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for token in registry.clear() {
            token.cancel();
        }
    }
}

async fn transfer(link: Link, dispatch: Dispatch) {
    let Dispatch {
        ticket,
        cancel,
        file,
        bucket,
    } = dispatch;

    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(UploadError::Canceled),
        result = send(&link, ticket, &file, &bucket) => result,
    };

    if let Some(shared) = link.shared.upgrade() {
        shared.finish(ticket, outcome);
    }
}

async fn send(
    link: &Link,
    ticket: Ticket,
    file: &UploadFile,
    bucket: &str,
) -> Result<Completion, UploadError> {
    let _permit = link
        .limiter
        .acquire()
        .await
        .map_err(|_| UploadError::Canceled)?;
    let token = link.auth.access_token().await?;

    let session = link.shared.clone();
    let progress: ProgressFn = Arc::new(move |fraction| {
        if let Some(shared) = session.upgrade() {
            shared.progress(ticket, fraction);
        }
    });

    link.transport
        .send(file, bucket, progress, token.as_deref())
        .await
}

/// Read access to one item plus the commands that target it.
pub struct ItemHandle {
    id: ItemId,
    coordinator: Coordinator,
    changes: watch::Receiver<Snapshot>,
    last: Option<UploadItem>,
}

impl ItemHandle {
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Current state of the item, `None` once the session was cleared.
    #[must_use]
    pub fn snapshot(&self) -> Option<UploadItem> {
        self.coordinator.shared.lock().get(self.id).cloned()
    }

    #[must_use]
    pub fn status(&self) -> Option<UploadStatus> {
        self.snapshot().map(|i| i.status())
    }

    #[must_use]
    pub fn progress(&self) -> Option<f64> {
        self.snapshot().map(|i| i.progress())
    }

    #[must_use]
    pub fn error(&self) -> Option<UploadError> {
        self.snapshot().and_then(|i| i.error().cloned())
    }

    /// Waits until the item differs from what this handle saw last and
    /// returns it. `None` means the item is gone.
    pub async fn changed(&mut self) -> Option<UploadItem> {
        let last = self.last.take()?;
        let id = self.id;
        let current = match self
            .changes
            .wait_for(|s| s.get(id) != Some(&last))
            .await
        {
            Ok(snapshot) => snapshot.get(id).cloned(),
            Err(_) => None,
        };
        self.last.clone_from(&current);
        current
    }

    pub fn retry(&self) -> Result<(), ClientError> {
        self.coordinator.retry(self.id)
    }

    pub fn cancel(&self) -> Result<(), ClientError> {
        self.coordinator.cancel(self.id)
    }
}
