//! Upload session: file selection, validation, one multipart request per
//! batch, byte progress, and reconciliation of the server's answer.
//!
//! ```text
//! Idle -> Selecting -> Validating -> Uploading -> Processing -> Succeeded | Failed
//! ```
//!
//! Pending files carry metadata only. Payloads stay in the session's
//! [`FileRegistry`] until they are sent or removed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dam_api_client::progress::ProgressCallback;
use dam_api_client::{AssetApi, TransferProgress, UploadPart};
use dam_core::models::{FileHandle, FileId, PendingFile, UploadOptions, UploadSummary};
use dam_core::{DamError, DamResult, UploadRules, ValidationError};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::catalog::AssetCatalog;
use crate::reconcile::reconcile;
use crate::registry::{FileRegistry, InMemoryFileRegistry};

pub const TIMEOUT_AFTER_TRANSFER_MESSAGE: &str =
    "Upload likely succeeded but confirmation timed out. Refresh the gallery to check.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPhase {
    #[default]
    Idle,
    Selecting,
    Validating,
    Uploading,
    Processing,
    Succeeded,
    Failed,
}

impl UploadPhase {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            UploadPhase::Validating | UploadPhase::Uploading | UploadPhase::Processing
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadState {
    pub phase: UploadPhase,
    pub files: Vec<PendingFile>,
    /// Overall byte progress, 0 to 100.
    pub progress: u8,
    /// Approximate index of the file being sent. Display only.
    pub current_file_index: Option<usize>,
    pub error: Option<String>,
    pub validation_errors: Vec<String>,
    pub summary: Option<UploadSummary>,
    /// Sent with the next batch; kept across uploads.
    pub options: UploadOptions,
}

/// Aborts the in-flight upload of the session it was taken from.
#[derive(Clone, Default)]
pub struct UploadCanceller {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl UploadCanceller {
    /// Returns false when nothing was in flight.
    pub fn cancel(&self) -> bool {
        let guard = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        token
    }

    fn finish(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Outcome of adding files to the session.
#[derive(Debug, Default)]
pub struct Selection {
    pub accepted: Vec<FileId>,
    pub rejected: Vec<ValidationError>,
}

/// Shared handle to one upload session. Clones drive the same session, so a
/// UI task can keep selecting or cancelling while another awaits
/// [`upload`](Self::upload); every mutation is refused with
/// [`DamError::UploadInProgress`] while a batch is in flight.
pub struct UploadSession<R: FileRegistry = InMemoryFileRegistry> {
    inner: Arc<SessionInner<R>>,
}

impl<R: FileRegistry> Clone for UploadSession<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct SessionInner<R> {
    api: Arc<dyn AssetApi>,
    rules: UploadRules,
    // Locked after `state` whenever both are held
    registry: Mutex<R>,
    state: Arc<watch::Sender<UploadState>>,
    next_id: AtomicU64,
    canceller: UploadCanceller,
    catalog: Mutex<Option<AssetCatalog>>,
}

impl UploadSession<InMemoryFileRegistry> {
    pub fn new(api: Arc<dyn AssetApi>, rules: UploadRules) -> Self {
        Self::with_registry(api, rules, InMemoryFileRegistry::new())
    }
}

impl<R: FileRegistry> UploadSession<R> {
    pub fn with_registry(api: Arc<dyn AssetApi>, rules: UploadRules, registry: R) -> Self {
        let (state, _) = watch::channel(UploadState::default());
        Self {
            inner: Arc::new(SessionInner {
                api,
                rules,
                registry: Mutex::new(registry),
                state: Arc::new(state),
                next_id: AtomicU64::new(1),
                canceller: UploadCanceller::default(),
                catalog: Mutex::new(None),
            }),
        }
    }

    /// Refresh `catalog` (page 1, newest first) after every successful upload.
    pub fn with_catalog(self, catalog: AssetCatalog) -> Self {
        *self
            .inner
            .catalog
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(catalog);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> UploadState {
        self.inner.state.borrow().clone()
    }

    pub fn canceller(&self) -> UploadCanceller {
        self.inner.canceller.clone()
    }

    /// The payload store. Release the guard before calling back into the
    /// session.
    pub fn registry(&self) -> MutexGuard<'_, R> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to the state unless a batch is in flight. The phase check and
    /// the mutation happen under one lock.
    fn modify_unless_busy<T>(&self, f: impl FnOnce(&mut UploadState) -> T) -> DamResult<T> {
        let mut outcome = None;
        self.inner.state.send_if_modified(|s| {
            if s.phase.is_busy() {
                return false;
            }
            outcome = Some(f(s));
            true
        });
        outcome.ok_or(DamError::UploadInProgress)
    }

    /// Add files to the pending set. Each file is checked on its own;
    /// rejected files never reach the state or the registry. A selection
    /// above the per-selection cap is refused as a whole.
    pub fn select_files(&self, files: Vec<FileHandle>) -> DamResult<Selection> {
        let rules = &self.inner.rules;
        let selection = self.modify_unless_busy(|s| -> DamResult<Selection> {
            rules.check_selection_len(files.len())?;

            let mut selection = Selection::default();
            let mut registry = self.registry();
            for file in files {
                if let Err(violation) = rules.check_file(&file.name, file.size(), &file.mime_type) {
                    tracing::debug!(file = %file.name, error = %violation, "File rejected");
                    selection.rejected.push(violation);
                    continue;
                }

                let id = FileId::new(&file.name, self.inner.next_id.fetch_add(1, Ordering::SeqCst));
                s.files.push(PendingFile::from_handle(id.clone(), &file));
                registry.set(id.clone(), file);
                selection.accepted.push(id);
            }

            s.validation_errors = selection.rejected.iter().map(|v| v.to_string()).collect();
            s.error = None;
            s.summary = None;
            s.progress = 0;
            s.current_file_index = None;
            s.phase = if s.files.is_empty() {
                UploadPhase::Idle
            } else {
                UploadPhase::Selecting
            };
            Ok(selection)
        })??;

        tracing::info!(
            accepted = selection.accepted.len(),
            rejected = selection.rejected.len(),
            "Files selected"
        );

        Ok(selection)
    }

    pub fn remove_file(&self, id: &FileId) -> DamResult<()> {
        self.modify_unless_busy(|s| {
            self.registry().remove(id);
            s.files.retain(|f| &f.id != id);
            if s.files.is_empty() && s.phase == UploadPhase::Selecting {
                s.phase = UploadPhase::Idle;
            }
        })
    }

    pub fn clear_files(&self) -> DamResult<()> {
        self.modify_unless_busy(|s| {
            self.registry().clear();
            s.files.clear();
            s.validation_errors.clear();
            s.error = None;
            s.summary = None;
            s.progress = 0;
            s.current_file_index = None;
            s.phase = UploadPhase::Idle;
        })
    }

    /// Back to `Idle` (or `Selecting` when files are still pending) with the
    /// error and summary cleared.
    pub fn reset(&self) -> DamResult<()> {
        self.modify_unless_busy(|s| {
            s.error = None;
            s.validation_errors.clear();
            s.summary = None;
            s.progress = 0;
            s.current_file_index = None;
            s.phase = if s.files.is_empty() {
                UploadPhase::Idle
            } else {
                UploadPhase::Selecting
            };
        })
    }

    /// Metadata and duplicate handling sent with the next batch.
    pub fn set_options(&self, options: UploadOptions) -> DamResult<()> {
        self.modify_unless_busy(|s| s.options = options)
    }

    /// Check every pending file. All violations are reported together.
    pub fn validate(&self) -> DamResult<()> {
        let state = self.inner.state.borrow();
        self.inner
            .rules
            .check_batch(&state.files)
            .map_err(DamError::Validation)
    }

    /// Send every pending file in one request.
    ///
    /// Dropping the returned future before it settles abandons the request
    /// and returns the session to `Idle` with the files kept.
    pub async fn upload(&self) -> DamResult<UploadSummary> {
        let mut claimed = Err(DamError::UploadInProgress);
        self.inner.state.send_if_modified(|s| {
            if s.phase.is_busy() {
                return false;
            }
            if s.files.is_empty() {
                claimed = Err(DamError::NothingToUpload);
                return false;
            }
            claimed = Ok((s.files.clone(), s.options.clone()));
            s.phase = UploadPhase::Validating;
            s.error = None;
            s.validation_errors.clear();
            s.summary = None;
            true
        });
        let (files, options) = claimed?;
        let in_flight = InFlight::new(&self.inner.state, &self.inner.canceller);

        if let Err(err) = self.validate() {
            let messages = match &err {
                DamError::Validation(violations) => {
                    violations.iter().map(|v| v.to_string()).collect()
                }
                other => vec![other.to_string()],
            };
            in_flight.settle(|s| {
                s.validation_errors = messages;
                s.phase = UploadPhase::Selecting;
            });
            return Err(err);
        }

        let ids: Vec<FileId> = files.iter().map(|f| f.id.clone()).collect();
        let parts: Vec<UploadPart> = self
            .registry()
            .get_all(&ids)
            .into_iter()
            .map(|handle| UploadPart {
                file_name: handle.name.clone(),
                mime_type: handle.mime_type.clone(),
                content: handle.content.clone(),
            })
            .collect();

        if parts.len() != files.len() {
            tracing::warn!(
                pending = files.len(),
                found = parts.len(),
                "Some pending files have no payload in the registry"
            );
        }
        if parts.is_empty() {
            in_flight.settle(|s| s.phase = UploadPhase::Selecting);
            return Err(DamError::NothingToUpload);
        }

        let submitted: Vec<String> = parts.iter().map(|p| p.file_name.clone()).collect();
        let file_count = parts.len();

        self.inner.state.send_modify(|s| {
            s.phase = UploadPhase::Uploading;
            s.progress = 0;
            s.current_file_index = Some(0);
        });

        tracing::info!(files = file_count, "Starting upload");

        let token = self.inner.canceller.begin();
        let on_progress = progress_reporter(self.inner.state.clone(), file_count);
        let result = tokio::select! {
            _ = token.cancelled() => Err(DamError::Cancelled),
            response = self.inner.api.upload_assets(parts, &options, Some(on_progress)) => response,
        };

        match result {
            Ok(response) => {
                let summary = reconcile(&submitted, &response);
                in_flight.settle(|s| {
                    self.registry().clear();
                    s.phase = UploadPhase::Succeeded;
                    s.progress = 100;
                    s.current_file_index = None;
                    s.files.clear();
                    s.summary = Some(summary.clone());
                });

                tracing::info!(
                    uploaded = summary.uploaded,
                    replaced = summary.replaced,
                    skipped = summary.skipped,
                    "Upload completed"
                );

                let catalog = self
                    .inner
                    .catalog
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                if let Some(catalog) = catalog {
                    if let Err(e) = catalog.refresh_after_upload().await {
                        tracing::warn!(error = %e, "Failed to refresh catalog after upload");
                    }
                }

                Ok(summary)
            }
            Err(DamError::Cancelled) => {
                tracing::info!(files = file_count, "Upload cancelled");
                in_flight.settle(|s| {
                    s.phase = UploadPhase::Idle;
                    s.progress = 0;
                    s.current_file_index = None;
                });
                Err(DamError::Cancelled)
            }
            Err(err) => {
                let transferred = self.inner.state.borrow().progress >= 100;
                let message = if transferred && err.is_timeout() {
                    TIMEOUT_AFTER_TRANSFER_MESSAGE.to_string()
                } else {
                    err.user_message()
                };

                tracing::error!(error = %err, transferred = transferred, "Upload failed");

                in_flight.settle(|s| {
                    s.phase = UploadPhase::Failed;
                    s.error = Some(message);
                    s.current_file_index = None;
                    if s.progress < 100 {
                        s.progress = 0;
                    }
                });
                Err(err)
            }
        }
    }
}

/// Holds the session busy for one [`UploadSession::upload`] call. Dropped
/// without [`settle`](Self::settle), it puts the session back to `Idle`.
struct InFlight<'a> {
    state: &'a watch::Sender<UploadState>,
    canceller: &'a UploadCanceller,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a watch::Sender<UploadState>, canceller: &'a UploadCanceller) -> Self {
        Self {
            state,
            canceller,
            settled: false,
        }
    }

    fn settle(mut self, f: impl FnOnce(&mut UploadState)) {
        self.settled = true;
        self.state.send_modify(f);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.canceller.finish();
        if !self.settled {
            tracing::info!("Upload abandoned before completion");
            self.state.send_modify(|s| {
                s.phase = UploadPhase::Idle;
                s.progress = 0;
                s.current_file_index = None;
            });
        }
    }
}

/// Percentage and approximate current file for `loaded` of `total` bytes.
///
/// The percentage is floored, so it only reads 100 once every byte has been
/// sent and the session only enters `Processing` at that point.
pub fn progress_position(progress: TransferProgress, file_count: usize) -> (u8, usize) {
    if progress.total == 0 {
        return (100, file_count.saturating_sub(1));
    }
    let total = u128::from(progress.total);
    let loaded = u128::from(progress.loaded.min(progress.total));
    let percent = (loaded * 100 / total) as u8;
    let index = (loaded * file_count as u128 / total) as usize;
    (percent, index.min(file_count.saturating_sub(1)))
}

fn progress_reporter(state: Arc<watch::Sender<UploadState>>, file_count: usize) -> ProgressCallback {
    Arc::new(move |progress: TransferProgress| {
        let (percent, index) = progress_position(progress, file_count);
        state.send_if_modified(|s| {
            if !matches!(s.phase, UploadPhase::Uploading | UploadPhase::Processing) {
                return false;
            }
            let changed = s.progress != percent || s.current_file_index != Some(index);
            s.progress = percent;
            s.current_file_index = Some(index);
            if percent >= 100 && s.phase == UploadPhase::Uploading {
                s.phase = UploadPhase::Processing;
                return true;
            }
            changed
        });
    })
}
