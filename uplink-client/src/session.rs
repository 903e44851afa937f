//! Shared session state for one user-initiated upload action.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use uplink_core::FileDescriptor;

use crate::progress::{percent, ProgressEvent, SpeedEstimator};
use crate::task::{UploadStatus, UploadTask};

struct SessionState {
    tasks: Vec<UploadTask>,
    estimators: HashMap<String, SpeedEstimator>,
    loaded: HashMap<String, u64>,
}

/// An ordered collection of upload tasks, shared between the orchestrator
/// and whoever renders progress.
///
/// Each transfer's progress events mutate only that file's slice of state;
/// aggregate percent and ETA are recomputed from the full task list on
/// read, never accumulated incrementally, which removes lost-update races
/// between concurrent progress callbacks.
#[derive(Clone)]
pub struct UploadSession {
    state: Arc<Mutex<SessionState>>,
    cancel: CancellationToken,
}

impl UploadSession {
    /// Seed a session with one pending task per file, in order.
    pub fn for_files(files: &[FileDescriptor]) -> Self {
        let tasks: Vec<UploadTask> = files.iter().map(UploadTask::new).collect();
        let estimators = tasks
            .iter()
            .map(|t| (t.id.clone(), SpeedEstimator::new()))
            .collect();
        Self {
            state: Arc::new(Mutex::new(SessionState {
                tasks,
                estimators,
                loaded: HashMap::new(),
            })),
            cancel: CancellationToken::new(),
        }
    }

    /// Snapshot of every task, in seed order.
    pub fn tasks(&self) -> Vec<UploadTask> {
        self.state.lock().tasks.clone()
    }

    /// Ordered task ids, aligned with the seed file order.
    pub fn task_ids(&self) -> Vec<String> {
        self.state.lock().tasks.iter().map(|t| t.id.clone()).collect()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Byte-weighted aggregate progress percent, derived on read.
    pub fn aggregate_percent(&self) -> u8 {
        let state = self.state.lock();
        let total: u64 = state.tasks.iter().map(|t| t.size).sum();
        if total == 0 {
            return 100;
        }
        let loaded: u64 = state
            .tasks
            .iter()
            .map(|t| match t.status {
                UploadStatus::Success => t.size,
                _ => *state.loaded.get(&t.id).unwrap_or(&0),
            })
            .sum();
        percent(loaded, total)
    }

    /// Aggregate ETA: the maximum per-file ETA among files still
    /// uploading. Bottleneck semantics, not a sum or an average.
    pub fn aggregate_eta_seconds(&self) -> Option<f64> {
        self.state
            .lock()
            .tasks
            .iter()
            .filter(|t| t.status == UploadStatus::Uploading)
            .filter_map(|t| t.eta_seconds)
            .fold(None, |acc, eta| match acc {
                Some(max) if max >= eta => Some(max),
                _ => Some(eta),
            })
    }

    /// Fold one progress event into its task. A no-op for terminal tasks,
    /// so delayed callbacks can never resurrect a finished file.
    pub fn apply_progress(&self, event: ProgressEvent) {
        let mut state = self.state.lock();

        let uploading = state
            .tasks
            .iter()
            .any(|t| t.id == event.file_id && t.status == UploadStatus::Uploading);
        if !uploading {
            return;
        }

        let sample = match state.estimators.get_mut(&event.file_id) {
            Some(estimator) => estimator.update(&event),
            None => return,
        };
        state.loaded.insert(event.file_id.clone(), event.loaded);

        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == event.file_id) {
            task.progress_percent = sample.percent;
            task.speed_bps = sample.speed_bps;
            task.eta_seconds = sample.eta_seconds;
        }
    }

    pub(crate) fn with_task<F, T>(&self, id: &str, f: F) -> Option<T>
    where
        F: FnOnce(&mut UploadTask) -> T,
    {
        let mut state = self.state.lock();
        state.tasks.iter_mut().find(|t| t.id == id).map(f)
    }

    /// Fail every task that is not yet terminal with one shared message.
    /// Used for systemic failures such as the authorization call itself
    /// failing. Already-terminal tasks are left untouched.
    pub fn fail_all_active<S: Into<String>>(&self, message: S) {
        let message = message.into();
        let mut state = self.state.lock();
        for task in &mut state.tasks {
            task.mark_error(message.clone());
        }
    }

    /// Abort the session: cancel every in-flight transfer and force any
    /// task still `Uploading` into `Error`. After this returns, no task is
    /// left in `Uploading`.
    pub fn reset(&self) {
        self.cancel.cancel();
        let mut state = self.state.lock();
        for task in &mut state.tasks {
            if task.status == UploadStatus::Uploading {
                task.mark_error("upload canceled");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn descriptors(sizes: &[u64]) -> Vec<FileDescriptor> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, s)| FileDescriptor::new(format!("f{i}.bin"), *s, "application/octet-stream"))
            .collect()
    }

    #[test]
    fn aggregate_eta_is_the_maximum_among_uploading_files() {
        let session = UploadSession::for_files(&descriptors(&[100, 100, 100]));
        let ids = session.task_ids();

        session.with_task(&ids[0], |t| {
            t.transition(UploadStatus::Uploading);
            t.eta_seconds = Some(5.0);
        });
        session.with_task(&ids[1], |t| {
            t.transition(UploadStatus::Uploading);
            t.eta_seconds = Some(12.0);
        });
        // finished file's old ETA must not count
        session.with_task(&ids[2], |t| {
            t.transition(UploadStatus::Uploading);
            t.mark_success();
        });

        assert_eq!(session.aggregate_eta_seconds(), Some(12.0));
    }

    #[test]
    fn aggregate_eta_is_none_when_nothing_is_uploading() {
        let session = UploadSession::for_files(&descriptors(&[100]));
        assert_eq!(session.aggregate_eta_seconds(), None);
    }

    #[test]
    fn aggregate_percent_is_byte_weighted() {
        let session = UploadSession::for_files(&descriptors(&[300, 100]));
        let ids = session.task_ids();

        session.with_task(&ids[0], |t| {
            t.transition(UploadStatus::Uploading);
        });
        session.with_task(&ids[1], |t| {
            t.transition(UploadStatus::Uploading);
            t.mark_success();
        });
        session.apply_progress(ProgressEvent {
            file_id: ids[0].clone(),
            loaded: 100,
            total: 300,
            timestamp: Instant::now(),
        });

        // 100 of 300 + all 100 of 100 = 200/400
        assert_eq!(session.aggregate_percent(), 50);
    }

    #[test]
    fn progress_events_for_terminal_tasks_are_ignored() {
        let session = UploadSession::for_files(&descriptors(&[100]));
        let id = session.task_ids()[0].clone();

        session.with_task(&id, |t| {
            t.transition(UploadStatus::Uploading);
            t.mark_success();
        });
        session.apply_progress(ProgressEvent {
            file_id: id.clone(),
            loaded: 10,
            total: 100,
            timestamp: Instant::now(),
        });

        let task = session.tasks().into_iter().next().unwrap();
        assert_eq!(task.progress_percent, 100);
        assert_eq!(task.status, UploadStatus::Success);
    }

    #[test]
    fn fail_all_active_never_touches_terminal_tasks() {
        let session = UploadSession::for_files(&descriptors(&[1, 1, 1]));
        let ids = session.task_ids();

        session.with_task(&ids[0], |t| {
            t.transition(UploadStatus::Uploading);
            t.mark_success();
        });
        session.with_task(&ids[1], |t| {
            t.transition(UploadStatus::Uploading);
        });

        session.fail_all_active("authorization request failed");

        let tasks = session.tasks();
        assert_eq!(tasks[0].status, UploadStatus::Success);
        assert_eq!(tasks[1].status, UploadStatus::Error);
        assert_eq!(tasks[2].status, UploadStatus::Error);
        assert_eq!(
            tasks[1].error_message.as_deref(),
            Some("authorization request failed")
        );
    }

    #[test]
    fn reset_leaves_no_task_uploading() {
        let session = UploadSession::for_files(&descriptors(&[1, 1]));
        let ids = session.task_ids();
        session.with_task(&ids[0], |t| {
            t.transition(UploadStatus::Uploading);
        });

        session.reset();

        assert!(session.is_cancelled());
        assert!(session
            .tasks()
            .iter()
            .all(|t| t.status != UploadStatus::Uploading));
    }
}
