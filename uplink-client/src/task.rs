use serde::Serialize;
use uplink_core::FileDescriptor;
use uuid::Uuid;

/// Per-file upload state.
///
/// Transitions are monotonic: `Pending → Uploading → {Success | Error}`.
/// Terminal states are sticky; a late event after success or error is a
/// no-op, which guards against races with delayed async callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Success | UploadStatus::Error)
    }
}

/// State of one file in an upload session. Serializes to camelCase so a
/// rendering layer can consume snapshots directly.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTask {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub status: UploadStatus,
    pub progress_percent: u8,
    pub speed_bps: Option<f64>,
    pub eta_seconds: Option<f64>,
    pub url: Option<String>,
    pub key: Option<String>,
    pub error_message: Option<String>,
}

impl UploadTask {
    pub fn new(descriptor: &FileDescriptor) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: descriptor.name.clone(),
            size: descriptor.size,
            status: UploadStatus::Pending,
            progress_percent: 0,
            speed_bps: None,
            eta_seconds: None,
            url: None,
            key: None,
            error_message: None,
        }
    }

    /// Attempt a status transition. Returns false (and changes nothing)
    /// when the transition would violate monotonicity.
    pub fn transition(&mut self, next: UploadStatus) -> bool {
        let allowed = match (self.status, next) {
            (UploadStatus::Pending, UploadStatus::Uploading) => true,
            (UploadStatus::Pending, UploadStatus::Error) => true,
            (UploadStatus::Uploading, UploadStatus::Success) => true,
            (UploadStatus::Uploading, UploadStatus::Error) => true,
            _ => false,
        };
        if allowed {
            self.status = next;
        }
        allowed
    }

    /// Mark failed, if the task is not already terminal.
    pub fn mark_error<S: Into<String>>(&mut self, message: S) -> bool {
        if self.transition(UploadStatus::Error) {
            self.error_message = Some(message.into());
            self.speed_bps = None;
            self.eta_seconds = None;
            true
        } else {
            false
        }
    }

    /// Mark successfully transferred.
    pub fn mark_success(&mut self) -> bool {
        if self.transition(UploadStatus::Success) {
            self.progress_percent = 100;
            self.speed_bps = None;
            self.eta_seconds = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> UploadTask {
        UploadTask::new(&FileDescriptor::new("a.png", 100, "image/png"))
    }

    #[test]
    fn happy_path_transitions_are_allowed() {
        let mut t = task();
        assert!(t.transition(UploadStatus::Uploading));
        assert!(t.mark_success());
        assert_eq!(t.status, UploadStatus::Success);
        assert_eq!(t.progress_percent, 100);
    }

    #[test]
    fn success_is_sticky_against_late_errors() {
        let mut t = task();
        t.transition(UploadStatus::Uploading);
        t.mark_success();

        // a delayed transfer-error callback arrives after success
        assert!(!t.mark_error("late network error"));
        assert_eq!(t.status, UploadStatus::Success);
        assert!(t.error_message.is_none());
    }

    #[test]
    fn error_is_sticky_against_late_success() {
        let mut t = task();
        t.transition(UploadStatus::Uploading);
        t.mark_error("boom");

        assert!(!t.mark_success());
        assert_eq!(t.status, UploadStatus::Error);
        assert_eq!(t.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn pending_may_fail_directly_but_never_succeed_directly() {
        let mut t = task();
        assert!(!t.transition(UploadStatus::Success));

        let mut t = task();
        assert!(t.mark_error("grant rejected"));
        assert_eq!(t.status, UploadStatus::Error);
    }

    #[test]
    fn uploading_cannot_regress_to_pending() {
        let mut t = task();
        t.transition(UploadStatus::Uploading);
        assert!(!t.transition(UploadStatus::Pending));
        assert!(!t.transition(UploadStatus::Uploading));
    }
}
