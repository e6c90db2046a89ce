use crate::models::QuizResult;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Opaque id handed out by [`RequestTracker::create`]. Completion callbacks
/// hand it back so stale outcomes from superseded captures can be detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    None,
    Processing,
    Completed,
    Error,
}

#[derive(Debug)]
struct Request {
    id: RequestId,
    status: RequestStatus,
    created_at: Instant,
    result: Option<QuizResult>,
    error: Option<String>,
}

/// Immutable view of the current request, safe to hand across threads.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub status: RequestStatus,
    pub result: Option<QuizResult>,
    pub error: Option<String>,
    /// Populated only while the request is still processing.
    pub elapsed: Option<Duration>,
}

impl RequestSnapshot {
    fn empty() -> Self {
        Self {
            status: RequestStatus::None,
            result: None,
            error: None,
            elapsed: None,
        }
    }
}

/// Tracks the single in-flight analysis request.
///
/// All mutation is serialized under one lock; a snapshot never observes a
/// partially updated request. A new `create` silently supersedes whatever was
/// in flight; completions for a superseded id are dropped.
#[derive(Default)]
pub struct RequestTracker {
    current: Mutex<Option<Request>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current request with a fresh one in PROCESSING state.
    pub fn create(&self) -> RequestId {
        let id = RequestId(Uuid::new_v4());
        let mut guard = self.current.lock().unwrap();
        if let Some(old) = guard.as_ref() {
            tracing::debug!(old = %old.id, new = %id, "superseding in-flight request");
        }
        *guard = Some(Request {
            id,
            status: RequestStatus::Processing,
            created_at: Instant::now(),
            result: None,
            error: None,
        });
        id
    }

    /// Record a successful outcome for `id`. Returns false when the outcome
    /// was dropped because `id` is no longer current (or nothing is).
    pub fn set_result(&self, id: RequestId, result: QuizResult) -> bool {
        let mut guard = self.current.lock().unwrap();
        match guard.as_mut() {
            Some(req) if req.id == id => {
                req.result = Some(result);
                req.error = None;
                req.status = RequestStatus::Completed;
                true
            }
            Some(req) => {
                tracing::info!(stale = %id, current = %req.id, "dropping stale result");
                false
            }
            None => false,
        }
    }

    /// Record a failed outcome for `id`, same staleness discipline as
    /// [`set_result`](Self::set_result).
    pub fn set_error(&self, id: RequestId, message: impl Into<String>) -> bool {
        let mut guard = self.current.lock().unwrap();
        match guard.as_mut() {
            Some(req) if req.id == id => {
                req.error = Some(message.into());
                req.status = RequestStatus::Error;
                true
            }
            Some(req) => {
                tracing::info!(stale = %id, current = %req.id, "dropping stale error");
                false
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> RequestSnapshot {
        let guard = self.current.lock().unwrap();
        match guard.as_ref() {
            None => RequestSnapshot::empty(),
            Some(req) => RequestSnapshot {
                status: req.status,
                result: req.result.clone(),
                error: req.error.clone(),
                elapsed: (req.status == RequestStatus::Processing)
                    .then(|| req.created_at.elapsed()),
            },
        }
    }

    pub fn current_id(&self) -> Option<RequestId> {
        self.current.lock().unwrap().as_ref().map(|req| req.id)
    }

    pub fn clear(&self) {
        *self.current.lock().unwrap() = None;
    }
}
