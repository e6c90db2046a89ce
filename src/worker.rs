use crate::analyzer::{AnalyzeError, QuizAnalyzer};
use crate::answers::AnswerLog;
use crate::request::{RequestId, RequestTracker};
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

/// Number of analysis workers; the only threads allowed to do network I/O.
pub const POOL_SIZE: usize = 2;

/// Tracker error text for the soft no-match outcome. The results handler
/// matches on this to phrase the popup as guidance instead of a failure.
pub const NO_QUESTIONS_MESSAGE: &str = "No questions found in image";

struct Job {
    image: Vec<u8>,
    request_id: RequestId,
}

/// Fixed-size pool running one analysis task per accepted capture.
///
/// Every outcome, including panics, is folded into a tracker update;
/// nothing propagates to the caller.
/// `submit` returns immediately so hook threads never wait on the network.
pub struct AnalysisPool {
    sender: Mutex<Option<Sender<Job>>>,
    shutting_down: Arc<AtomicBool>,
    in_flight: Arc<Mutex<HashSet<RequestId>>>,
}

impl AnalysisPool {
    pub fn new(
        workers: usize,
        analyzer: Arc<dyn QuizAnalyzer>,
        tracker: Arc<RequestTracker>,
        answers: Arc<AnswerLog>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));
        let shutting_down = Arc::new(AtomicBool::new(false));
        let in_flight: Arc<Mutex<HashSet<RequestId>>> = Arc::default();

        for idx in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let shutting_down = Arc::clone(&shutting_down);
            let in_flight = Arc::clone(&in_flight);
            let analyzer = Arc::clone(&analyzer);
            let tracker = Arc::clone(&tracker);
            let answers = Arc::clone(&answers);
            thread::spawn(move || {
                tracing::debug!(worker = idx, "analysis worker started");
                worker_loop(rx, shutting_down, in_flight, analyzer, tracker, answers);
                tracing::debug!(worker = idx, "analysis worker exited");
            });
        }

        Self {
            sender: Mutex::new(Some(tx)),
            shutting_down,
            in_flight,
        }
    }

    /// Enqueue one analysis task. Never blocks; on a pool that is shutting
    /// down the capture is dropped with a warning.
    pub fn submit(&self, image: Vec<u8>, request_id: RequestId) {
        if self.shutting_down.load(Ordering::Acquire) {
            tracing::warn!(request = %request_id, "pool is shutting down; capture dropped");
            return;
        }
        let guard = self.sender.lock().unwrap();
        let Some(tx) = guard.as_ref() else {
            tracing::warn!(request = %request_id, "pool already shut down; capture dropped");
            return;
        };
        self.in_flight.lock().unwrap().insert(request_id);
        if tx.send(Job { image, request_id }).is_err() {
            self.in_flight.lock().unwrap().remove(&request_id);
            tracing::error!(request = %request_id, "all analysis workers are gone");
        } else {
            tracing::info!(request = %request_id, "capture submitted for analysis");
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }

    /// Stop accepting work and cancel queued-but-unstarted tasks. Tasks
    /// already executing run to completion on their own; nobody waits for
    /// them, and the process is allowed to exit with them still running.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        self.sender.lock().unwrap().take();
        tracing::info!("analysis pool shut down");
    }
}

fn worker_loop(
    rx: Arc<Mutex<Receiver<Job>>>,
    shutting_down: Arc<AtomicBool>,
    in_flight: Arc<Mutex<HashSet<RequestId>>>,
    analyzer: Arc<dyn QuizAnalyzer>,
    tracker: Arc<RequestTracker>,
    answers: Arc<AnswerLog>,
) {
    loop {
        // Hold the receiver lock only while waiting, never while working.
        let job = {
            let guard = match rx.lock() {
                Ok(guard) => guard,
                Err(_) => break,
            };
            guard.recv()
        };
        let Ok(job) = job else { break };
        let id = job.request_id;

        if shutting_down.load(Ordering::Acquire) {
            tracing::info!(request = %id, "cancelled queued task during shutdown");
            in_flight.lock().unwrap().remove(&id);
            continue;
        }

        let run = std::panic::catch_unwind(AssertUnwindSafe(|| {
            run_analysis(analyzer.as_ref(), &tracker, &answers, &job)
        }));

        // Last line of defense: a panic that escaped the per-outcome
        // handling still has to land in the tracker.
        if let Err(payload) = run {
            let message = panic_message(payload);
            tracing::error!(request = %id, message, "unhandled failure in analysis task");
            tracker.set_error(id, format!("Unknown error: {message}"));
        }

        in_flight.lock().unwrap().remove(&id);
    }
}

fn run_analysis(
    analyzer: &dyn QuizAnalyzer,
    tracker: &RequestTracker,
    answers: &AnswerLog,
    job: &Job,
) {
    let id = job.request_id;
    tracing::info!(request = %id, "processing capture on worker thread");

    match analyzer.analyze(&job.image) {
        Ok(result) => {
            // Only append answers when the result was accepted; a stale
            // completion must not pollute the history either.
            if tracker.set_result(id, result.clone()) {
                answers.record(&result);
                tracing::info!(
                    request = %id,
                    questions = result.questions.len(),
                    "analysis completed"
                );
            }
        }
        Err(AnalyzeError::NoQuestions) => {
            // Soft outcome, not a failure.
            tracing::info!(request = %id, "no questions found");
            tracker.set_error(id, NO_QUESTIONS_MESSAGE);
        }
        Err(err @ AnalyzeError::Timeout { .. }) => {
            tracing::error!(request = %id, %err, "analysis timed out");
            tracker.set_error(id, "Timeout: analysis service not responding");
        }
        Err(AnalyzeError::Parse(detail)) => {
            tracing::error!(request = %id, detail, "analysis response unusable");
            tracker.set_error(id, format!("Data analysis error: {detail}"));
        }
        Err(AnalyzeError::Api(detail)) => {
            tracing::error!(request = %id, detail, "analysis call failed");
            tracker.set_error(id, format!("Processing error: {detail}"));
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
