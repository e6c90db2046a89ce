use crate::answers::AnswerLog;
use crate::capture::CaptureSource;
use crate::dispatcher::HotkeyAction;
use crate::relay::PopupRelay;
use crate::request::{RequestSnapshot, RequestStatus, RequestTracker};
use crate::settings::{Settings, SETTINGS_FILE};
use crate::worker::{AnalysisPool, NO_QUESTIONS_MESSAGE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Minimum interval between two accepted captures, across all trigger paths.
pub const CAPTURE_COOLDOWN: Duration = Duration::from_secs(2);

/// Central coordinator: every debounced hotkey action lands here.
///
/// Handlers run on the hook thread and must return quickly; anything slow is
/// delegated to the analysis pool or expressed as a relay intent for the
/// popup thread.
pub struct QuizApp {
    settings: Settings,
    tracker: Arc<RequestTracker>,
    pool: Arc<AnalysisPool>,
    answers: Arc<AnswerLog>,
    relay: Arc<PopupRelay>,
    capture: Box<dyn CaptureSource>,
    running: Arc<AtomicBool>,
    last_capture: Mutex<Option<Instant>>,
}

impl QuizApp {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Settings,
        tracker: Arc<RequestTracker>,
        pool: Arc<AnalysisPool>,
        answers: Arc<AnswerLog>,
        relay: Arc<PopupRelay>,
        capture: Box<dyn CaptureSource>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            settings,
            tracker,
            pool,
            answers,
            relay,
            capture,
            running,
            last_capture: Mutex::new(None),
        }
    }

    /// Wrap the app for use as the dispatcher's action handler.
    pub fn action_handler(self: &Arc<Self>) -> crate::dispatcher::ActionHandler {
        let app = Arc::clone(self);
        Arc::new(move |action| app.handle_action(action))
    }

    pub fn handle_action(&self, action: HotkeyAction) {
        match action {
            HotkeyAction::Capture => self.on_capture_at(Instant::now()),
            HotkeyAction::ToggleResults => self.on_toggle_results(),
            HotkeyAction::ShowAnswers => self.on_show_answers(),
            HotkeyAction::ResetAnswers => self.on_reset_answers(),
            HotkeyAction::OpenSettings => self.on_open_settings(),
            HotkeyAction::ClearLogs => self.on_clear_logs(),
            HotkeyAction::Exit => self.on_exit(),
        }
    }

    /// Grab the screen and hand it to the pool. A visible popup is hidden
    /// first so it cannot end up in its own capture.
    pub(crate) fn on_capture_at(&self, now: Instant) {
        {
            let mut last = self.last_capture.lock().unwrap();
            if let Some(prev) = *last {
                let since = now.duration_since(prev);
                if since < CAPTURE_COOLDOWN {
                    tracing::info!(?since, "capture suppressed by cooldown");
                    return;
                }
            }
            *last = Some(now);
        }

        if self.relay.is_visible() {
            self.relay.hide();
        }

        let Some(image) = self.capture.acquire_png() else {
            tracing::error!("screen capture failed; request not created");
            return;
        };

        let id = self.tracker.create();
        self.pool.submit(image, id);
    }

    fn on_toggle_results(&self) {
        if self.relay.is_visible() {
            self.relay.hide();
            return;
        }
        let snapshot = self.tracker.snapshot();
        self.relay.show(self.results_text(&snapshot));
    }

    fn results_text(&self, snapshot: &RequestSnapshot) -> String {
        match snapshot.status {
            RequestStatus::None => format!(
                "No data yet\nPress Alt+{} to capture screen",
                self.settings.capture_key
            ),
            RequestStatus::Processing => {
                let elapsed = snapshot.elapsed.unwrap_or_default();
                format!("Processing... ({:.1}s)\nPlease wait...", elapsed.as_secs_f64())
            }
            RequestStatus::Completed => match &snapshot.result {
                Some(result) => result.format_display(),
                None => "No results".to_string(),
            },
            RequestStatus::Error => match snapshot.error.as_deref() {
                Some(NO_QUESTIONS_MESSAGE) => format!(
                    "No questions found in image\nTry capturing again with Alt+{}",
                    self.settings.capture_key
                ),
                Some(message) => format!("Error: {message}"),
                None => "Error: unknown failure".to_string(),
            },
        }
    }

    fn on_show_answers(&self) {
        if self.relay.is_visible() {
            self.relay.hide();
            return;
        }
        if self.answers.is_empty() {
            self.relay.show(format!(
                "No answers saved yet\nPress Alt+{} to capture questions",
                self.settings.capture_key
            ));
            return;
        }
        self.relay
            .show(self.answers.format_display(self.settings.answers_per_line));
    }

    fn on_reset_answers(&self) {
        let dropped = self.answers.reset();
        self.tracker.clear();
        tracing::info!(dropped, "answer history reset");
        self.relay.show(format!("Cleared {dropped} answers"));
    }

    fn on_open_settings(&self) {
        if !std::path::Path::new(SETTINGS_FILE).exists() {
            if let Err(err) = self.settings.save(SETTINGS_FILE) {
                tracing::error!(?err, "could not write default settings file");
                return;
            }
        }
        match open::that(SETTINGS_FILE) {
            Ok(()) => tracing::info!("opened settings file in default editor"),
            Err(err) => tracing::error!(?err, "could not open settings file"),
        }
    }

    fn on_clear_logs(&self) {
        let removed = crate::logging::clear_log_files();
        let dropped = self.answers.reset();
        let mut message = format!("Cleared {removed} log file(s)");
        if dropped > 0 {
            message.push_str(&format!("\nCleared {dropped} saved answer(s)"));
        } else {
            message.push_str("\nNo saved answers");
        }
        self.relay.show(message);
    }

    fn on_exit(&self) {
        tracing::info!("exit requested");
        self.running.store(false, Ordering::Release);
    }

    /// Final teardown, called from the main thread once the running flag is
    /// clear and the UI threads have been joined.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalyzeError, QuizAnalyzer};
    use crate::models::QuizResult;
    use std::sync::atomic::AtomicUsize;

    struct FixedCapture {
        calls: Arc<AtomicUsize>,
    }

    impl CaptureSource for FixedCapture {
        fn acquire_png(&self) -> Option<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(vec![0x89, 0x50, 0x4e, 0x47])
        }
    }

    struct NeverAnalyzer;

    impl QuizAnalyzer for NeverAnalyzer {
        fn analyze(&self, _image_png: &[u8]) -> Result<QuizResult, AnalyzeError> {
            Err(AnalyzeError::NoQuestions)
        }
    }

    fn test_app(calls: Arc<AtomicUsize>) -> QuizApp {
        let tracker = Arc::new(RequestTracker::new());
        let answers = Arc::new(AnswerLog::load(
            tempfile::tempdir().unwrap().path().join("answers.txt"),
        ));
        let pool = Arc::new(AnalysisPool::new(
            1,
            Arc::new(NeverAnalyzer),
            Arc::clone(&tracker),
            Arc::clone(&answers),
        ));
        QuizApp::new(
            Settings::default(),
            tracker,
            pool,
            answers,
            Arc::new(PopupRelay::new()),
            Box::new(FixedCapture { calls }),
            Arc::new(AtomicBool::new(true)),
        )
    }

    #[test]
    fn capture_cooldown_suppresses_rapid_triggers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = test_app(Arc::clone(&calls));
        let base = Instant::now();

        app.on_capture_at(base);
        app.on_capture_at(base + Duration::from_millis(500));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        app.on_capture_at(base + Duration::from_secs(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn capture_hides_visible_popup_first() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = test_app(calls);
        app.relay.set_visible(true);
        app.on_capture_at(Instant::now());
        assert_eq!(
            app.relay.drain(),
            vec![crate::relay::PopupCommand::Hide]
        );
    }

    #[test]
    fn results_text_reflects_request_status() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = test_app(calls);

        let idle = app.tracker.snapshot();
        assert!(app.results_text(&idle).contains("No data yet"));

        let id = app.tracker.create();
        let processing = app.tracker.snapshot();
        assert!(app.results_text(&processing).starts_with("Processing..."));

        app.tracker
            .set_error(id, NO_QUESTIONS_MESSAGE.to_string());
        let soft = app.tracker.snapshot();
        assert!(app.results_text(&soft).contains("No questions found"));

        let id = app.tracker.create();
        app.tracker.set_error(id, "Timeout: analysis service not responding".to_string());
        let hard = app.tracker.snapshot();
        assert!(app.results_text(&hard).starts_with("Error: Timeout"));
    }

    #[test]
    fn toggle_results_hides_when_visible() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = test_app(calls);
        app.relay.set_visible(true);
        app.on_toggle_results();
        assert_eq!(
            app.relay.drain(),
            vec![crate::relay::PopupCommand::Hide]
        );
    }

    #[test]
    fn show_answers_with_empty_history_explains() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = test_app(calls);
        app.on_show_answers();
        match app.relay.drain().as_slice() {
            [crate::relay::PopupCommand::Show(text)] => {
                assert!(text.contains("No answers saved"))
            }
            other => panic!("unexpected commands: {other:?}"),
        }
    }

    #[test]
    fn reset_answers_confirms_with_a_count() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = test_app(calls);
        app.handle_action(HotkeyAction::ResetAnswers);
        match app.relay.drain().as_slice() {
            [crate::relay::PopupCommand::Show(text)] => {
                assert_eq!(text, "Cleared 0 answers")
            }
            other => panic!("unexpected commands: {other:?}"),
        }
    }

    #[test]
    fn exit_clears_running_flag() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = test_app(calls);
        app.handle_action(HotkeyAction::Exit);
        assert!(!app.running.load(Ordering::Acquire));
    }
}
