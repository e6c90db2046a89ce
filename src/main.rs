use quizlens::analyzer::GeminiClient;
use quizlens::answers::{AnswerLog, ANSWERS_FILE};
use quizlens::app::QuizApp;
use quizlens::capture::ScreenCapture;
use quizlens::dispatcher::EventDispatcher;
use quizlens::listener::InputListener;
use quizlens::popup::{default_surface, spawn_popup_thread};
use quizlens::relay::PopupRelay;
use quizlens::request::RequestTracker;
use quizlens::settings::{Settings, SETTINGS_FILE};
use quizlens::tray::{spawn_tray_thread, LoggingTray};
use quizlens::worker::{AnalysisPool, POOL_SIZE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load(SETTINGS_FILE)?;
    let _log_guard = quizlens::logging::init(settings.debug_logging);
    tracing::info!(hotkeys = %settings.hotkey_summary(), "starting quizlens");

    let running = Arc::new(AtomicBool::new(true));
    let tracker = Arc::new(RequestTracker::new());
    let answers = Arc::new(AnswerLog::load(ANSWERS_FILE));
    let relay = Arc::new(PopupRelay::new());

    let analyzer = Arc::new(GeminiClient::from_env(settings.api_timeout())?);
    let pool = Arc::new(AnalysisPool::new(
        POOL_SIZE,
        analyzer,
        Arc::clone(&tracker),
        Arc::clone(&answers),
    ));

    let app = Arc::new(QuizApp::new(
        settings.clone(),
        tracker,
        pool,
        answers,
        Arc::clone(&relay),
        Box::new(ScreenCapture::default()),
        Arc::clone(&running),
    ));

    let dispatcher = EventDispatcher::new(settings.bindings(), app.action_handler());
    InputListener::new(dispatcher).start();

    let popup_handle = spawn_popup_thread(
        Arc::clone(&relay),
        Arc::clone(&running),
        default_surface(settings.popup_opacity),
    );
    let tray_handle = spawn_tray_thread(
        Arc::new(LoggingTray),
        Arc::clone(&running),
        settings.hotkey_summary(),
    );

    // The hook thread owns input, the pool owns the network, the popup
    // thread owns surfaces. Nothing left to do here but wait.
    while running.load(Ordering::Acquire) {
        thread::sleep(Duration::from_millis(200));
    }

    app.shutdown();
    let _ = popup_handle.join();
    let _ = tray_handle.join();
    tracing::info!("quizlens stopped");
    Ok(())
}
