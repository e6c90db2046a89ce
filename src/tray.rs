use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const TRAY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Background-presence indicator.
///
/// The engine only ever talks to this trait; real icon plumbing lives behind
/// it. The default backend just logs, which keeps headless platforms and
/// tests honest.
pub trait TrayBackend: Send + Sync {
    fn announce_startup(&self, summary: &str);
    fn set_status(&self, status: &str);
    /// True once when the user asked to quit through the tray.
    fn take_exit_request(&self) -> bool {
        false
    }
    fn shutdown(&self) {}
}

pub struct LoggingTray;

impl TrayBackend for LoggingTray {
    fn announce_startup(&self, summary: &str) {
        tracing::info!(summary, "running in background");
    }

    fn set_status(&self, status: &str) {
        tracing::debug!(status, "tray status");
    }
}

/// Spawn the tray thread: announces startup, then watches for a tray-driven
/// exit until the shared running flag clears.
pub fn spawn_tray_thread(
    backend: Arc<dyn TrayBackend>,
    running: Arc<AtomicBool>,
    startup_summary: String,
) -> JoinHandle<()> {
    thread::spawn(move || {
        backend.announce_startup(&startup_summary);
        while running.load(Ordering::Acquire) {
            if backend.take_exit_request() {
                tracing::info!("exit requested from tray");
                running.store(false, Ordering::Release);
                break;
            }
            thread::sleep(TRAY_POLL_INTERVAL);
        }
        backend.shutdown();
        tracing::debug!("tray thread exited");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct QuitOnceTray {
        asked: AtomicUsize,
    }

    impl TrayBackend for QuitOnceTray {
        fn announce_startup(&self, _summary: &str) {}
        fn set_status(&self, _status: &str) {}
        fn take_exit_request(&self) -> bool {
            self.asked.fetch_add(1, Ordering::SeqCst) == 0
        }
    }

    #[test]
    fn tray_exit_request_clears_running_flag() {
        let running = Arc::new(AtomicBool::new(true));
        let backend = Arc::new(QuitOnceTray {
            asked: AtomicUsize::new(0),
        });
        let handle = spawn_tray_thread(backend, Arc::clone(&running), "test".into());
        handle.join().unwrap();
        assert!(!running.load(Ordering::Acquire));
    }
}
