use crate::dispatcher::EventDispatcher;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Installs the global input hook and feeds every event to the dispatcher.
///
/// `rdev` delivers keyboard and pointer events through one OS listener, so a
/// single hook thread serves both sources. The thread never blocks on
/// anything but the hook itself; action handlers must hand real work off
/// elsewhere.
pub struct InputListener {
    dispatcher: Arc<Mutex<EventDispatcher>>,
}

impl InputListener {
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(Mutex::new(dispatcher)),
        }
    }

    /// Spawn the hook thread. The hook cannot be uninstalled once grabbed;
    /// the thread runs for the life of the process and restarts the listener
    /// if it fails.
    pub fn start(&self) {
        let dispatcher = Arc::clone(&self.dispatcher);
        tracing::debug!("starting input hook thread");
        thread::spawn(move || loop {
            let dispatcher_for_hook = Arc::clone(&dispatcher);
            let result = rdev::listen(move |event| {
                if let Ok(mut guard) = dispatcher_for_hook.lock() {
                    guard.handle(&event.event_type);
                }
            });

            match result {
                Ok(()) => tracing::warn!("input hook exited unexpectedly; restarting shortly"),
                Err(err) => tracing::warn!(?err, "input hook failed; retrying shortly"),
            }
            thread::sleep(Duration::from_millis(500));
        });
    }
}
