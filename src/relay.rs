use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Intent carried from any producer thread to the popup-owning thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupCommand {
    Show(String),
    Hide,
}

/// Single-consumer hand-off queue for popup intents.
///
/// Producers drain whatever is still queued before enqueueing their own
/// command, so the consumer only ever acts on the newest intent; a rapid
/// show/show sequence never flashes stale content. The `visible` flag is
/// owned by the consumer and read by handlers to pick a toggle direction.
#[derive(Default)]
pub struct PopupRelay {
    queue: Mutex<VecDeque<PopupCommand>>,
    visible: AtomicBool,
}

impl PopupRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&self, content: impl Into<String>) {
        self.replace(PopupCommand::Show(content.into()));
    }

    pub fn hide(&self) {
        self.replace(PopupCommand::Hide);
    }

    // Clear-before-enqueue: last write wins.
    fn replace(&self, command: PopupCommand) {
        let mut queue = self.queue.lock().unwrap();
        queue.clear();
        queue.push_back(command);
    }

    /// Take everything queued since the last poll. Only the popup thread
    /// calls this.
    pub fn drain(&self) -> Vec<PopupCommand> {
        let mut queue = self.queue.lock().unwrap();
        queue.drain(..).collect()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    /// Consumer-side visibility update, called after a surface is built or
    /// torn down.
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_show_wins_before_poll() {
        let relay = PopupRelay::new();
        relay.show("X");
        relay.show("Y");
        assert_eq!(relay.drain(), vec![PopupCommand::Show("Y".into())]);
    }

    #[test]
    fn hide_supersedes_pending_show() {
        let relay = PopupRelay::new();
        relay.show("X");
        relay.hide();
        assert_eq!(relay.drain(), vec![PopupCommand::Hide]);
    }

    #[test]
    fn drain_empties_queue() {
        let relay = PopupRelay::new();
        relay.show("X");
        assert_eq!(relay.drain().len(), 1);
        assert!(relay.drain().is_empty());
    }

    #[test]
    fn visibility_defaults_to_hidden() {
        let relay = PopupRelay::new();
        assert!(!relay.is_visible());
        relay.set_visible(true);
        assert!(relay.is_visible());
    }
}
