use rdev::{Button, EventType, Key};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Minimum interval between two accepted triggers of the same hotkey.
pub const HOTKEY_COOLDOWN: Duration = Duration::from_millis(500);

/// A named user intent, decoupled from the physical event that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    Capture,
    ToggleResults,
    ShowAnswers,
    ResetAnswers,
    OpenSettings,
    ClearLogs,
    Exit,
}

pub const DEFAULT_CAPTURE_CHAR: char = 'z';
pub const DEFAULT_RESULTS_CHAR: char = 'x';
pub const DEFAULT_ANSWERS_CHAR: char = 'c';
pub const DEFAULT_RESET_CHAR: char = 'r';
pub const DEFAULT_SETTINGS_CHAR: char = 's';

/// Map from trigger character to logical action for the Alt-gated path.
#[derive(Debug, Clone)]
pub struct HotkeyBindings {
    map: HashMap<char, HotkeyAction>,
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self::with_chars(
            DEFAULT_CAPTURE_CHAR,
            DEFAULT_RESULTS_CHAR,
            DEFAULT_ANSWERS_CHAR,
            DEFAULT_RESET_CHAR,
            DEFAULT_SETTINGS_CHAR,
        )
    }
}

impl HotkeyBindings {
    /// Build the binding table. Characters that are not single lowercase
    /// ascii letters fall back to the documented defaults with a warning.
    pub fn with_chars(
        capture: char,
        results: char,
        answers: char,
        reset: char,
        settings: char,
    ) -> Self {
        let mut map = HashMap::new();
        for (name, ch, default, action) in [
            ("capture", capture, DEFAULT_CAPTURE_CHAR, HotkeyAction::Capture),
            ("results", results, DEFAULT_RESULTS_CHAR, HotkeyAction::ToggleResults),
            ("answers", answers, DEFAULT_ANSWERS_CHAR, HotkeyAction::ShowAnswers),
            ("reset", reset, DEFAULT_RESET_CHAR, HotkeyAction::ResetAnswers),
            ("settings", settings, DEFAULT_SETTINGS_CHAR, HotkeyAction::OpenSettings),
        ] {
            let ch = if ch.is_ascii_lowercase() {
                ch
            } else {
                tracing::warn!(
                    action = name,
                    configured = %ch,
                    fallback = %default,
                    "hotkey must be a lowercase letter; using default"
                );
                default
            };
            if map.insert(ch, action).is_some() {
                tracing::warn!(key = %ch, "duplicate hotkey character; last binding wins");
            }
        }
        Self { map }
    }

    pub fn action_for(&self, ch: char) -> Option<HotkeyAction> {
        self.map.get(&ch).copied()
    }
}

pub type ActionHandler = Arc<dyn Fn(HotkeyAction) + Send + Sync>;

/// Translates raw hook events into debounced logical actions.
///
/// Exactly one hook thread mutates this state, so no lock is needed around
/// the modifier flags or the debounce table.
pub struct EventDispatcher {
    bindings: HotkeyBindings,
    cooldown: Duration,
    last_triggered: HashMap<char, Instant>,
    alt_held: bool,
    middle_held: bool,
    handler: ActionHandler,
}

impl EventDispatcher {
    pub fn new(bindings: HotkeyBindings, handler: ActionHandler) -> Self {
        Self {
            bindings,
            cooldown: HOTKEY_COOLDOWN,
            last_triggered: HashMap::new(),
            alt_held: false,
            middle_held: false,
            handler,
        }
    }

    pub fn handle(&mut self, event: &EventType) {
        self.handle_at(event, Instant::now());
    }

    /// Like [`handle`](Self::handle) but with an injected clock so debounce
    /// windows can be exercised deterministically.
    pub fn handle_at(&mut self, event: &EventType, now: Instant) {
        match event {
            EventType::KeyPress(key) => self.on_key_press(*key, now),
            EventType::KeyRelease(key) => {
                if is_alt(*key) {
                    self.alt_held = false;
                }
            }
            EventType::ButtonPress(Button::Middle) => {
                tracing::debug!("middle button held");
                self.middle_held = true;
            }
            EventType::ButtonRelease(Button::Middle) => {
                tracing::debug!("middle button released");
                self.middle_held = false;
            }
            EventType::Wheel { delta_y, .. } => self.on_wheel(*delta_y),
            _ => {}
        }
    }

    fn on_key_press(&mut self, key: Key, now: Instant) {
        if is_alt(key) {
            self.alt_held = true;
            return;
        }

        // Clear-logs is direct: no modifier, no debounce.
        if key == Key::Delete {
            tracing::info!("clear-logs key pressed");
            self.dispatch(HotkeyAction::ClearLogs);
            return;
        }

        let Some(ch) = char_from_key(key) else {
            // No printable payload; only the modifier path cares about it.
            return;
        };

        // The exit trigger bypasses the modifier gate entirely.
        if ch == '`' {
            tracing::info!("exit key pressed");
            self.dispatch(HotkeyAction::Exit);
            return;
        }

        if !self.alt_held {
            return;
        }

        let Some(action) = self.bindings.action_for(ch) else {
            return;
        };

        if let Some(last) = self.last_triggered.get(&ch) {
            if now.duration_since(*last) < self.cooldown {
                tracing::debug!(key = %ch, "hotkey suppressed by cooldown");
                return;
            }
        }
        self.last_triggered.insert(ch, now);

        tracing::info!(key = %ch, ?action, "hotkey triggered");
        self.dispatch(action);
    }

    // Middle-button + scroll aliases two hotkeys; the alias path skips the
    // debounce table, so a near-simultaneous key trigger can double-fire.
    // The capture handler's own cooldown bounds that.
    fn on_wheel(&mut self, delta_y: i64) {
        if !self.middle_held {
            return;
        }
        if delta_y > 0 {
            tracing::info!("middle + scroll up: capture");
            self.dispatch(HotkeyAction::Capture);
        } else if delta_y < 0 {
            tracing::info!("middle + scroll down: show answers");
            self.dispatch(HotkeyAction::ShowAnswers);
        }
    }

    // A panicking handler must never unwind into the OS hook thread.
    fn dispatch(&self, action: HotkeyAction) {
        let handler = Arc::clone(&self.handler);
        if std::panic::catch_unwind(AssertUnwindSafe(|| handler(action))).is_err() {
            tracing::error!(?action, "action handler panicked");
        }
    }
}

fn is_alt(key: Key) -> bool {
    matches!(key, Key::Alt | Key::AltGr)
}

/// Printable character for the keys the binding table can reference.
pub fn char_from_key(key: Key) -> Option<char> {
    let ch = match key {
        Key::KeyA => 'a',
        Key::KeyB => 'b',
        Key::KeyC => 'c',
        Key::KeyD => 'd',
        Key::KeyE => 'e',
        Key::KeyF => 'f',
        Key::KeyG => 'g',
        Key::KeyH => 'h',
        Key::KeyI => 'i',
        Key::KeyJ => 'j',
        Key::KeyK => 'k',
        Key::KeyL => 'l',
        Key::KeyM => 'm',
        Key::KeyN => 'n',
        Key::KeyO => 'o',
        Key::KeyP => 'p',
        Key::KeyQ => 'q',
        Key::KeyR => 'r',
        Key::KeyS => 's',
        Key::KeyT => 't',
        Key::KeyU => 'u',
        Key::KeyV => 'v',
        Key::KeyW => 'w',
        Key::KeyX => 'x',
        Key::KeyY => 'y',
        Key::KeyZ => 'z',
        Key::Num0 => '0',
        Key::Num1 => '1',
        Key::Num2 => '2',
        Key::Num3 => '3',
        Key::Num4 => '4',
        Key::Num5 => '5',
        Key::Num6 => '6',
        Key::Num7 => '7',
        Key::Num8 => '8',
        Key::Num9 => '9',
        Key::BackQuote => '`',
        _ => return None,
    };
    Some(ch)
}
