use crate::draw::messages::{HookSignal, OverlayRequest};
use crate::draw::modifiers::{ModifierKey, ModifierState};
use crate::draw::state::OverlayMode;
use anyhow::{anyhow, Result};
use rdev::{listen, Button, EventType, Key};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_LISTENER_RETRY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKey {
    Modifier(ModifierKey),
    Z,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookButton {
    Middle,
    Other,
}

/// System-wide input as observed by the global listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalInputEvent {
    KeyPress(HookKey),
    KeyRelease(HookKey),
    ButtonPress(HookButton),
}

pub fn translate_event(event_type: &EventType) -> Option<GlobalInputEvent> {
    match event_type {
        EventType::KeyPress(key) => Some(GlobalInputEvent::KeyPress(map_key(*key))),
        EventType::KeyRelease(key) => Some(GlobalInputEvent::KeyRelease(map_key(*key))),
        EventType::ButtonPress(button) => {
            Some(GlobalInputEvent::ButtonPress(map_button(*button)))
        }
        _ => None,
    }
}

fn map_key(key: Key) -> HookKey {
    match key {
        Key::ControlLeft | Key::ControlRight => HookKey::Modifier(ModifierKey::Ctrl),
        Key::ShiftLeft | Key::ShiftRight => HookKey::Modifier(ModifierKey::Shift),
        Key::KeyZ => HookKey::Z,
        _ => HookKey::Other,
    }
}

fn map_button(button: Button) -> HookButton {
    match button {
        Button::Middle => HookButton::Middle,
        _ => HookButton::Other,
    }
}

/// Modifier tracking owned by the listener thread. It only sees the
/// listener's own press/release events and is never synchronised with the
/// application-level tracker.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalHookState {
    modifiers: ModifierState,
}

impl GlobalHookState {
    pub fn modifiers(&self) -> ModifierState {
        self.modifiers
    }

    pub fn handle(&mut self, event: GlobalInputEvent) -> Option<HookSignal> {
        match event {
            GlobalInputEvent::KeyPress(HookKey::Modifier(key)) => {
                self.modifiers.apply(key, true);
                None
            }
            GlobalInputEvent::KeyRelease(HookKey::Modifier(key)) => {
                self.modifiers.apply(key, false);
                None
            }
            GlobalInputEvent::KeyPress(HookKey::Z) if self.modifiers.ctrl_shift() => {
                Some(HookSignal::CtrlShiftZ)
            }
            GlobalInputEvent::ButtonPress(HookButton::Middle) if self.modifiers.ctrl => {
                Some(HookSignal::CtrlMiddleClick)
            }
            _ => None,
        }
    }
}

/// Resolves a listener signal against the overlay mode on the UI thread.
pub fn resolve_signal(signal: &HookSignal, mode: OverlayMode) -> Option<OverlayRequest> {
    match (signal, mode) {
        (HookSignal::CtrlShiftZ, _) => Some(OverlayRequest::Toggle),
        (HookSignal::CtrlMiddleClick, OverlayMode::Enabled) => Some(OverlayRequest::Clear),
        (HookSignal::CtrlMiddleClick, OverlayMode::Disabled) => Some(OverlayRequest::Toggle),
        (HookSignal::ListenerUnavailable { .. }, _) => None,
    }
}

pub type WakeFn = Arc<dyn Fn() + Send + Sync>;

/// Spawns the process-lifetime global listener. Matched shortcuts are posted
/// to `signals` and `wake` is called so the UI thread drains them promptly.
/// When the OS refuses the hook a single `ListenerUnavailable` is posted and
/// installation is retried every `retry`.
pub fn spawn_global_listener(
    signals: Sender<HookSignal>,
    wake: WakeFn,
    retry: Duration,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("ink-global-listener".to_string())
        .spawn(move || run_listener(signals, wake, retry))
        .map_err(|err| anyhow!("failed to spawn global listener thread: {err}"))
}

fn run_listener(signals: Sender<HookSignal>, wake: WakeFn, retry: Duration) {
    tracing::debug!("starting global input listener");
    let mut reported_unavailable = false;
    loop {
        let mut hook = GlobalHookState::default();
        let callback_signals = signals.clone();
        let callback_wake = wake.clone();

        let result = listen(move |event| {
            let Some(input) = translate_event(&event.event_type) else {
                return;
            };
            if let Some(signal) = hook.handle(input) {
                tracing::debug!(?signal, modifiers = ?hook.modifiers(), "global shortcut matched");
                if callback_signals.send(signal).is_ok() {
                    callback_wake();
                }
            }
        });

        match result {
            Ok(()) => tracing::warn!("global listener exited unexpectedly; restarting shortly"),
            Err(err) if reported_unavailable => {
                tracing::debug!(?err, "global listener still unavailable");
            }
            Err(err) => {
                tracing::warn!(
                    ?err,
                    "global listener unavailable; only focused shortcuts will work"
                );
                reported_unavailable = true;
                let reason = format!("{err:?}");
                if signals
                    .send(HookSignal::ListenerUnavailable { reason })
                    .is_err()
                {
                    return;
                }
                wake();
            }
        }

        thread::sleep(retry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(state: &mut GlobalHookState, events: &[GlobalInputEvent]) -> Vec<HookSignal> {
        events.iter().filter_map(|e| state.handle(*e)).collect()
    }

    const CTRL: HookKey = HookKey::Modifier(ModifierKey::Ctrl);
    const SHIFT: HookKey = HookKey::Modifier(ModifierKey::Shift);

    #[test]
    fn ctrl_shift_z_emits_toggle_signal() {
        let mut state = GlobalHookState::default();
        let signals = feed(
            &mut state,
            &[
                GlobalInputEvent::KeyPress(CTRL),
                GlobalInputEvent::KeyPress(SHIFT),
                GlobalInputEvent::KeyPress(HookKey::Z),
            ],
        );
        assert_eq!(signals, vec![HookSignal::CtrlShiftZ]);
    }

    #[test]
    fn z_without_both_modifiers_is_ignored() {
        let mut state = GlobalHookState::default();
        let signals = feed(
            &mut state,
            &[
                GlobalInputEvent::KeyPress(CTRL),
                GlobalInputEvent::KeyPress(HookKey::Z),
                GlobalInputEvent::KeyPress(SHIFT),
                GlobalInputEvent::KeyRelease(CTRL),
                GlobalInputEvent::KeyPress(HookKey::Z),
            ],
        );
        assert!(signals.is_empty());
    }

    #[test]
    fn middle_click_requires_listener_ctrl() {
        let mut state = GlobalHookState::default();
        assert_eq!(
            state.handle(GlobalInputEvent::ButtonPress(HookButton::Middle)),
            None
        );
        state.handle(GlobalInputEvent::KeyPress(CTRL));
        assert_eq!(
            state.handle(GlobalInputEvent::ButtonPress(HookButton::Middle)),
            Some(HookSignal::CtrlMiddleClick)
        );
        assert_eq!(
            state.handle(GlobalInputEvent::ButtonPress(HookButton::Other)),
            None
        );
    }

    #[test]
    fn middle_click_resolves_by_mode() {
        assert_eq!(
            resolve_signal(&HookSignal::CtrlMiddleClick, OverlayMode::Disabled),
            Some(OverlayRequest::Toggle)
        );
        assert_eq!(
            resolve_signal(&HookSignal::CtrlMiddleClick, OverlayMode::Enabled),
            Some(OverlayRequest::Clear)
        );
        assert_eq!(
            resolve_signal(&HookSignal::CtrlShiftZ, OverlayMode::Enabled),
            Some(OverlayRequest::Toggle)
        );
        assert_eq!(
            resolve_signal(
                &HookSignal::ListenerUnavailable {
                    reason: "denied".into()
                },
                OverlayMode::Enabled
            ),
            None
        );
    }

    #[test]
    fn left_and_right_modifiers_map_to_the_same_cell() {
        assert_eq!(
            translate_event(&EventType::KeyPress(Key::ControlRight)),
            Some(GlobalInputEvent::KeyPress(CTRL))
        );
        assert_eq!(
            translate_event(&EventType::KeyRelease(Key::ShiftLeft)),
            Some(GlobalInputEvent::KeyRelease(SHIFT))
        );
        assert_eq!(
            translate_event(&EventType::ButtonPress(Button::Middle)),
            Some(GlobalInputEvent::ButtonPress(HookButton::Middle))
        );
        assert_eq!(translate_event(&EventType::MouseMove { x: 1.0, y: 2.0 }), None);
    }
}
