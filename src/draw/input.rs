use crate::draw::messages::OverlayRequest;
use crate::draw::model::Point;
use crate::draw::modifiers::{ModifierPoller, ModifierState};
use crate::draw::state::OverlayStateMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKey {
    Escape,
    Other,
}

/// Input delivered by the focused drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    Modifiers(ModifierState),
    KeyPress(SurfaceKey),
    PointerPress { button: PointerButton, pos: Point },
    PointerMove { pos: Point },
    PointerRelease { button: PointerButton },
}

/// Application-level input handling. Its modifier cell is fed by focused
/// events and by the 50 ms poll; it is independent of the global listener.
#[derive(Debug, Clone, Default)]
pub struct FocusedInput {
    app_modifiers: ModifierState,
    poller: ModifierPoller,
}

impl FocusedInput {
    pub fn new(poller: ModifierPoller) -> Self {
        Self {
            app_modifiers: ModifierState::default(),
            poller,
        }
    }

    pub fn app_modifiers(&self) -> ModifierState {
        self.app_modifiers
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        self.poller.interval()
    }

    /// Samples the application modifier state if the poll interval elapsed.
    pub fn poll_modifiers(&mut self, now: std::time::Instant, sample: ModifierState) -> bool {
        if !self.poller.due(now) {
            return false;
        }
        self.poller.sample_into(sample, &mut self.app_modifiers)
    }

    pub fn handle(
        &mut self,
        event: SurfaceEvent,
        machine: &mut OverlayStateMachine,
    ) -> Option<OverlayRequest> {
        match event {
            SurfaceEvent::Modifiers(state) => {
                self.app_modifiers = state;
                None
            }
            SurfaceEvent::KeyPress(SurfaceKey::Escape) => Some(OverlayRequest::Close),
            SurfaceEvent::KeyPress(SurfaceKey::Other) => None,
            SurfaceEvent::PointerPress { button, pos } => self.handle_press(button, pos, machine),
            SurfaceEvent::PointerMove { pos } => {
                machine.pointer_move(pos);
                None
            }
            SurfaceEvent::PointerRelease {
                button: PointerButton::Left,
            } => {
                machine.pointer_release();
                None
            }
            SurfaceEvent::PointerRelease { .. } => None,
        }
    }

    fn handle_press(
        &mut self,
        button: PointerButton,
        pos: Point,
        machine: &mut OverlayStateMachine,
    ) -> Option<OverlayRequest> {
        let enabled = machine.mode().is_enabled();
        match button {
            PointerButton::Left if self.app_modifiers.ctrl && !self.app_modifiers.shift => {
                // Ctrl alone; ctrl+shift+click draws like a plain click.
                enabled.then_some(OverlayRequest::Toggle)
            }
            PointerButton::Left => {
                machine.pointer_press(pos);
                None
            }
            PointerButton::Middle if self.app_modifiers.ctrl && enabled => {
                Some(OverlayRequest::Clear)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::state::tests::RecordingHost;
    use crate::draw::state::OverlayMode;
    use std::time::{Duration, Instant};

    fn enabled_machine() -> OverlayStateMachine {
        let mut machine = OverlayStateMachine::default();
        machine.apply(OverlayRequest::Toggle, &mut RecordingHost::default());
        machine
    }

    fn press(button: PointerButton, x: f32, y: f32) -> SurfaceEvent {
        SurfaceEvent::PointerPress {
            button,
            pos: Point::new(x, y),
        }
    }

    const CTRL: ModifierState = ModifierState {
        ctrl: true,
        shift: false,
    };

    #[test]
    fn left_drag_records_a_stroke() {
        let mut input = FocusedInput::default();
        let mut machine = enabled_machine();

        assert_eq!(input.handle(press(PointerButton::Left, 1.0, 1.0), &mut machine), None);
        input.handle(
            SurfaceEvent::PointerMove {
                pos: Point::new(2.0, 2.0),
            },
            &mut machine,
        );
        input.handle(
            SurfaceEvent::PointerRelease {
                button: PointerButton::Left,
            },
            &mut machine,
        );
        input.handle(
            SurfaceEvent::PointerMove {
                pos: Point::new(3.0, 3.0),
            },
            &mut machine,
        );

        assert_eq!(machine.store().len(), 1);
        assert_eq!(machine.store().strokes()[0].points.len(), 2);
    }

    #[test]
    fn ctrl_left_click_requests_toggle_without_stroke() {
        let mut input = FocusedInput::default();
        let mut machine = enabled_machine();
        input.handle(SurfaceEvent::Modifiers(CTRL), &mut machine);

        assert_eq!(
            input.handle(press(PointerButton::Left, 5.0, 5.0), &mut machine),
            Some(OverlayRequest::Toggle)
        );
        assert!(machine.store().is_empty());
    }

    #[test]
    fn ctrl_shift_left_click_draws_instead_of_exiting() {
        let mut input = FocusedInput::default();
        let mut machine = enabled_machine();
        input.handle(
            SurfaceEvent::Modifiers(ModifierState {
                ctrl: true,
                shift: true,
            }),
            &mut machine,
        );

        assert_eq!(
            input.handle(press(PointerButton::Left, 5.0, 5.0), &mut machine),
            None
        );
        assert_eq!(machine.mode(), OverlayMode::Enabled);
        assert_eq!(machine.store().len(), 1);
    }

    #[test]
    fn ctrl_left_click_while_disabled_is_ignored() {
        let mut input = FocusedInput::default();
        let mut machine = OverlayStateMachine::default();
        input.handle(SurfaceEvent::Modifiers(CTRL), &mut machine);

        assert_eq!(
            input.handle(press(PointerButton::Left, 5.0, 5.0), &mut machine),
            None
        );
        assert_eq!(machine.mode(), OverlayMode::Disabled);
    }

    #[test]
    fn ctrl_middle_click_clears_while_enabled() {
        let mut input = FocusedInput::default();
        let mut machine = enabled_machine();
        input.handle(SurfaceEvent::Modifiers(CTRL), &mut machine);

        assert_eq!(
            input.handle(press(PointerButton::Middle, 0.0, 0.0), &mut machine),
            Some(OverlayRequest::Clear)
        );
        input.handle(SurfaceEvent::Modifiers(ModifierState::default()), &mut machine);
        assert_eq!(
            input.handle(press(PointerButton::Middle, 0.0, 0.0), &mut machine),
            None
        );
    }

    #[test]
    fn escape_requests_close() {
        let mut input = FocusedInput::default();
        let mut machine = OverlayStateMachine::default();
        assert_eq!(
            input.handle(SurfaceEvent::KeyPress(SurfaceKey::Escape), &mut machine),
            Some(OverlayRequest::Close)
        );
        assert_eq!(
            input.handle(SurfaceEvent::KeyPress(SurfaceKey::Other), &mut machine),
            None
        );
    }

    #[test]
    fn poll_writes_application_modifiers_on_interval() {
        let mut input = FocusedInput::new(ModifierPoller::new(Duration::from_millis(50)));
        let start = Instant::now();

        assert!(input.poll_modifiers(start, CTRL));
        assert!(input.app_modifiers().ctrl);

        // A focused event can overwrite the polled value before the next tick.
        let mut machine = enabled_machine();
        input.handle(SurfaceEvent::Modifiers(ModifierState::default()), &mut machine);
        assert!(!input.poll_modifiers(start + Duration::from_millis(10), CTRL));
        assert!(!input.app_modifiers().ctrl);
        assert!(input.poll_modifiers(start + Duration::from_millis(60), CTRL));
        assert!(input.app_modifiers().ctrl);
    }
}
