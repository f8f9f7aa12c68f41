use crate::draw::input_hook::resolve_signal;
use crate::draw::messages::HookSignal;
use crate::draw::state::{OverlayStateMachine, SurfaceHost, Transition};
use std::sync::mpsc::{Receiver, TryRecvError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerStatus {
    Listening,
    Unavailable { reason: String },
}

/// Single consumer of the global listener queue, drained on the UI thread.
pub struct OverlayController {
    hook_rx: Receiver<HookSignal>,
    listener: ListenerStatus,
}

impl OverlayController {
    pub fn new(hook_rx: Receiver<HookSignal>) -> Self {
        Self {
            hook_rx,
            listener: ListenerStatus::Listening,
        }
    }

    pub fn listener_status(&self) -> &ListenerStatus {
        &self.listener
    }

    pub fn pump_hook_signals(
        &mut self,
        machine: &mut OverlayStateMachine,
        host: &mut dyn SurfaceHost,
    ) -> Vec<Transition> {
        let mut transitions = Vec::new();
        loop {
            match self.hook_rx.try_recv() {
                Ok(HookSignal::ListenerUnavailable { reason }) => {
                    tracing::warn!(%reason, "global shortcuts disabled");
                    self.listener = ListenerStatus::Unavailable { reason };
                }
                Ok(signal) => {
                    if let Some(request) = resolve_signal(&signal, machine.mode()) {
                        transitions.push(machine.apply(request, host));
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.listener == ListenerStatus::Listening {
                        tracing::warn!("global listener thread ended");
                        self.listener = ListenerStatus::Unavailable {
                            reason: "listener thread ended".to_string(),
                        };
                    }
                    break;
                }
            }
        }
        transitions
    }
}
