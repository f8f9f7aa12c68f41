/// Semantic requests consumed by the overlay state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayRequest {
    Toggle,
    Clear,
    Close,
}

/// Messages posted by the global listener thread. They carry no UI state;
/// the UI thread resolves them against the current overlay mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookSignal {
    /// Middle button pressed while the listener's own ctrl tracker was set.
    CtrlMiddleClick,
    /// `Z` pressed while the listener saw both ctrl and shift held.
    CtrlShiftZ,
    ListenerUnavailable { reason: String },
}
