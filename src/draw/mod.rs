pub mod composite;
pub mod controller;
pub mod input;
pub mod input_hook;
pub mod messages;
pub mod model;
pub mod modifiers;
pub mod overlay;
pub mod state;

pub use messages::{HookSignal, OverlayRequest};
pub use model::{Color, DrawMode, Point, Stroke, StrokeStore, ToolState};
pub use overlay::{run, OverlayOptions};
pub use state::{OverlayMode, OverlayStateMachine, SurfaceHost, Transition};
