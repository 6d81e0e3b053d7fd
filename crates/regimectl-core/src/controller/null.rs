use crate::action::Decision;
use crate::controller::{Controller, ControllerState};
use crate::window::Window;

/// Baseline policy: never intervenes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullController;

impl Controller for NullController {
    fn id(&self) -> &str {
        "null"
    }

    fn decide(&self, _window: &Window, _state: &mut ControllerState) -> Decision {
        Decision::hold()
    }
}
