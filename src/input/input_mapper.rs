//! Input mapping from raw events to viewer actions
//!
//! Parameter keys are mapped to control-panel steps; whether a step does
//! anything depends on the controls the current mode exposes.

use sdfview_core::{Mode, ParamKey};
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

/// Actions the viewer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Nudge a parameter control by one step (`dir` is +1 or -1)
    Step { key: ParamKey, dir: i32 },
    /// Switch straight to a mode (number keys)
    SetMode(Mode),
    /// Re-run the current mode's load pipeline (R key)
    Refresh,
    /// Pick the layer under the cursor (left click)
    Pick,
    /// Toggle fullscreen mode (F key)
    ToggleFullscreen,
    /// Exit application (Escape)
    Exit,
}

/// Maps raw input events to viewer actions
pub struct InputMapper;

impl InputMapper {
    /// Map keyboard input to an action
    ///
    /// | key | action |
    /// |---|---|
    /// | `M` / `N` | next / previous mode |
    /// | `1`..`5` | mode in control-panel order |
    /// | `L` / `K` | next / previous layer id |
    /// | `Up` / `Down` | raise / lower surface |
    /// | `Right` / `Left` | next / previous slice |
    /// | `I` | toggle inverse |
    pub fn map_keyboard(key: KeyCode, state: ElementState) -> Option<InputAction> {
        if state != ElementState::Pressed {
            return None;
        }

        let step = |key, dir| Some(InputAction::Step { key, dir });
        match key {
            KeyCode::Escape => Some(InputAction::Exit),
            KeyCode::KeyF => Some(InputAction::ToggleFullscreen),
            KeyCode::KeyR => Some(InputAction::Refresh),
            KeyCode::KeyM => step(ParamKey::Mode, 1),
            KeyCode::KeyN => step(ParamKey::Mode, -1),
            KeyCode::KeyL => step(ParamKey::Layers, 1),
            KeyCode::KeyK => step(ParamKey::Layers, -1),
            KeyCode::ArrowUp => step(ParamKey::Surface, 1),
            KeyCode::ArrowDown => step(ParamKey::Surface, -1),
            KeyCode::ArrowRight => step(ParamKey::Layer, 1),
            KeyCode::ArrowLeft => step(ParamKey::Layer, -1),
            KeyCode::KeyI => step(ParamKey::Inverse, 1),
            KeyCode::Digit1 => Some(InputAction::SetMode(Mode::ALL[0])),
            KeyCode::Digit2 => Some(InputAction::SetMode(Mode::ALL[1])),
            KeyCode::Digit3 => Some(InputAction::SetMode(Mode::ALL[2])),
            KeyCode::Digit4 => Some(InputAction::SetMode(Mode::ALL[3])),
            KeyCode::Digit5 => Some(InputAction::SetMode(Mode::ALL[4])),
            _ => None,
        }
    }

    /// Map mouse button to an action; only primary presses pick
    pub fn map_mouse_button(button: MouseButton, state: ElementState) -> Option<InputAction> {
        if button == MouseButton::Left && state == ElementState::Pressed {
            Some(InputAction::Pick)
        } else {
            None
        }
    }
}
