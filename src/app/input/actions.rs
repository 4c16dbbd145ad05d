use eframe::egui::Key;

use crate::app::overlay::DisplayFlag;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum PanDirection {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum ZoomDirection {
    In,
    Out,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum Action {
    CycleColorMode,
    CycleConnectionMode,
    Toggle(DisplayFlag),
    ClearSelection,
    ResetCamera,
    Pan(PanDirection),
    Zoom(ZoomDirection),
    ZoomTick(i32),
}

impl Action {
    /// Held actions stay active until their key is released.
    pub(in crate::app) fn is_held(self) -> bool {
        matches!(self, Self::Pan(_) | Self::Zoom(_))
    }
}

pub(in crate::app) fn action_for_key(key: Key) -> Option<Action> {
    let action = match key {
        Key::C => Action::CycleColorMode,
        Key::L => Action::CycleConnectionMode,
        Key::F => Action::Toggle(DisplayFlag::Fps),
        Key::G => Action::Toggle(DisplayFlag::Legend),
        Key::M => Action::Toggle(DisplayFlag::Map),
        Key::P => Action::Toggle(DisplayFlag::PickerDebug),
        Key::H => Action::Toggle(DisplayFlag::Help),
        Key::Escape => Action::ClearSelection,
        Key::R => Action::ResetCamera,
        Key::ArrowLeft | Key::A => Action::Pan(PanDirection::Left),
        Key::ArrowRight | Key::D => Action::Pan(PanDirection::Right),
        Key::ArrowUp | Key::W => Action::Pan(PanDirection::Up),
        Key::ArrowDown | Key::S => Action::Pan(PanDirection::Down),
        Key::E => Action::Zoom(ZoomDirection::In),
        Key::Q => Action::Zoom(ZoomDirection::Out),
        Key::Plus | Key::Equals => Action::ZoomTick(1),
        Key::Minus => Action::ZoomTick(-1),
        _ => return None,
    };
    Some(action)
}

/// Key hints for the help panel.
pub(in crate::app) const KEY_HELP: [(&str, &str); 12] = [
    ("C", "cycle color metric"),
    ("L", "cycle connection lines"),
    ("F", "toggle FPS"),
    ("G", "toggle legend"),
    ("M", "toggle world map"),
    ("P", "toggle picker inset"),
    ("H", "toggle this help"),
    ("Esc", "clear selection"),
    ("R", "reset camera"),
    ("Arrows / WASD", "pan"),
    ("E / Q", "zoom in / out"),
    ("+ / -", "zoom one step"),
];
