/// Fixed text slots the scene writes into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(in crate::app) enum OverlayId {
    NodeDetails,
    ColorMode,
    GradientLegend,
    Fps,
    Status,
}

impl OverlayId {
    fn index(self) -> usize {
        self as usize
    }
}

pub(in crate::app) trait OverlaySink {
    fn set_text(&mut self, id: OverlayId, text: &str);
    fn set_visible(&mut self, id: OverlayId, visible: bool);
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct OverlayEntry {
    text: String,
    visible: bool,
}

/// Overlay text kept between frames and drawn by the egui panels.
#[derive(Clone, Debug, Default)]
pub(in crate::app) struct OverlayState {
    entries: [OverlayEntry; 5],
}

impl OverlayState {
    pub(in crate::app) fn text(&self, id: OverlayId) -> &str {
        &self.entries[id.index()].text
    }

    pub(in crate::app) fn visible(&self, id: OverlayId) -> bool {
        self.entries[id.index()].visible
    }
}

impl OverlaySink for OverlayState {
    fn set_text(&mut self, id: OverlayId, text: &str) {
        let entry = &mut self.entries[id.index()];
        if entry.text != text {
            entry.text.clear();
            entry.text.push_str(text);
        }
    }

    fn set_visible(&mut self, id: OverlayId, visible: bool) {
        self.entries[id.index()].visible = visible;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum DisplayFlag {
    Fps,
    Legend,
    Map,
    PickerDebug,
    Help,
}

impl DisplayFlag {
    pub(in crate::app) const ALL: [DisplayFlag; 5] = [
        DisplayFlag::Fps,
        DisplayFlag::Legend,
        DisplayFlag::Map,
        DisplayFlag::PickerDebug,
        DisplayFlag::Help,
    ];

    pub(in crate::app) fn label(self) -> &'static str {
        match self {
            Self::Fps => "FPS",
            Self::Legend => "Legend",
            Self::Map => "World map",
            Self::PickerDebug => "Picker inset",
            Self::Help => "Help",
        }
    }

    /// Overlay whose visibility mirrors the flag, if any.
    fn overlay(self) -> Option<OverlayId> {
        match self {
            Self::Fps => Some(OverlayId::Fps),
            Self::Legend => Some(OverlayId::GradientLegend),
            Self::Map | Self::PickerDebug | Self::Help => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum DisplayEvent {
    FlagChanged { flag: DisplayFlag, enabled: bool },
}

impl DisplayEvent {
    pub(in crate::app) fn apply<S: OverlaySink + ?Sized>(self, sink: &mut S) {
        match self {
            Self::FlagChanged { flag, enabled } => {
                if let Some(id) = flag.overlay() {
                    sink.set_visible(id, enabled);
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct DisplayFlags {
    fps: bool,
    legend: bool,
    map: bool,
    picker_debug: bool,
    help: bool,
    map_available: bool,
}

impl Default for DisplayFlags {
    fn default() -> Self {
        Self {
            fps: true,
            legend: true,
            map: false,
            picker_debug: false,
            help: false,
            map_available: false,
        }
    }
}

impl DisplayFlags {
    pub(in crate::app) fn get(&self, flag: DisplayFlag) -> bool {
        match flag {
            DisplayFlag::Fps => self.fps,
            DisplayFlag::Legend => self.legend,
            DisplayFlag::Map => self.map,
            DisplayFlag::PickerDebug => self.picker_debug,
            DisplayFlag::Help => self.help,
        }
    }

    /// Validating setter; returns an event only when the stored value changed.
    pub(in crate::app) fn set(&mut self, flag: DisplayFlag, enabled: bool) -> Option<DisplayEvent> {
        if flag == DisplayFlag::Map && enabled && !self.map_available {
            log::info!("no map image loaded; map stays hidden");
            return None;
        }
        let slot = match flag {
            DisplayFlag::Fps => &mut self.fps,
            DisplayFlag::Legend => &mut self.legend,
            DisplayFlag::Map => &mut self.map,
            DisplayFlag::PickerDebug => &mut self.picker_debug,
            DisplayFlag::Help => &mut self.help,
        };
        if *slot == enabled {
            return None;
        }
        *slot = enabled;
        Some(DisplayEvent::FlagChanged { flag, enabled })
    }

    pub(in crate::app) fn toggle(&mut self, flag: DisplayFlag) -> Option<DisplayEvent> {
        self.set(flag, !self.get(flag))
    }

    /// Marks whether a map texture exists; losing it also hides the map.
    pub(in crate::app) fn set_map_available(&mut self, available: bool) -> Option<DisplayEvent> {
        self.map_available = available;
        self.set(DisplayFlag::Map, available)
    }

    pub(in crate::app) fn map_available(&self) -> bool {
        self.map_available
    }
}
