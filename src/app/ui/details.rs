use eframe::egui::{self, RichText, Ui};

use crate::util::{display_address, format_metric};

use super::super::ViewModel;
use super::super::overlay::OverlayId;

const NEIGHBOR_ROW_HEIGHT: f32 = 22.0;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let overlay = self.scene.overlay();
        if !overlay.visible(OverlayId::NodeDetails) {
            ui.label("Click a peer in the view or pick one from the search results.");
            return;
        }

        let mut lines = overlay.text(OverlayId::NodeDetails).lines();
        if let Some(address) = lines.next() {
            ui.label(RichText::new(address).strong());
        }
        for line in lines {
            ui.label(line);
        }

        let world = self.scene.world();
        let Some(peer) = world.selected_peer() else {
            return;
        };
        ui.small(peer.address.as_str());
        let clear_requested = ui.button("Clear selection").clicked();

        ui.separator();
        let mode = world.color_mode();
        ui.label(RichText::new(format!("Neighbours (by {})", mode.label())).strong());

        let peers = &world.snapshot().peers;
        let mut neighbors = world.neighbors(peer.index).to_vec();
        neighbors.sort_by(|&a, &b| peers[b].metric(mode).total_cmp(&peers[a].metric(mode)));
        let mut revealed = None;
        if neighbors.is_empty() {
            ui.label("This peer reported no connections.");
        }
        egui::ScrollArea::vertical()
            .id_salt("neighbor_scroll")
            .auto_shrink([false, false])
            .show_rows(ui, NEIGHBOR_ROW_HEIGHT, neighbors.len(), |ui, row_range| {
                for &neighbor in &neighbors[row_range] {
                    let record = &peers[neighbor];
                    let label = format!(
                        "{}  ({})",
                        display_address(&record.address),
                        format_metric(record.metric(mode))
                    );
                    if ui.link(label).on_hover_text(record.geo.place()).clicked() {
                        revealed = Some(neighbor);
                    }
                }
            });

        if clear_requested {
            self.scene.clear_selection();
        } else if let Some(neighbor) = revealed {
            self.scene.reveal(neighbor);
        }
    }
}
