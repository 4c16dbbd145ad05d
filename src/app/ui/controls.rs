use eframe::egui::{self, RichText, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::snapshot::{Metric, PeerRecord};
use crate::util::display_address;

use super::super::input::KEY_HELP;
use super::super::overlay::{DisplayFlag, OverlayId};
use super::super::world::ConnectionMode;
use super::super::{SearchCache, ViewModel};

const MAX_SEARCH_RESULTS: usize = 64;
const SEARCH_ROW_HEIGHT: f32 = 22.0;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Best score over address, city and country.
fn peer_score(matcher: &SkimMatcherV2, peer: &PeerRecord, query: &str) -> Option<i64> {
    [
        fuzzy_match_score(matcher, &peer.address, query),
        fuzzy_match_score(matcher, &peer.geo.city, query),
        fuzzy_match_score(matcher, &peer.geo.country, query),
    ]
    .into_iter()
    .flatten()
    .max()
}

fn search_peers(peers: &[PeerRecord], query: &str, limit: usize) -> Vec<usize> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, usize)> = peers
        .iter()
        .filter(|peer| !peer.is_malformed())
        .filter_map(|peer| peer_score(&matcher, peer, query).map(|score| (score, peer.index)))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.truncate(limit);
    scored.into_iter().map(|(_, index)| index).collect()
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("View Controls");
        ui.separator();
        ui.add_space(4.0);

        let overlay = self.scene.overlay();
        ui.label(RichText::new(overlay.text(OverlayId::ColorMode)).strong());

        let mut color_mode = self.scene.world().color_mode();
        egui::ComboBox::from_label("Color metric")
            .selected_text(color_mode.label())
            .show_ui(ui, |ui| {
                for metric in Metric::ALL {
                    ui.selectable_value(&mut color_mode, metric, metric.label());
                }
            });
        if color_mode != self.scene.world().color_mode() {
            self.scene.set_color_mode(color_mode);
        }

        let small_graph = self.scene.world().small_graph();
        let mut connection_mode = self.scene.world().connection_mode();
        egui::ComboBox::from_label("Connections")
            .selected_text(connection_mode.label())
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut connection_mode, ConnectionMode::None, ConnectionMode::None.label());
                ui.selectable_value(
                    &mut connection_mode,
                    ConnectionMode::Selected,
                    ConnectionMode::Selected.label(),
                );
                ui.add_enabled_ui(small_graph, |ui| {
                    ui.selectable_value(&mut connection_mode, ConnectionMode::All, ConnectionMode::All.label())
                        .on_disabled_hover_text("Only available for small graphs.");
                });
            });
        if connection_mode != self.scene.world().connection_mode() {
            self.scene.set_connection_mode(connection_mode);
        }

        ui.separator();
        ui.horizontal_wrapped(|ui| {
            for flag in DisplayFlag::ALL {
                let mut enabled = self.scene.flags().get(flag);
                let available = flag != DisplayFlag::Map || self.scene.flags().map_available();
                let response = ui.add_enabled(available, egui::Checkbox::new(&mut enabled, flag.label()));
                if response.changed() {
                    self.scene.set_display_flag(flag, enabled);
                }
            }
        });

        ui.separator();
        ui.label("Search (address, city or country)")
            .on_hover_text("Fuzzy match; click a result to select and focus the peer.");
        ui.text_edit_singleline(&mut self.search);
        self.draw_search_results(ui);

        if self.scene.flags().get(DisplayFlag::Help) {
            ui.separator();
            ui.label(RichText::new("Keyboard").strong());
            egui::Grid::new("key_help").num_columns(2).striped(true).show(ui, |ui| {
                for (keys, description) in KEY_HELP {
                    ui.monospace(keys);
                    ui.label(description);
                    ui.end_row();
                }
            });
            ui.small("Drag to pan, scroll or pinch to zoom, click a peer to select it.");
        }
    }

    fn draw_search_results(&mut self, ui: &mut Ui) {
        let query = self.search.trim();
        if query.is_empty() {
            self.search_cache = None;
            return;
        }

        let stale = self.search_cache.as_ref().is_none_or(|cache| cache.query != query);
        if stale {
            let matches = search_peers(&self.scene.world().snapshot().peers, query, MAX_SEARCH_RESULTS);
            self.search_cache = Some(SearchCache {
                query: query.to_owned(),
                matches,
            });
        }
        let Some(cache) = &self.search_cache else {
            return;
        };

        if cache.matches.is_empty() {
            ui.label("No matching peers.");
            return;
        }

        let peers = &self.scene.world().snapshot().peers;
        let mut revealed = None;
        egui::ScrollArea::vertical()
            .id_salt("search_results_scroll")
            .max_height(260.0)
            .auto_shrink([false, true])
            .show_rows(ui, SEARCH_ROW_HEIGHT, cache.matches.len(), |ui, row_range| {
                for &index in &cache.matches[row_range] {
                    let peer = &peers[index];
                    let label = format!("{}  {}", display_address(&peer.address), peer.geo.place());
                    if ui.link(label).clicked() {
                        revealed = Some(index);
                    }
                }
            });

        if let Some(index) = revealed {
            self.scene.reveal(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::snapshot_from_json;

    const SNAPSHOT: &str = r#"{
        "nodes": [
            {"address": "/ip4/10.0.0.1/tcp/4001", "betweenness": 0.1, "closeness": 0.2,
             "connections": [1], "geolocation": {"lat": 52.5, "long": 13.4, "city": "Berlin", "country": "Germany"}},
            {"address": "/ip4/10.0.0.2/tcp/4001", "betweenness": 0.3, "closeness": 0.4,
             "connections": [0], "geolocation": {"lat": 48.9, "long": 2.35, "city": "Paris", "country": "France"}}
        ]
    }"#;

    #[test]
    fn search_matches_city_and_country() {
        let snapshot = snapshot_from_json(SNAPSHOT, "test").expect("valid snapshot");
        assert_eq!(search_peers(&snapshot.peers, "berlin", 10), vec![0]);
        assert_eq!(search_peers(&snapshot.peers, "Fran", 10), vec![1]);
    }

    #[test]
    fn blank_query_matches_nothing() {
        let snapshot = snapshot_from_json(SNAPSHOT, "test").expect("valid snapshot");
        assert!(search_peers(&snapshot.peers, "   ", 10).is_empty());
    }

    #[test]
    fn results_respect_limit() {
        let snapshot = snapshot_from_json(SNAPSHOT, "test").expect("valid snapshot");
        assert_eq!(search_peers(&snapshot.peers, "10.0.0", 1).len(), 1);
    }
}
