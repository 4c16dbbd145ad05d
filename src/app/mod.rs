use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{Context as _, Result};
use eframe::egui::{self, Context, mutex::Mutex};
use eframe::glow;

use crate::snapshot::{Snapshot, load_snapshot};

mod camera;
mod color;
mod gpu;
mod input;
mod overlay;
mod scene;
mod ui;
mod world;

use gpu::{MapImage, SceneRenderer};
use input::EventTranslator;
use overlay::OverlayState;
use scene::{Scene, SceneConfig};

/// Startup options collected from the command line.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub snapshot_path: PathBuf,
    pub map_path: Option<PathBuf>,
    pub small_graph_threshold: usize,
}

pub struct PeerMapApp {
    config: AppConfig,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

type LoadResult = Result<LoadedData, String>;

struct LoadedData {
    snapshot: Snapshot,
    map: Option<MapImage>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    scene: Scene<OverlayState>,
    renderer: Arc<Mutex<SceneRenderer>>,
    translator: EventTranslator,
    dark_mode: bool,
    search: String,
    search_cache: Option<SearchCache>,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
}

struct SearchCache {
    query: String,
    /// Peer indices, best match first.
    matches: Vec<usize>,
}

fn load_map_image(path: &Path) -> Result<MapImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode map image {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok(MapImage {
        width,
        height,
        rgba: image.into_raw(),
    })
}

fn load(snapshot_path: &Path, map_path: Option<&Path>) -> Result<LoadedData> {
    let snapshot = load_snapshot(snapshot_path)?;
    let map = map_path.map(load_map_image).transpose()?;
    Ok(LoadedData { snapshot, map })
}

impl PeerMapApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        if cc.gl.is_none() {
            log::warn!("no OpenGL context at startup; the scene cannot be drawn");
        }
        let state = Self::start_load(&config);
        Self {
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(config: &AppConfig) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();
        let snapshot_path = config.snapshot_path.clone();
        let map_path = config.map_path.clone();

        thread::spawn(move || {
            log::info!("loading snapshot {}", snapshot_path.display());
            let result = load(&snapshot_path, map_path.as_deref()).map_err(|error| format!("{error:#}"));
            match &result {
                Ok(data) => log::info!(
                    "loaded {} peers and {} edges from {}",
                    data.snapshot.peer_count(),
                    data.snapshot.edge_count,
                    data.snapshot.source
                ),
                Err(error) => log::error!("load failed: {error}"),
            }
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(config: &AppConfig) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(config),
        }
    }

    fn scene_config(&self) -> SceneConfig {
        SceneConfig {
            small_graph_threshold: self.config.small_graph_threshold,
            ..SceneConfig::default()
        }
    }
}

fn ready_state(result: LoadResult, config: SceneConfig, ctx: &Context, frame: &eframe::Frame) -> AppState {
    let dark_mode = ctx.style().visuals.dark_mode;
    let gl = frame.gl().map(Arc::as_ref);
    let model = result.and_then(|data| {
        ViewModel::new(data, config, gl, dark_mode).map_err(|error| format!("{error:#}"))
    });
    match model {
        Ok(model) => AppState::Ready(Box::new(model)),
        Err(error) => AppState::Error(error),
    }
}

/// Returns the finished load, or `None` while the worker is still busy.
fn poll_load(rx: &Receiver<LoadResult>) -> Option<LoadResult> {
    match rx.try_recv() {
        Ok(result) => Some(result),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => Some(Err("Background load worker disconnected".to_owned())),
    }
}

impl eframe::App for PeerMapApp {
    fn update(&mut self, ctx: &Context, frame: &mut eframe::Frame) {
        let mut transition = None;
        let scene_config = self.scene_config();

        match &mut self.state {
            AppState::Loading { rx } => {
                match poll_load(rx) {
                    Some(result) => transition = Some(ready_state(result, scene_config, ctx, frame)),
                    None => ctx.request_repaint(),
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading network snapshot...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to start the network view");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.config));
                    }
                });
            }
            AppState::Ready(model) => {
                // Swap sessions before the old one queues a paint callback for this frame.
                match self.reload_rx.as_ref().and_then(poll_load) {
                    Some(result) => {
                        transition = Some(ready_state(result, scene_config, ctx, frame));
                        ctx.request_repaint();
                    }
                    None => {
                        let mut reload_requested = false;
                        model.show(ctx, &mut reload_requested, self.reload_rx.is_some());
                        if reload_requested && self.reload_rx.is_none() {
                            self.reload_rx = Some(Self::spawn_load(&self.config));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            let previous = std::mem::replace(&mut self.state, next_state);
            if let AppState::Ready(mut model) = previous {
                model.teardown(frame.gl().map(Arc::as_ref));
            }
        }
    }

    fn on_exit(&mut self, gl: Option<&glow::Context>) {
        if let AppState::Ready(model) = &mut self.state {
            model.teardown(gl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_load_polls_as_none() {
        let (_tx, rx) = mpsc::channel::<LoadResult>();
        assert!(poll_load(&rx).is_none());
    }

    #[test]
    fn finished_load_is_returned_once() {
        let (tx, rx) = mpsc::channel::<LoadResult>();
        tx.send(Err("bad snapshot".to_owned())).expect("receiver alive");
        assert!(matches!(poll_load(&rx), Some(Err(error)) if error == "bad snapshot"));
        assert!(poll_load(&rx).is_none());
    }

    #[test]
    fn dropped_worker_surfaces_as_an_error() {
        let (tx, rx) = mpsc::channel::<LoadResult>();
        drop(tx);
        assert!(matches!(poll_load(&rx), Some(Err(error)) if error.contains("disconnected")));
    }
}
