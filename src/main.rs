mod app;
mod snapshot;
mod util;

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Network snapshot JSON produced by the crawler.
    snapshot: PathBuf,
    /// Equirectangular world map image drawn under the peers.
    #[arg(long)]
    map: Option<PathBuf>,
    /// Below this many peers, co-located peers are not clustered.
    #[arg(long, default_value_t = 150)]
    small_graph_threshold: usize,
    #[arg(long, default_value_t = 1440.0)]
    width: f32,
    #[arg(long, default_value_t = 920.0)]
    height: f32,
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([args.width, args.height]),
        depth_buffer: 24,
        renderer: eframe::Renderer::Glow,
        ..Default::default()
    };
    let config = app::AppConfig {
        snapshot_path: args.snapshot,
        map_path: args.map,
        small_graph_threshold: args.small_graph_threshold,
    };

    eframe::run_native(
        "peermap",
        options,
        Box::new(move |cc| Ok(Box::new(app::PeerMapApp::new(cc, config)))),
    )
}
