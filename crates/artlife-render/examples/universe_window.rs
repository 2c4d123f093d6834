//! Watch the reference universe wander in a window.
//!
//! Run with:
//!   cargo run --example universe_window --features renderer -p artlife-render
//!
//! An optional first argument names a JSON universe config, e.g.
//! `{"width": 300, "height": 200, "seed": 9, "population": [["Plant", 40]]}`.
//! Points are stroked in the color of the most populous species.
//! Set `RUST_LOG=artlife_render=debug` for per-frame diagnostics.

use artlife_render::config::RenderConfig;
use artlife_render::window::run_windowed;
use artlife_universe::config::UniverseConfig;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let universe_config = match std::env::args().nth(1) {
        Some(path) => UniverseConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => UniverseConfig::default(),
    };
    tracing::info!(
        width = universe_config.width,
        height = universe_config.height,
        lives = universe_config.total_population(),
        "starting universe"
    );

    let mut render_config = RenderConfig::default();
    if let Some(species) = universe_config.dominant_species() {
        render_config = render_config.with_species_color(species)?;
    }

    let universe = universe_config.build()?;
    run_windowed(universe, render_config, "Artlife Universe")
}
