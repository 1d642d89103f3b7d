//! Entry point: load an OBJ model and show it in an orbitable window.

mod config;

use anyhow::{Context, Result, bail};

use crate::config::AppConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = AppConfig::from_args(std::env::args().skip(1));
    log::info!(
        "Starting ObjView. Mesh: {}, backend: {:?}, show_fps={}, window_size={}x{}",
        cfg.mesh.display(),
        cfg.backends,
        cfg.show_fps,
        cfg.width,
        cfg.height
    );

    let model = asset::load_model(&cfg.mesh)
        .with_context(|| format!("Failed to load mesh {}", cfg.mesh.display()))?;
    if !model.mesh.is_valid() {
        bail!("{} contains no triangles", cfg.mesh.display());
    }

    let title = cfg
        .mesh
        .file_name()
        .map(|name| format!("ObjView - {}", name.to_string_lossy()))
        .unwrap_or_else(|| "ObjView".to_owned());

    platform::run_with_renderer(
        platform::RunConfig {
            title,
            backends: cfg.backends,
            show_fps: cfg.show_fps,
            width: cfg.width,
            height: cfg.height,
            sensitivity: cfg.sensitivity,
        },
        model,
    )?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
