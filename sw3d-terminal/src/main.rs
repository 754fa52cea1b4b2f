/// SW3D Terminal Renderer
///
/// Usage:
///   cargo run -p sw3d-terminal -- [--config settings.json] [--model file.obj]
///                                 [--mode wire|flat|gouraud] [--log-file sw3d.log]
///
/// Controls:
///   - W/A/S/D: Move, R/F: Up/Down
///   - Arrow Keys or left-drag: Look around
///   - 1/2/3: Wireframe / Flat / Gouraud, M: next mode
///   - B/V/Z/C/N/O: Back-face culling, viewport culling, sorting,
///     depth shading, normals overlay, winding
///   - [ / ]: Field of view
///   - , / .: Near plane, < / >: Far plane
///   - Tab / Shift-Tab: Next / previous model from the model directories
///   - X: Exchange y and z axes, reloading the current model
///   - Space: Pause model spin
///   - Q/ESC: Quit
use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context};
use sw3d_core::{obj, Mesh, RenderMode, Settings};
use sw3d_terminal::TerminalApp;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    model: Option<PathBuf>,
    mode: Option<RenderMode>,
    log_file: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();
    let argv: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < argv.len() {
        let value = argv.get(i + 1);
        match (argv[i].as_str(), value) {
            ("--config", Some(v)) => args.config = Some(PathBuf::from(v)),
            ("--model", Some(v)) => args.model = Some(PathBuf::from(v)),
            ("--mode", Some(v)) => {
                args.mode = Some(v.parse().map_err(anyhow::Error::msg)?);
            }
            ("--log-file", Some(v)) => args.log_file = Some(PathBuf::from(v)),
            (other, _) => bail!("unknown or incomplete argument '{other}'"),
        }
        i += 2;
    }
    Ok(args)
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;
    init_logging(args.log_file.as_ref())?;

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(mode) = args.mode {
        settings.render.mode = mode;
    }

    let mesh = match &args.model {
        Some(path) => obj::load_obj(path, settings.exchange_axes)
            .with_context(|| format!("load model {}", path.display()))?,
        None => Mesh::cube(2.0),
    };
    info!(
        name = %mesh.name,
        faces = mesh.face_count(),
        mode = %settings.render.mode,
        available_models = settings.list_models().len(),
        "Starting terminal renderer"
    );

    let mut app = TerminalApp::new(mesh, settings).context("query terminal size")?;
    if let Some(path) = args.model {
        app.set_model_path(path);
    }
    app.run().context("terminal renderer")?;
    Ok(())
}
