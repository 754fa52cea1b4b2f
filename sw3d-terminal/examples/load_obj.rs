/// Example: Load and render an OBJ file in the terminal
///
/// Usage: cargo run --example load_obj -- path/to/file.obj

use std::env;

use anyhow::Context;
use sw3d_core::{obj, Mesh, Settings};
use sw3d_terminal::TerminalApp;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let settings = Settings::default();

    let mesh = match args.get(1) {
        Some(path) => {
            println!("Loading OBJ file: {}", path);
            obj::load_obj(path, settings.exchange_axes)
                .with_context(|| format!("Failed to load {}", path))?
        }
        None => {
            eprintln!("Usage: {} <obj-file>", args[0]);
            eprintln!("\nNo OBJ file provided, using default cube...");
            Mesh::cube(2.0)
        }
    };

    println!(
        "Loaded {} vertices, {} faces",
        mesh.vertex_count(),
        mesh.face_count()
    );
    println!("Starting terminal renderer (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    let mut app = TerminalApp::new(mesh, settings)?;
    app.run()?;

    Ok(())
}
