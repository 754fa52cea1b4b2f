/// Example: Print the entities and brush planes of a Quake MAP file
///
/// Usage: cargo run --example dump_map -- path/to/file.map

use std::env;

use anyhow::{bail, Context};
use sw3d_core::map;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        bail!("Usage: {} <map-file>", args[0]);
    };

    let quake_map = map::load_map(path).with_context(|| format!("Failed to load {}", path))?;
    println!(
        "{}: {} entities, {} brushes",
        path,
        quake_map.entities.len(),
        quake_map.brush_count()
    );

    for (i, entity) in quake_map.entities.iter().enumerate() {
        println!("entity {} ({})", i, entity.classname().unwrap_or("?"));
        for (key, value) in &entity.properties {
            println!("  \"{}\" \"{}\"", key, value);
        }
        for (j, brush) in entity.brushes.iter().enumerate() {
            println!("  brush {}", j);
            for plane in &brush.planes {
                let n = plane.normal;
                println!(
                    "    n = ({:+.3} {:+.3} {:+.3})  d = {:.2}",
                    n.x, n.y, n.z, plane.distance
                );
            }
        }
    }

    Ok(())
}
