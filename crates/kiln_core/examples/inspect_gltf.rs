//! Example: Load and inspect a glTF or GLB file.
//!
//! Run with: cargo run --example inspect_gltf -- assets/robot.glb

use std::env;
use std::sync::Arc;

use kiln_core::{AssetManager, FileResolver, LoaderConfig, NodeId, SceneGraph};

fn depth(scene: &SceneGraph, mut id: NodeId) -> usize {
    let mut depth = 0;
    while let Some(parent) = scene.node(id).parent {
        depth += 1;
        id = parent;
    }
    depth
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: inspect_gltf <path-to-gltf-or-glb> [config.json]");
        println!("\nExamples:");
        println!("  cargo run --example inspect_gltf -- assets/robot.glb");
        println!("  cargo run --example inspect_gltf -- assets/robot.gltf loader.json");
        return Ok(());
    }

    let config = match args.get(2) {
        Some(config_path) => LoaderConfig::from_json_str(&std::fs::read_to_string(config_path)?)?,
        None => LoaderConfig::default(),
    };

    let path = &args[1];
    println!("Loading glTF file: {}", path);

    let assets = Arc::new(
        AssetManager::new(config, Arc::new(FileResolver::new())).with_dispose_hook(|bundle| {
            println!("\nDisposed {} ({} texture bytes)", bundle.path, bundle.texture_bytes());
        }),
    );
    let instance = assets.instantiate(path)?;
    let scene = &instance.scene;

    println!("\n=== Scene: {} ===", scene.name());
    println!("Nodes: {}", scene.len());
    println!("Total triangles: {}", scene.total_triangle_count());

    println!("\n--- Hierarchy ---");
    for id in scene.iter() {
        let node = scene.node(id);
        let mut tags = Vec::new();
        if let Some(attachment) = &node.mesh {
            tags.push(format!(
                "mesh {} ({} submeshes)",
                attachment.mesh.name,
                attachment.mesh.submesh_count()
            ));
            if let Some(skin) = &attachment.skin {
                tags.push(format!("{} bones", skin.bones.len()));
            }
        }
        if let Some(collider) = &node.collider {
            tags.push(format!("{} collider", collider.kind()));
        }
        let pos = node.transform.translation;
        println!(
            "  {}{} at ({:.2}, {:.2}, {:.2}) {}",
            "  ".repeat(depth(scene, id)),
            node.name,
            pos.x,
            pos.y,
            pos.z,
            tags.join(", ")
        );
    }

    let bundle = assets.acquire(path)?;

    println!("\n--- Meshes ---");
    for mesh in &bundle.meshes {
        println!(
            "  {} - {} vertices, {} triangles, skinned: {}",
            mesh.name,
            mesh.vertex_count(),
            mesh.triangle_count(),
            mesh.is_skinned()
        );
        println!(
            "       Bounds: ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
            mesh.bounds.min.x, mesh.bounds.min.y, mesh.bounds.min.z, mesh.bounds.max.x, mesh.bounds.max.y, mesh.bounds.max.z
        );
    }

    println!("\n--- Materials ---");
    for material in &bundle.materials {
        println!(
            "  {} - {:?}, {} textures",
            material.name,
            material.alpha_mode,
            material.textures().count()
        );
    }

    println!("\n--- Animations ---");
    for clip in &bundle.animations {
        println!("  {} - {:.2}s, {} curves", clip.name, clip.duration(), clip.curves.len());
    }

    let world_bounds = scene.world_bounds();
    println!("\n--- World Bounds ---");
    println!(
        "  Min: ({:.2}, {:.2}, {:.2})",
        world_bounds.min.x, world_bounds.min.y, world_bounds.min.z
    );
    println!(
        "  Max: ({:.2}, {:.2}, {:.2})",
        world_bounds.max.x, world_bounds.max.y, world_bounds.max.z
    );

    assets.release(path);
    drop(instance);
    Ok(())
}
