//! Full document loads through the public API.

use base64::Engine;
use kiln_core::{GltfLoader, LoadError, LoaderConfig, MemoryResolver};
use kiln_math::Vec3;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One triangle, its u16 indices, and a two-key translation track.
fn triangle_buffer() -> Vec<u8> {
    let mut bytes = Vec::new();
    for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    for i in [0u16, 1, 2, 0] {
        bytes.extend_from_slice(&i.to_le_bytes());
    }
    for v in [0.0f32, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn triangle_json(buffer_uri: Option<&str>) -> String {
    let uri = buffer_uri
        .map(|uri| format!(r#""uri": "{}", "#, uri))
        .unwrap_or_default();
    format!(
        r#"{{
        "asset": {{ "version": "2.0" }},
        "scene": 0,
        "scenes": [ {{ "nodes": [0] }} ],
        "nodes": [
            {{ "name": "Body", "mesh": 0, "children": [1] }},
            {{ "name": "Arm", "translation": [1.0, 0.0, 0.0] }}
        ],
        "meshes": [ {{ "name": "Tri", "primitives": [ {{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }} ] }} ],
        "buffers": [ {{ {}"byteLength": 76 }} ],
        "bufferViews": [
            {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
            {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }},
            {{ "buffer": 0, "byteOffset": 44, "byteLength": 8 }},
            {{ "buffer": 0, "byteOffset": 52, "byteLength": 24 }}
        ],
        "accessors": [
            {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" }},
            {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }},
            {{ "bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR" }},
            {{ "bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3" }}
        ],
        "animations": [ {{
            "name": "Wave",
            "channels": [ {{ "sampler": 0, "target": {{ "node": 1, "path": "translation" }} }} ],
            "samplers": [ {{ "input": 2, "output": 3 }} ]
        }} ]
    }}"#,
        uri
    )
}

fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F534Au32.to_le_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x004E4942u32.to_le_bytes());
    out.extend_from_slice(&bin);
    out
}

#[test]
fn test_embedded_triangle() {
    init_logging();
    let data_uri = format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(triangle_buffer())
    );
    let resolver = MemoryResolver::new().with_file("tri.gltf", triangle_json(Some(&data_uri)).into_bytes());
    let config = LoaderConfig::default();

    let loaded = GltfLoader::new(&resolver, &config).load("tri.gltf").unwrap();
    let scene = &loaded.scene;

    assert_eq!(scene.name(), "tri");
    assert_eq!(scene.len(), 3);

    let body = scene.find_by_path("Body").unwrap();
    let mesh = &scene.node(body).mesh.as_ref().unwrap().mesh;
    assert_eq!(mesh.name, "Tri");
    assert_eq!(
        mesh.positions,
        vec![Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)]
    );
    assert_eq!(mesh.indices, vec![2, 1, 0]);
    assert_eq!(mesh.submesh_count(), 1);
    assert_eq!(mesh.triangle_count(), 1);

    let normals = mesh.normals.as_ref().unwrap();
    for n in normals {
        assert!((n.length() - 1.0).abs() < 1e-5);
        assert!(n.z.abs() > 0.99);
    }

    let arm = scene.find_by_path("Body/Arm").unwrap();
    assert_eq!(scene.node(arm).transform.translation, Vec3::new(-1.0, 0.0, 0.0));

    assert_eq!(loaded.assets.meshes.len(), 1);
    assert_eq!(loaded.assets.animations.len(), 1);
}

#[test]
fn test_animation_curves_follow_hierarchy() {
    init_logging();
    let data_uri = format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(triangle_buffer())
    );
    let resolver = MemoryResolver::new().with_file("tri.gltf", triangle_json(Some(&data_uri)).into_bytes());
    let config = LoaderConfig::default();
    let loaded = GltfLoader::new(&resolver, &config).load("tri.gltf").unwrap();

    let clip = loaded.scene.clip("Wave").unwrap();
    assert_eq!(clip.curves.len(), 3);
    assert!((clip.duration() - 1.0).abs() < 1e-6);

    let x = clip.curve("Body/Arm", "localPosition.x").unwrap();
    let values: Vec<f32> = x.keys.iter().map(|k| k.value).collect();
    assert_eq!(values, vec![0.0, -2.0]);
    assert!((x.evaluate(0.5) + 1.0).abs() < 1e-6);
}

#[test]
fn test_external_buffer_resolves_next_to_document() {
    init_logging();
    let resolver = MemoryResolver::new()
        .with_file("models/tri.gltf", triangle_json(Some("tri.bin")).into_bytes())
        .with_file("models/tri.bin", triangle_buffer());
    let config = LoaderConfig::default();

    let loaded = GltfLoader::new(&resolver, &config).load("models/tri.gltf").unwrap();
    assert_eq!(loaded.scene.total_triangle_count(), 1);
}

#[test]
fn test_missing_external_buffer() {
    init_logging();
    let resolver = MemoryResolver::new().with_file("tri.gltf", triangle_json(Some("gone.bin")).into_bytes());
    let config = LoaderConfig::default();

    let err = GltfLoader::new(&resolver, &config).load("tri.gltf").unwrap_err();
    assert!(matches!(err, LoadError::BufferUnavailable { index: 0, .. }));
}

#[test]
fn test_glb_matches_gltf() {
    init_logging();
    let resolver = MemoryResolver::new().with_file("tri.glb", glb(&triangle_json(None), &triangle_buffer()));
    let config = LoaderConfig::default();

    let loaded = GltfLoader::new(&resolver, &config).load("tri.glb").unwrap();
    let body = loaded.scene.find_by_path("Body").unwrap();
    let mesh = &loaded.scene.node(body).mesh.as_ref().unwrap().mesh;
    assert_eq!(mesh.indices, vec![2, 1, 0]);
    assert_eq!(mesh.positions[1], Vec3::new(-1.0, 0.0, 0.0));
}

#[test]
fn test_no_default_scene() {
    init_logging();
    let json = r#"{ "asset": { "version": "2.0" }, "scenes": [ { "nodes": [] } ] }"#;
    let resolver = MemoryResolver::new().with_file("empty.gltf", json.as_bytes().to_vec());
    let config = LoaderConfig::default();

    let err = GltfLoader::new(&resolver, &config).load("empty.gltf").unwrap_err();
    assert!(matches!(err, LoadError::NoDefaultScene { .. }));
}

#[test]
fn test_node_cycle_is_rejected() {
    init_logging();
    let json = r#"{
        "scene": 0,
        "scenes": [ { "nodes": [0] } ],
        "nodes": [ { "children": [1] }, { "children": [0] } ]
    }"#;
    let resolver = MemoryResolver::new().with_file("cycle.gltf", json.as_bytes().to_vec());
    let config = LoaderConfig::default();

    let err = GltfLoader::new(&resolver, &config).load("cycle.gltf").unwrap_err();
    assert!(matches!(err, LoadError::InvalidDocument(_)));
}

#[test]
fn test_missing_document() {
    init_logging();
    let resolver = MemoryResolver::new();
    let config = LoaderConfig::default();

    let err = GltfLoader::new(&resolver, &config).load("nowhere.gltf").unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}
