use super::*;
use crate::native::recording::{RecordedInput, RecordingMaterialSystem};
use crate::native::types::{InputKey, NativeNodeType};

fn loader() -> Loader {
    let mut loader = Loader::new();
    let lib = Document::from_json(include_str!("../../data/stdlib.json")).unwrap();
    loader.setup_stdlib(lib, SearchPath::new());
    loader
}

fn scalar_graph() -> Document {
    Document::from_json(
        r#"{ "name": "scalar", "version": "1.38",
             "nodegraphs": [ { "name": "g",
               "nodes": [ { "name": "k", "category": "constant", "type": "float",
                            "inputs": [ { "name": "value", "type": "float", "value": "0.5" } ] } ],
               "outputs": [ { "name": "out", "type": "float", "nodename": "k" } ] } ] }"#,
    )
    .unwrap()
}

#[test]
fn scalar_output_is_wrapped_into_the_surface_root() {
    let mut sys = RecordingMaterialSystem::new();
    let result = loader().load(&scalar_graph(), &LoaderOpts::default(), &mut sys);

    assert_eq!(result.nodes.len(), 2);
    assert!(result.root(OutputKind::Displacement).is_none());
    let root = sys.node(result.root(OutputKind::Surface).unwrap()).unwrap();
    assert_eq!(root.ty, NativeNodeType::Passthrough);

    let (k, k_node) = sys.nodes_named("k").next().unwrap();
    assert_eq!(
        k_node.inputs.get(&InputKey::Value),
        Some(&RecordedInput::Floats([0.5, 0.5, 0.5, 0.0]))
    );
    assert_eq!(root.inputs.get(&InputKey::Color), Some(&RecordedInput::Node(k)));
    assert!(result.image_nodes.is_empty());

    result.release(&mut sys).unwrap();
    assert_eq!(sys.live_count(), 0);
    assert_eq!(sys.deletions_of(k), 1);
}

#[test]
fn forwarded_surface_roots_at_its_bsdf_and_keeps_cached_geometry() {
    let doc = Document::from_json(
        r#"{ "name": "shader", "version": "1.38",
             "nodes": [
               { "name": "d", "category": "diffuse_brdf", "type": "BSDF" },
               { "name": "s", "category": "surface", "type": "surfaceshader",
                 "inputs": [ { "name": "bsdf", "type": "BSDF", "nodename": "d" } ] }
             ] }"#,
    )
    .unwrap();
    let mut sys = RecordingMaterialSystem::new();
    let result = loader().load(&doc, &LoaderOpts::default(), &mut sys);

    let (d, d_node) = sys.nodes_named("d").next().unwrap();
    let (n, _) = sys.nodes_named("Nworld").next().unwrap();
    assert_eq!(result.root(OutputKind::Surface), Some(d));
    assert_eq!(d_node.inputs.get(&InputKey::Normal), Some(&RecordedInput::Node(n)));
    assert_eq!(result.nodes.len(), 2);
    assert!(result.nodes.contains(&n));
    assert_eq!(sys.live_count(), result.nodes.len());
}

#[test]
fn nothing_renderable_creates_nothing() {
    let doc = Document::from_json(
        r#"{ "name": "strings", "version": "1.38",
             "outputs": [ { "name": "label", "type": "string" } ] }"#,
    )
    .unwrap();
    let mut sys = RecordingMaterialSystem::new();
    let result = loader().load(&doc, &LoaderOpts::default(), &mut sys);
    assert!(result.is_empty());
    assert_eq!(sys.created_count(), 0);
}

#[test]
fn failed_root_wrap_releases_everything_built() {
    let mut sys = RecordingMaterialSystem::new();
    sys.fail_create_of(NativeNodeType::Passthrough);
    let result = loader().load(&scalar_graph(), &LoaderOpts::default(), &mut sys);

    assert!(result.is_empty());
    assert_eq!(sys.created_count(), 1);
    assert_eq!(sys.live_count(), 0);
    assert_eq!(sys.deletions_of(NodeHandle(0)), 1);
}

#[test]
fn disabled_kinds_resolve_nothing() {
    let mut sys = RecordingMaterialSystem::new();
    let opts = LoaderOpts {
        targets: Some([String::new(), String::new()]),
        ..LoaderOpts::default()
    };
    let result = loader().load(&scalar_graph(), &opts, &mut sys);
    assert!(result.is_empty());
    assert_eq!(sys.created_count(), 0);
}

#[test]
fn release_reports_the_first_failure_after_trying_all() {
    let mut sys = RecordingMaterialSystem::new();
    let result = loader().load(&scalar_graph(), &LoaderOpts::default(), &mut sys);
    let mut doubled = result.clone();
    doubled.nodes.insert(0, NodeHandle(77));

    assert_eq!(doubled.release(&mut sys), Err(NativeError::InvalidParameter));
    assert_eq!(sys.live_count(), 0);
    for handle in result.nodes {
        assert_eq!(sys.deletions_of(handle), 1);
    }
}

#[test]
fn opts_deserialize_with_defaults() {
    let opts: LoaderOpts = serde_json::from_str(r#"{ "targets": ["g/out", ""] }"#).unwrap();
    assert!(opts.search_path.is_empty());
    assert_eq!(opts.targets, Some(["g/out".to_owned(), String::new()]));

    let opts: LoaderOpts = serde_json::from_str(r#"{ "search_path": ["/a", "b"] }"#).unwrap();
    assert_eq!(opts.search_path.dirs().len(), 2);
    assert_eq!(opts.targets, None);
}

#[test]
fn setup_stdlib_appends_its_search_path() {
    let mut loader = Loader::new();
    let before = loader.std_search_path().dirs().len();
    let mut extra = SearchPath::new();
    extra.push("/lib/materialx");
    loader.setup_stdlib(Document::default(), extra);
    assert!(loader.stdlib().is_some());
    assert_eq!(loader.std_search_path().dirs().len(), before + 1);
    assert_eq!(
        loader.std_search_path().dirs().last().map(|p| p.as_path()),
        Some(std::path::Path::new("/lib/materialx"))
    );
}
