use super::*;
use crate::document::graph::Catalog;
use crate::document::model::{Document, NodeGraph, SourceNode, SourceOutput};
use crate::loader::context::SearchPath;
use crate::mapping::lookup;
use crate::native::recording::{RecordedInput, RecordingMaterialSystem};

fn input(name: &str, ty: &str) -> ValueElement {
    ValueElement {
        name: name.to_owned(),
        ty: ty.to_owned(),
        ..ValueElement::default()
    }
}

fn literal<'v>(value: &'v str, ty: &'v str) -> Binding<'v> {
    Binding::Literal { value, ty }
}

fn with_env<R>(f: impl FnOnce(&mut Env<'_, '_>) -> R) -> (R, RecordingMaterialSystem) {
    let doc = Document::default();
    let mut sys = RecordingMaterialSystem::new();
    let out = {
        let mut env = Env::new(&mut sys, Catalog::new(&doc, None), SearchPath::new(), false);
        f(&mut env)
    };
    (out, sys)
}

#[test]
fn mapped_leaf_binds_literals_and_connections_by_key() {
    let entry = lookup("multiply").unwrap();
    let ((leaf, up), sys) = with_env(|env| {
        let mut leaf = Leaf::create(env, entry.ty, LeafRole::Mapped(entry), Some("mul"), |_, _| {
            Ok(())
        })
        .unwrap();
        let up = Leaf::create(env, NativeNodeType::ConstantTexture, LeafRole::Plain, None, |_, _| {
            Ok(())
        })
        .unwrap();
        let up_handle = up.handle.unwrap();

        leaf.set_input(env, &input("in1", "color3"), literal("0.1, 0.2, 0.3", "color3"))
            .unwrap();
        leaf.set_input(env, &input("in2", "color3"), Binding::Node(up_handle))
            .unwrap();
        let err = leaf
            .set_input(env, &input("bogus", "float"), literal("1", "float"))
            .unwrap_err();
        assert!(err.is_unsupported(), "{err}");
        (leaf, up_handle)
    });

    let node = sys.node(leaf.handle.unwrap()).unwrap();
    assert_eq!(node.name.as_deref(), Some("mul"));
    assert_eq!(
        node.inputs.get(&InputKey::Color0),
        Some(&RecordedInput::Floats([0.1, 0.2, 0.3, 0.0]))
    );
    assert_eq!(node.inputs.get(&InputKey::Color1), Some(&RecordedInput::Node(up)));
}

#[test]
fn surface_forwards_bsdf_without_owning_it() {
    let ((leaf, bsdf), _sys) = with_env(|env| {
        let bsdf = Leaf::create(env, NativeNodeType::MatxDiffuseBrdf, LeafRole::Plain, None, |_, _| {
            Ok(())
        })
        .unwrap();
        let bsdf = bsdf.handle.unwrap();
        let mut surface = Leaf::forwarding(LeafRole::Surface);
        surface
            .set_input(env, &input("bsdf", "BSDF"), Binding::Node(bsdf))
            .unwrap();
        assert!(surface
            .set_input(env, &input("opacity", "float"), literal("1", "float"))
            .unwrap_err()
            .is_unsupported());
        (surface, bsdf)
    });
    assert_eq!(leaf.handle, Some(bsdf));
    assert!(!leaf.owning);
}

#[test]
fn displacement_literal_replaces_its_previous_constant() {
    let ((first, second), sys) = with_env(|env| {
        let mut disp = Leaf::forwarding(LeafRole::Displacement {
            source: "height".to_owned(),
        });
        let port = input("displacement", "float");
        disp.set_input(env, &port, literal("0.5", "float")).unwrap();
        let first = disp.handle.unwrap();
        assert!(disp.owning);
        disp.set_input(env, &port, literal("0.25", "float")).unwrap();
        let second = disp.handle.unwrap();
        (first, second)
    });
    assert_ne!(first, second);
    assert_eq!(sys.deletions_of(first), 1);
    let node = sys.node(second).unwrap();
    assert_eq!(node.ty, NativeNodeType::ConstantTexture);
    assert_eq!(node.name.as_deref(), Some("height"));
    assert_eq!(
        node.inputs.get(&InputKey::Value),
        Some(&RecordedInput::Floats([0.25, 0.25, 0.25, 0.0]))
    );
    assert_eq!(sys.nodes_named("height").count(), 1);
}

#[test]
fn image_leaf_captures_deferred_parameters() {
    let (params, sys) = with_env(|env| {
        let mut image = Leaf::create(env, IMAGE.ty, LeafRole::Image(Box::default()), None, |_, _| {
            Ok(())
        })
        .unwrap();
        let uv = Leaf::create(env, NativeNodeType::InputLookup, LeafRole::Plain, None, |_, _| {
            Ok(())
        })
        .unwrap();

        image
            .set_input(env, &input("layer", "string"), literal("diffuse", "string"))
            .unwrap();
        image
            .set_input(env, &input("uaddressmode", "string"), literal("periodic", "string"))
            .unwrap();
        image
            .set_input(env, &input("vaddressmode", "string"), literal("clamp", "string"))
            .unwrap();
        image
            .set_input(env, &input("filtertype", "string"), literal("linear", "string"))
            .unwrap();
        image
            .set_input(env, &input("frameoffset", "integer"), literal("3", "integer"))
            .unwrap();
        image
            .set_input(env, &input("default", "color3"), literal("1, 0, 0", "color3"))
            .unwrap();
        image
            .set_input(env, &input("file", "filename"), literal("missing.png", "filename"))
            .unwrap();
        image
            .set_input(env, &input("texcoord", "vector2"), Binding::Node(uv.handle.unwrap()))
            .unwrap();
        assert!(image
            .set_input(env, &input("colorspace", "string"), literal("srgb", "string"))
            .unwrap_err()
            .is_unsupported());

        let handle = image.handle;
        (image.image_params_mut().cloned().unwrap(), handle, uv.handle)
    });

    let (params, image, uv) = params;
    assert_eq!(params.layer, "diffuse");
    assert_eq!(params.uaddressmode, "periodic");
    assert_eq!(params.vaddressmode, "clamp");
    assert_eq!(params.default, Some(Value::Vec3([1.0, 0.0, 0.0])));
    assert_eq!(params.file, "");
    assert_eq!(
        sys.node(image.unwrap()).unwrap().inputs.get(&InputKey::Uv),
        Some(&RecordedInput::Node(uv.unwrap()))
    );
}

#[test]
fn failed_setup_deletes_the_fresh_node() {
    let (result, sys) = with_env(|env| Leaf::wrap(env, NodeHandle(999)));
    assert!(matches!(result, Err(LoaderError::Native(_))));
    assert_eq!(sys.created_count(), 1);
    assert_eq!(sys.live_count(), 0);
    assert_eq!(sys.deletions_of(NodeHandle(0)), 1);
}

fn graph_with_outputs() -> NodeGraph {
    NodeGraph {
        name: "g".to_owned(),
        nodes: vec![SourceNode {
            name: "a".to_owned(),
            category: "multiply".to_owned(),
            ty: "color3".to_owned(),
            ..SourceNode::default()
        }],
        outputs: vec![SourceOutput {
            name: "out".to_owned(),
            ty: "color3".to_owned(),
            node_name: Some("a".to_owned()),
            ..SourceOutput::default()
        }],
        ..NodeGraph::default()
    }
}

#[test]
fn composite_fans_interface_bindings_out_to_every_socket() {
    let graph = graph_with_outputs();
    let ports = [input("in1", "color3"), input("in2", "color3"), input("in1", "color3")];
    let entry = lookup("multiply").unwrap();

    let (handles, sys) = with_env(|env| {
        let mut arena = NodeArena::default();
        let mut comp = CompositeNode::new(GraphRef::NodeGraph(&graph));
        let mut handles = Vec::new();
        for (i, port) in ports.iter().enumerate() {
            let leaf = Leaf::create(env, entry.ty, LeafRole::Mapped(entry), None, |_, _| Ok(()))
                .unwrap();
            handles.push((leaf.handle.unwrap(), port.name.clone()));
            let child = format!("c{i}");
            comp.children.insert(child.clone(), arena.push(Node::Leaf(leaf)));
            comp.sockets.entry("tint".to_owned()).or_default().push(Socket {
                child,
                input: port,
            });
        }
        let comp = arena.push(Node::Composite(comp));

        let mut tint = input("tint", "color3");
        arena
            .set_input(env, comp, &tint, literal("0.5, 0.5, 0.5", "color3"))
            .unwrap();

        tint.name = "other".to_owned();
        let err = arena
            .set_input(env, comp, &tint, literal("1, 1, 1", "color3"))
            .unwrap_err();
        assert!(err.is_unsupported());

        tint.interface_name = Some("tint".to_owned());
        arena
            .set_input(env, comp, &tint, literal("0.25, 0.25, 0.25", "color3"))
            .unwrap();
        handles
    });

    for (handle, port) in handles {
        let key = if port == "in1" { InputKey::Color0 } else { InputKey::Color1 };
        assert_eq!(
            sys.node(handle).unwrap().inputs.get(&key),
            Some(&RecordedInput::Floats([0.25, 0.25, 0.25, 0.0]))
        );
    }
}

#[test]
fn output_handle_follows_composite_outputs() {
    let graph = graph_with_outputs();
    let ((handle, resolved, missing), _sys) = with_env(|env| {
        let mut arena = NodeArena::default();
        let leaf = Leaf::create(env, NativeNodeType::Arithmetic, LeafRole::Plain, None, |_, _| {
            Ok(())
        })
        .unwrap();
        let handle = leaf.handle.unwrap();
        let mut comp = CompositeNode::new(GraphRef::NodeGraph(&graph));
        comp.children.insert("a".to_owned(), arena.push(Node::Leaf(leaf)));
        let comp = arena.push(Node::Composite(comp));
        (
            handle,
            arena.output_handle(comp, None).unwrap(),
            arena.output_handle(comp, Some("nope")).is_err(),
        )
    });
    assert_eq!(handle, resolved);
    assert!(missing);
}

#[test]
fn depends_on_is_transitive() {
    let graph = graph_with_outputs();
    let mut comp = CompositeNode::new(GraphRef::NodeGraph(&graph));
    comp.record_edge("a", "b");
    comp.record_edge("b", "c");
    assert!(comp.depends_on("c", "a"));
    assert!(comp.depends_on("b", "a"));
    assert!(!comp.depends_on("a", "c"));
    assert!(comp.depends_on("a", "a"));
}

#[test]
fn release_owned_deletes_each_owned_handle_once() {
    let ((owned, count), sys) = with_env(|env| {
        let mut arena = NodeArena::default();
        let owned = Leaf::create(env, NativeNodeType::Arithmetic, LeafRole::Plain, None, |_, _| {
            Ok(())
        })
        .unwrap();
        let handle = owned.handle.unwrap();
        let mut surface = Leaf::forwarding(LeafRole::Surface);
        surface
            .set_input(env, &input("bsdf", "BSDF"), Binding::Node(handle))
            .unwrap();
        arena.push(Node::Leaf(owned));
        arena.push(Node::Leaf(surface));
        arena.release_owned(&mut *env.sys);
        arena.release_owned(&mut *env.sys);
        (handle, arena.len())
    });
    assert_eq!(count, 2);
    assert_eq!(sys.deletions_of(owned), 1);
    assert_eq!(sys.live_count(), 0);
}
