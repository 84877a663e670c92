use super::*;
use crate::document::model::Document;
use crate::native::recording::{RecordedInput, RecordingMaterialSystem};

fn temp_dir(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "mtlx_translate_ctx_{name}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn geom(name: &str, prop: &str, ty: &str, index: Option<&str>, space: Option<&str>) -> GeomPropDef {
    GeomPropDef {
        name: name.to_owned(),
        geom_prop: prop.to_owned(),
        ty: ty.to_owned(),
        index: index.map(str::to_owned),
        space: space.map(str::to_owned),
    }
}

#[test]
fn search_path_returns_first_directory_with_the_file() {
    let a = temp_dir("a");
    let b = temp_dir("b");
    std::fs::write(b.join("tex.png"), b"x").unwrap();
    std::fs::create_dir_all(a.join("sub")).unwrap();
    std::fs::write(a.join("sub/tex.png"), b"x").unwrap();

    let sp: SearchPath = [a.clone(), b.clone()].into_iter().collect();
    assert_eq!(sp.find("tex.png"), Some(b.join("tex.png")));
    assert_eq!(sp.find("sub/tex.png"), Some(a.join("sub/tex.png")));
    assert_eq!(sp.find("missing.png"), None);
    assert_eq!(sp.find(""), None);

    let absolute = b.join("tex.png");
    assert_eq!(SearchPath::new().find(&absolute), Some(absolute));

    let _ = std::fs::remove_dir_all(a);
    let _ = std::fs::remove_dir_all(b);
}

#[test]
fn search_path_appends_in_order() {
    let mut sp = SearchPath::new();
    assert!(sp.is_empty());
    sp.push("/first");
    let mut other = SearchPath::new();
    other.push("/second");
    sp.append(&other);
    assert_eq!(
        sp.dirs(),
        &[PathBuf::from("/first"), PathBuf::from("/second")]
    );
}

#[test]
fn scopes_indent_and_restore() {
    let doc = Document::default();
    let mut sys = RecordingMaterialSystem::new();
    let env = Env::new(&mut sys, Catalog::new(&doc, None), SearchPath::new(), true);
    let mut ctx = LoaderContext::new(env);

    assert_eq!(ctx.env.indent(), None);
    ctx.scoped(LogScope::Global, Some("outer/"), |ctx| {
        assert_eq!(ctx.env.indent(), None);
        ctx.scoped(LogScope::Graph, None, |ctx| {
            assert_eq!(ctx.env.indent(), Some(0));
            ctx.scoped(LogScope::Node, Some("inner/"), |ctx| {
                assert_eq!(ctx.env.indent(), Some(1));
                assert_eq!(ctx.env.file_prefix, "inner/");
                ctx.scoped(LogScope::Graph, None, |ctx| {
                    assert_eq!(ctx.env.indent(), Some(3));
                    ctx.scoped(LogScope::Input, None, |ctx| {
                        assert_eq!(ctx.env.indent(), Some(5));
                    });
                });
            });
            assert_eq!(ctx.env.file_prefix, "outer/");
        });
    });
    assert_eq!(ctx.env.indent(), None);
    assert_eq!(ctx.env.file_prefix, "");
}

#[test]
fn geom_nodes_are_memoized_per_definition() {
    let doc = Document::default();
    let mut sys = RecordingMaterialSystem::new();
    let env = Env::new(&mut sys, Catalog::new(&doc, None), SearchPath::new(), false);
    let mut ctx = LoaderContext::new(env);

    let uv0 = geom("UV0", "texcoord", "vector2", None, None);
    let uv1 = geom("UV1", "texcoord", "vector2", Some("1"), None);
    let a = ctx.geom_node(&uv0).unwrap();
    let b = ctx.geom_node(&uv0).unwrap();
    let c = ctx.geom_node(&uv1).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(ctx.cached_roots().count(), 2);

    let h0 = ctx.nodes.leaf(a).unwrap().handle.unwrap();
    let h1 = ctx.nodes.leaf(c).unwrap().handle.unwrap();
    ctx.nodes.release_owned(&mut *ctx.env.sys);
    drop(ctx);
    assert_eq!(sys.created_count(), 2);
    assert_eq!(sys.deletions_of(h0), 1);
    assert_eq!(sys.deletions_of(h1), 1);
}

#[test]
fn geom_lookup_values_follow_property_and_space() {
    let doc = Document::default();
    let mut sys = RecordingMaterialSystem::new();
    let env = Env::new(&mut sys, Catalog::new(&doc, None), SearchPath::new(), false);
    let mut ctx = LoaderContext::new(env);

    let cases = [
        (geom("uv", "texcoord", "vector2", Some("0"), None), LookupValue::Uv),
        (geom("uv1", "texcoord", "vector3", Some("1"), None), LookupValue::Uv1),
        (geom("nw", "normal", "vector3", None, Some("world")), LookupValue::N),
        (geom("pw", "position", "vector3", None, Some("world")), LookupValue::P),
        (geom("po", "position", "vector3", None, Some("object")), LookupValue::PLocal),
    ];
    let mut handles = Vec::new();
    for (def, expected) in &cases {
        let id = ctx.geom_node(def).unwrap();
        handles.push((ctx.nodes.leaf(id).unwrap().handle.unwrap(), *expected));
    }

    assert!(ctx.geom_node(&geom("no", "normal", "vector3", None, Some("object"))).is_none());
    assert!(ctx.geom_node(&geom("uv2", "texcoord", "vector2", Some("2"), None)).is_none());
    assert!(ctx.geom_node(&geom("tan", "tangent", "vector3", None, None)).is_none());
    assert!(ctx.geom_node(&geom("bad", "", "vector3", None, None)).is_none());
    drop(ctx);

    for (handle, expected) in handles {
        let node = sys.node(handle).unwrap();
        assert_eq!(node.ty, NativeNodeType::InputLookup);
        assert_eq!(
            node.inputs.get(&InputKey::Value),
            Some(&RecordedInput::Uint(expected.id()))
        );
    }
    assert_eq!(sys.created_count(), 5);
}

#[test]
fn resolve_file_applies_prefix_then_search_path() {
    let dir = temp_dir("resolve");
    std::fs::create_dir_all(dir.join("textures")).unwrap();
    std::fs::write(dir.join("textures/wood.png"), b"x").unwrap();

    let doc = Document::default();
    let mut sys = RecordingMaterialSystem::new();
    let sp: SearchPath = std::iter::once(dir.clone()).collect();
    let env = Env::new(&mut sys, Catalog::new(&doc, None), sp, false);
    let mut ctx = LoaderContext::new(env);

    assert_eq!(ctx.env.resolve_file("wood.png"), "");
    let resolved = ctx.scoped(LogScope::Node, Some("textures/"), |ctx| {
        ctx.env.resolve_file("wood.png")
    });
    assert_eq!(resolved, dir.join("textures/wood.png").to_string_lossy());

    let _ = std::fs::remove_dir_all(dir);
}
