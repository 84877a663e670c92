use mtlx_translate::{
    Document, Loader, LoaderOpts, OutputKind, RecordingMaterialSystem, SearchPath,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let lib = Document::from_json(include_str!("../tests/data/stdlib.json"))?;
    let doc = match std::env::args().nth(1) {
        Some(path) => Document::from_json(&std::fs::read_to_string(path)?)?,
        None => Document::from_json(include_str!("../tests/data/diamond.json"))?,
    };

    let mut loader = Loader::new();
    loader.set_logging(true);
    loader.setup_stdlib(lib, SearchPath::new());

    let renderable = loader.renderable_elements(&doc);
    for kind in OutputKind::ALL {
        println!("{kind:?}: {:?}", renderable.get(kind));
    }

    let mut sys = RecordingMaterialSystem::new();
    let result = loader.load(&doc, &LoaderOpts::default(), &mut sys);
    println!(
        "{} nodes, {} images, roots {:?}",
        result.nodes.len(),
        result.image_nodes.len(),
        result.root_indices
    );
    for (handle, node) in sys.live_nodes() {
        println!("  {handle:?} {:?} {:?}", node.ty, node.name.as_deref().unwrap_or(""));
    }
    result.release(&mut sys)?;
    Ok(())
}
