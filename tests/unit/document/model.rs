use super::*;

const DOC: &str = r#"{
  "name": "model_test",
  "version": "1.38",
  "fileprefix": "textures/",
  "nodes": [
    {
      "name": "n1",
      "category": "multiply",
      "type": "color3",
      "inputs": [
        { "name": "in1", "type": "color3", "value": "1, 0.5, 0" },
        { "name": "in2", "type": "color3", "nodename": "" },
        { "name": "scale", "kind": "parameter", "type": "float", "value": "2" }
      ]
    }
  ],
  "outputs": [ { "name": "out", "type": "color3", "nodename": "n1" } ],
  "typedefs": [ { "name": "surfaceshader", "semantic": "shader" } ],
  "geompropdefs": [ { "name": "UV0", "geomprop": "texcoord", "type": "vector2", "index": "0" } ]
}"#;

#[test]
fn deserializes_materialx_attribute_names() {
    let doc = Document::from_json(DOC).unwrap();
    assert_eq!(doc.file_prefix.as_deref(), Some("textures/"));

    let n1 = doc.node("n1").unwrap();
    assert_eq!(n1.category, "multiply");
    assert_eq!(n1.input("in1").unwrap().value_str(), Some("1, 0.5, 0"));
    assert!(n1.input("in1").unwrap().is_input());
    assert!(!n1.input("scale").unwrap().is_input());

    assert_eq!(doc.output("out").unwrap().node_name_str(), Some("n1"));
    assert_eq!(
        doc.type_def("surfaceshader").unwrap().semantic.as_deref(),
        Some(SHADER_SEMANTIC)
    );
    assert_eq!(doc.geom_prop_def("UV0").unwrap().geom_prop, "texcoord");
    assert!(doc.material("missing").is_none());
}

#[test]
fn empty_attribute_strings_read_as_absent() {
    let doc = Document::from_json(DOC).unwrap();
    let in2 = doc.node("n1").unwrap().input("in2").unwrap();
    assert_eq!(in2.node_name.as_deref(), Some(""));
    assert_eq!(in2.node_name_str(), None);
    assert_eq!(in2.value_str(), None);
}

#[test]
fn version_integers_tolerate_missing_parts() {
    let mut doc = Document::from_json(DOC).unwrap();
    assert_eq!(doc.version_integers(), (1, 38));
    doc.version = "1".to_owned();
    assert_eq!(doc.version_integers(), (1, 0));
    doc.version = "garbage".to_owned();
    assert_eq!(doc.version_integers(), (0, 0));
}

#[test]
fn malformed_json_is_a_document_error() {
    let err = Document::from_json("{ not json").unwrap_err();
    assert!(matches!(err, LoaderError::Document(_)));
}

#[test]
fn referencing_output_points_at_the_node() {
    let doc = Document::from_json(DOC).unwrap();
    let out = SourceOutput::referencing(doc.node("n1").unwrap());
    assert_eq!(out.name, "out");
    assert_eq!(out.ty, "color3");
    assert_eq!(out.node_name_str(), Some("n1"));
    assert_eq!(out.output_str(), None);
}
