use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        LoaderError::unsupported("x")
            .to_string()
            .contains("unsupported:")
    );
    assert!(
        LoaderError::malformed("x")
            .to_string()
            .contains("malformed reference:")
    );
    assert!(
        LoaderError::no_output("x")
            .to_string()
            .contains("no renderable output:")
    );
    assert!(
        LoaderError::coercion("x")
            .to_string()
            .contains("coercion failed:")
    );
    assert!(LoaderError::cycle("x").to_string().contains("cycle detected:"));
    assert!(
        LoaderError::document("x")
            .to_string()
            .contains("document error:")
    );
    assert!(
        LoaderError::from(NativeError::Status(-18))
            .to_string()
            .contains("native call failed:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = LoaderError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn unsupported_covers_native_unsupported_status() {
    assert!(LoaderError::unsupported("in").is_unsupported());
    assert!(LoaderError::from(NativeError::Unsupported).is_unsupported());
    assert!(!LoaderError::from(NativeError::InvalidParameter).is_unsupported());
    assert!(!LoaderError::malformed("x").is_unsupported());
}
