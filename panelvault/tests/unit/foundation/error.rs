use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        PanelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        PanelError::worker_unavailable("x")
            .to_string()
            .contains("worker unavailable:")
    );
    assert!(
        PanelError::transform("x")
            .to_string()
            .contains("transform failed:")
    );
    assert!(PanelError::fetch("x").to_string().contains("fetch failed:"));
    assert!(PanelError::decode("x").to_string().contains("decode failed:"));
    assert!(PanelError::codec("x").to_string().contains("codec error:"));
    assert!(
        PanelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = PanelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
