//! Guards on the packaging metadata shipped with the binary.

const CARGO_TOML: &str = include_str!("../Cargo.toml");

#[test]
fn release_profile_is_size_optimized() {
    for setting in ["[profile.release]", "lto = true", "strip = true", "codegen-units = 1"] {
        assert!(
            CARGO_TOML.contains(setting),
            "Cargo.toml release profile is missing `{}`",
            setting
        );
    }
}

#[test]
fn package_is_named_revive() {
    assert!(CARGO_TOML.contains("name = \"revive\""));
    assert_eq!(env!("CARGO_PKG_NAME"), "revive");
}
