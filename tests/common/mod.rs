use std::path::PathBuf;

/// Load a fixture from tests/fixtures by name.
pub fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|err| panic!("unable to read {}: {err}", path.display()))
}
