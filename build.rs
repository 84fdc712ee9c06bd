use std::path::PathBuf;

#[allow(dead_code)]
#[path = "src/vcs.rs"]
mod vcs;

fn main() {
    let manifest_dir = std::env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_default();
    // Builds from a source archive, or from a checkout that ignores this
    // directory, have no stamp; the binary then reports "not available"
    if let Ok(stamp) = vcs::VcsStamp::discover(&manifest_dir) {
        stamp.emit_cargo_env();
    }
    println!("cargo:rerun-if-changed=build.rs");
}
