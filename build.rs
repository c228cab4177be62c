use std::fs;
use std::path::Path;

const VERSION_FILE: &str = "VERSION";

fn release_version(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(contents) => contents.trim().to_string(),
        Err(e) => panic!(
            "cannot read {} ({}); create it with the crate version, e.g. `echo {} > {}`",
            path.display(),
            e,
            env!("CARGO_PKG_VERSION"),
            VERSION_FILE
        ),
    }
}

fn main() {
    println!("cargo:rerun-if-changed={}", VERSION_FILE);
    println!("cargo:rerun-if-changed=Cargo.toml");

    let released = release_version(Path::new(VERSION_FILE));
    let manifest = env!("CARGO_PKG_VERSION");

    if released != manifest {
        panic!(
            "\n\nquery-kit release files disagree:\n  {}: {}\n  Cargo.toml: {}\n\n",
            VERSION_FILE, released, manifest
        );
    }
}
