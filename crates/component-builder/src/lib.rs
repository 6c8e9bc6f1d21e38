use cargo_metadata::camino::Utf8Path;
use std::{
    path::{Path, PathBuf},
    process::Command,
};

const WASI_P2: &str = "wasm32-wasip2";

/// Build the parent WASM component and place it into the `OUT_DIR`.
///
/// This function must be called from `build.rs`. It reads the current package
/// name and strips the `-builder` suffix to determine the target package name.
/// Then, it runs `cargo build` for `wasm32-wasip2` and writes `gen.rs` into
/// the `OUT_DIR`, containing a `pub const` with the path to the built component.
/// The constant is named after the target package in upper snake case.
pub fn build_component() {
    let out_dir = get_out_dir();
    let pkg_name = std::env::var("CARGO_PKG_NAME").expect("CARGO_PKG_NAME must be set by cargo");
    let pkg_name = pkg_name
        .strip_suffix("-builder")
        .expect("builder package name must end with `-builder`");
    let wasm_path = run_cargo_build(&out_dir, pkg_name, WASI_P2);
    if std::env::var("RUST_LOG").is_ok() {
        println!("cargo:warning=Built {wasm_path:?}");
    }
    let generated_code = format!(
        "pub const {name_upper}: &str = {wasm_path:?};\n",
        name_upper = to_snake_case(pkg_name).to_uppercase()
    );
    std::fs::write(out_dir.join("gen.rs"), generated_code).expect("cannot write `gen.rs`");

    let meta = cargo_metadata::MetadataCommand::new()
        .exec()
        .expect("cannot read cargo metadata");
    let package = meta
        .packages
        .iter()
        .find(|p| *p.name == *pkg_name)
        .unwrap_or_else(|| panic!("package `{pkg_name}` must exist"));

    add_dependency(&package.manifest_path); // Cargo.toml
    for src_path in package
        .targets
        .iter()
        .filter_map(|target| target.src_path.parent())
    {
        add_dependency(src_path);
    }
    if let Some(package_dir) = package.manifest_path.parent() {
        let wit_path = package_dir.join("wit");
        if wit_path.is_dir() {
            add_dependency(&wit_path);
        }
    }
}

fn to_snake_case(input: &str) -> String {
    input.replace(['-', '.'], "_")
}

/// Get the `OUT_DIR` as a `PathBuf`.
///
/// The folder structure typically looks like this: `target/debug/build/<crate_name>-<hash>/out`.
fn get_out_dir() -> PathBuf {
    PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR environment variable not set"))
}

fn add_dependency(file: &Utf8Path) {
    println!("cargo:rerun-if-changed={file}");
}

fn run_cargo_build(out_dir: &Path, name: &str, tripple: &str) -> PathBuf {
    let mut cmd = Command::new("cargo");
    cmd.arg("build")
        .arg("--release")
        .arg(format!("--target={tripple}"))
        .arg(format!("--package={name}"))
        .env("CARGO_TARGET_DIR", out_dir)
        .env("CARGO_PROFILE_RELEASE_DEBUG", "limited") // keep debuginfo for backtraces
        .env_remove("CARGO_ENCODED_RUSTFLAGS")
        .env_remove("CLIPPY_ARGS"); // do not pass clippy parameters
    let status = cmd.status().expect("cannot run `cargo build`");
    assert!(status.success(), "building `{name}` failed: {status}");
    let target = out_dir
        .join(tripple)
        .join("release")
        .join(format!("{}.wasm", to_snake_case(name)));
    assert!(target.exists(), "Target path must exist: {target:?}");
    target
}

#[cfg(test)]
mod tests {
    use super::to_snake_case;

    #[test]
    fn package_names_become_identifiers() {
        assert_eq!("fibench_component", to_snake_case("fibench-component"));
        assert_eq!("a_b_c", to_snake_case("a.b-c"));
    }
}
