pub fn main() {
    // Generate git version info using vergen for the /data/status endpoint
    generate_version_info();

    println!("cargo:rerun-if-changed=build.rs");
}

/// Generate version information from git tags using vergen
///
/// The version is derived from `git describe --tags --always --dirty`:
/// - For tagged commits: the tag name (e.g., "v0.2.0")
/// - For commits after a tag: tag + commits + hash (e.g., "v0.2.0-3-g1a2b3c4")
/// - For dirty working trees: appends "-dirty"
///
/// Available at compile time as `env!("VERGEN_GIT_DESCRIBE")`, `env!("VERGEN_GIT_SHA")`,
/// `env!("VERGEN_BUILD_TIMESTAMP")` and `env!("VERGEN_CARGO_TARGET_TRIPLE")`.
fn generate_version_info() {
    use vergen_git2::{BuildBuilder, CargoBuilder, Emitter, Git2Builder};

    let build = BuildBuilder::default()
        .build_timestamp(true)
        .build()
        .expect("Failed to configure build info");

    let cargo = CargoBuilder::default()
        .target_triple(true)
        .build()
        .expect("Failed to configure cargo info");

    let git2 = Git2Builder::default()
        .describe(true, true, None)
        .sha(true)
        .build()
        .expect("Failed to configure git info");

    Emitter::default()
        .add_instructions(&build)
        .expect("Failed to add build instructions")
        .add_instructions(&cargo)
        .expect("Failed to add cargo instructions")
        .add_instructions(&git2)
        .expect("Failed to add git instructions")
        .emit()
        .expect("Failed to emit version info");
}
