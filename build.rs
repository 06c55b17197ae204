use std::process::Command;

const VERSION_VAR: &str = "TABMODEL_BUILD_VERSION";

fn main() {
    println!("cargo:rerun-if-env-changed={VERSION_VAR}");
    println!("cargo:rerun-if-changed=VERSION");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");
    println!("cargo:rerun-if-changed=.git/packed-refs");

    // Packagers pin the version with the env var or a VERSION file; git describe covers dev
    let version = std::env::var(VERSION_VAR)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(file_version)
        .or_else(git_version)
        .unwrap_or_else(|| std::env::var("CARGO_PKG_VERSION").unwrap_or_default());
    println!("cargo:rustc-env={VERSION_VAR}={version}");
}

fn strip_v(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let version = raw.strip_prefix('v').unwrap_or(raw);
    (!version.is_empty()).then(|| version.to_string())
}

/// Contents of a `VERSION` file next to the manifest, if any
fn file_version() -> Option<String> {
    let raw = std::fs::read_to_string("VERSION").ok()?;
    strip_v(&raw)
}

/// `git describe` output without the leading `v` (e.g. "v0.3.1-2-gabc" -> "0.3.1-2-gabc")
fn git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    strip_v(&String::from_utf8_lossy(&output.stdout))
}
