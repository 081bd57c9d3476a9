use std::process::Command;

/// Bake the release version into the binary as `NEWSWIRE_VERSION`.
///
/// `NEWSWIRE_VERSION` from the build environment wins, then the nearest git
/// tag, then the crate version.
fn main() {
    let version = std::env::var("NEWSWIRE_VERSION")
        .ok()
        .or_else(git_tag)
        .map(|v| v.trim_start_matches('v').to_string())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=NEWSWIRE_VERSION={}", version);
    println!("cargo:rerun-if-env-changed=NEWSWIRE_VERSION");
    println!("cargo:rerun-if-changed=.git/HEAD");
}

fn git_tag() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--abbrev=0"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let tag = String::from_utf8(output.stdout).ok()?;
    Some(tag.trim().to_string()).filter(|t| !t.is_empty())
}
