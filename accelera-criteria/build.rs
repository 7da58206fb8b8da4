//! Build script for accelera-criteria
//!
//! Embeds `GIT_HASH`, `BUILD_TIMESTAMP` and `BUILD_PROFILE`, logged by the
//! service at startup. Reruns when the checked-out commit changes.

use std::path::Path;
use std::process::Command;

/// Workspace git metadata watched for commit changes
const GIT_WATCH: [&str; 2] = ["../.git/HEAD", "../.git/refs/heads"];

fn git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for path in GIT_WATCH.iter().filter(|p| Path::new(p).exists()) {
        println!("cargo:rerun-if-changed={}", path);
    }

    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    println!(
        "cargo:rustc-env=GIT_HASH={}",
        git_hash().unwrap_or_else(|| "unknown".to_string())
    );
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", built_at);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
}
