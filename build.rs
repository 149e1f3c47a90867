// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-env-changed=STREAMFORGE_VERSION");

    // Packagers may pin the version explicitly
    let version = match std::env::var("STREAMFORGE_VERSION") {
        Ok(v) => v,
        Err(_) => git_version(),
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// "0.1.0" for a plain crate build, "0.1.0-abcdef1" inside a git checkout
fn git_version() -> String {
    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".into());

    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output();

    match output {
        Ok(output) if output.status.success() => {
            let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if hash.is_empty() {
                pkg_version
            } else {
                format!("{}-{}", pkg_version, hash)
            }
        }
        _ => pkg_version,
    }
}
