use std::env;
use std::process::Command;
use time::OffsetDateTime;

/// Trimmed stdout of a successful `git` invocation.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string()).filter(|s| !s.is_empty())
}

/// Honours `SOURCE_DATE_EPOCH` for reproducible builds.
fn build_year() -> i32 {
    env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|epoch| OffsetDateTime::from_unix_timestamp(epoch).ok())
        .unwrap_or_else(OffsetDateTime::now_utc)
        .year()
}

/// Release builds print the bare version; other builds add `-dev` unless
/// HEAD is exactly the `v<version>` tag.
fn display_version(version: &str, release: bool) -> String {
    if release {
        return version.to_string();
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");

    let tag = git(&["describe", "--tags", "--exact-match"]);
    if tag.as_deref() == Some(format!("v{version}").as_str()) {
        version.to_string()
    } else {
        format!("{version}-dev")
    }
}

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let release = env::var("PROFILE").is_ok_and(|profile| profile == "release");
    let commit = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=APP_BUILD_YEAR={}", build_year());
    println!(
        "cargo:rustc-env=APP_VERSION_DISPLAY={}",
        display_version(&version, release)
    );
    println!("cargo:rustc-env=APP_GIT_COMMIT={commit}");
}
