use std::env;
use std::process::Command;
use time::OffsetDateTime;

/// Run git with `args` and return trimmed stdout on success.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Year stamped into `--version`. Honors SOURCE_DATE_EPOCH for reproducible builds.
fn build_year() -> i32 {
    env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|epoch| OffsetDateTime::from_unix_timestamp(epoch).ok())
        .map(|dt| dt.year())
        .unwrap_or_else(|| OffsetDateTime::now_utc().year())
}

/// Release builds and tagged checkouts report the plain package version.
/// Anything else gets a `-dev` suffix plus the short commit hash when known.
fn display_version(package_version: &str) -> String {
    if env::var("PROFILE").as_deref() == Ok("release") {
        return package_version.to_string();
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");

    let expected_tag = format!("v{package_version}");
    if git(&["describe", "--tags", "--exact-match"]).as_deref() == Some(expected_tag.as_str()) {
        return package_version.to_string();
    }

    match git(&["rev-parse", "--short", "HEAD"]) {
        Some(hash) => format!("{package_version}-dev+{hash}"),
        None => format!("{package_version}-dev"),
    }
}

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-env-changed=CARGO_PKG_VERSION");

    let package_version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());

    println!("cargo:rustc-env=APP_BUILD_YEAR={}", build_year());
    println!("cargo:rustc-env=APP_VERSION_DISPLAY={}", display_version(&package_version));
    println!("cargo:rustc-env=APP_VERSION_SEMVER={package_version}");
}
