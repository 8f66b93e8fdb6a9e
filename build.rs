//! Build script for dsdiff - links a system DuckDB when the `duckdb` provider is enabled

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=DUCKDB_LIB_PATH");

    // The default build has no DuckDB provider and nothing to link
    if env::var_os("CARGO_FEATURE_DUCKDB").is_none() {
        return;
    }

    if env::var_os("CARGO_FEATURE_BUNDLED").is_some() {
        println!("cargo:warning=Using bundled DuckDB - skipping system library detection");
        return;
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    match find_duckdb_library(&target_os) {
        Some(lib_path) => {
            println!("cargo:rustc-link-search=native={}", lib_path.display());
            println!("cargo:rustc-link-lib=duckdb");
        }
        None => {
            eprintln!("DuckDB library not found for the `duckdb` feature.");
            eprintln!("Install libduckdb, set DUCKDB_LIB_PATH, or build with --features bundled");
            panic!("DuckDB library not found");
        }
    }
}

fn find_duckdb_library(target_os: &str) -> Option<PathBuf> {
    if let Ok(path) = env::var("DUCKDB_LIB_PATH") {
        let path = PathBuf::from(path);
        if has_duckdb_library(&path, target_os) {
            return Some(path);
        }
    }

    if target_os != "windows" {
        if let Some(path) = pkg_config_path(target_os) {
            return Some(path);
        }
    }

    standard_paths(target_os)
        .into_iter()
        .find(|path| has_duckdb_library(path, target_os))
}

fn pkg_config_path(target_os: &str) -> Option<PathBuf> {
    let output = Command::new("pkg-config")
        .args(["--libs-only-L", "duckdb"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .filter_map(|flag| flag.strip_prefix("-L"))
        .map(PathBuf::from)
        .find(|path| has_duckdb_library(path, target_os))
}

fn standard_paths(target_os: &str) -> Vec<PathBuf> {
    let paths: &[&str] = match target_os {
        "macos" => &["/opt/homebrew/lib", "/usr/local/lib", "/opt/local/lib"],
        "linux" => &[
            "/usr/lib",
            "/usr/local/lib",
            "/lib",
            "/usr/lib/x86_64-linux-gnu",
            "/usr/lib64",
        ],
        "windows" => &["C:\\Program Files\\DuckDB\\lib", "C:\\duckdb\\lib"],
        _ => &[],
    };
    paths.iter().map(PathBuf::from).collect()
}

fn has_duckdb_library(path: &Path, target_os: &str) -> bool {
    let names: &[&str] = match target_os {
        "windows" => &["duckdb.dll", "duckdb.lib"],
        "macos" => &["libduckdb.dylib", "libduckdb.a"],
        _ => &["libduckdb.so", "libduckdb.so.1", "libduckdb.a"],
    };
    names.iter().any(|name| path.join(name).exists())
}
