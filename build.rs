//! Build script for cosmos-bench.
//!
//! Links against the native Cosmos DB client library when the `native`
//! feature is enabled. The library location comes from
//! `AZURECOSMOS_LIB_DIR`, falling back to `pkg-config azurecosmos`.

use std::env;
use std::path::PathBuf;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=AZURECOSMOS_LIB_DIR");
    println!("cargo:rerun-if-env-changed=AZURECOSMOS_STATIC");
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");

    // Without the feature nothing references the extern block.
    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    let lib_dir = match env::var("AZURECOSMOS_LIB_DIR") {
        Ok(dir) => Some(PathBuf::from(dir)),
        Err(_) => pkg_config_lib_dir(),
    };

    match lib_dir {
        Some(dir) => {
            if !dir.exists() {
                panic!(
                    "AZURECOSMOS_LIB_DIR points at {}, which does not exist",
                    dir.display()
                );
            }
            println!("cargo:rustc-link-search=native={}", dir.display());
        }
        None => {
            println!(
                "cargo:warning=libazurecosmos not located via AZURECOSMOS_LIB_DIR or pkg-config; \
                 relying on the default linker search path"
            );
        }
    }

    let kind = if env::var_os("AZURECOSMOS_STATIC").is_some() {
        "static"
    } else {
        "dylib"
    };
    println!("cargo:rustc-link-lib={}=azurecosmos", kind);

    // A static Rust-built archive drags in the platform libraries its std needs.
    if kind == "static" {
        #[cfg(target_os = "macos")]
        {
            println!("cargo:rustc-link-lib=framework=CoreFoundation");
            println!("cargo:rustc-link-lib=framework=Security");
        }

        #[cfg(target_os = "linux")]
        {
            println!("cargo:rustc-link-lib=pthread");
            println!("cargo:rustc-link-lib=dl");
            println!("cargo:rustc-link-lib=ssl");
            println!("cargo:rustc-link-lib=crypto");
        }

        #[cfg(target_os = "windows")]
        {
            println!("cargo:rustc-link-lib=ws2_32");
            println!("cargo:rustc-link-lib=advapi32");
            println!("cargo:rustc-link-lib=ntdll");
            println!("cargo:rustc-link-lib=userenv");
            println!("cargo:rustc-link-lib=bcrypt");
        }
    }
}

/// Ask pkg-config for the library directory of `azurecosmos`.
fn pkg_config_lib_dir() -> Option<PathBuf> {
    let output = Command::new("pkg-config")
        .args(["--libs-only-L", "azurecosmos"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .find_map(|flag| flag.strip_prefix("-L"))
        .map(PathBuf::from)
}
