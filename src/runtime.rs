//! ONNX Runtime discovery.
//!
//! `ort` is built with `load-dynamic`, so the native library is looked up
//! at run time. Finding it up front lets a missing runtime fall back to the
//! placeholder document instead of failing inside the first session call.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::RuntimeConfig;

/// Variable `ort` reads to locate the shared library.
pub const ORT_DYLIB_ENV: &str = "ORT_DYLIB_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available { library: PathBuf },
    Missing { reason: String },
}

/// Locate the ONNX Runtime library.
///
/// An explicit `library_path` is authoritative. Otherwise `ORT_DYLIB_PATH`,
/// then the executable's directory, the loader path variables and the
/// usual system library directories are tried in that order.
pub fn detect(config: &RuntimeConfig) -> Availability {
    detect_with(config, |name| std::env::var_os(name))
}

/// `detect` with the environment lookup supplied by the caller.
fn detect_with(config: &RuntimeConfig, env: impl Fn(&str) -> Option<OsString>) -> Availability {
    if !cfg!(feature = "onnx") {
        return Availability::Missing {
            reason: "built without the `onnx` feature".to_string(),
        };
    }

    if let Some(path) = &config.library_path {
        return if path.is_file() {
            Availability::Available {
                library: path.clone(),
            }
        } else {
            Availability::Missing {
                reason: format!("configured ONNX Runtime library {:?} does not exist", path),
            }
        };
    }

    if let Some(path) = env(ORT_DYLIB_ENV).map(PathBuf::from) {
        if path.is_file() {
            return Availability::Available { library: path };
        }
        tracing::debug!(path = ?path, "{} does not point to a file", ORT_DYLIB_ENV);
    }

    match search_dirs(&env).iter().find_map(|dir| find_in_dir(dir)) {
        Some(library) => Availability::Available { library },
        None => Availability::Missing {
            reason: "ONNX Runtime shared library not found".to_string(),
        },
    }
}

/// Point `ort` at the detected library. Call before any session is built.
pub fn activate(library: &Path) {
    tracing::debug!(library = ?library, "Using ONNX Runtime");
    std::env::set_var(ORT_DYLIB_ENV, library);
}

fn search_dirs(env: &impl Fn(&str) -> Option<OsString>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    for var in ["LD_LIBRARY_PATH", "DYLD_LIBRARY_PATH"] {
        if let Some(paths) = env(var) {
            dirs.extend(std::env::split_paths(&paths));
        }
    }

    if cfg!(target_os = "macos") {
        dirs.extend(["/opt/homebrew/lib", "/usr/local/lib"].map(PathBuf::from));
    } else if cfg!(unix) {
        dirs.extend(
            [
                "/usr/local/lib",
                "/usr/lib",
                "/usr/lib64",
                "/usr/lib/x86_64-linux-gnu",
                "/usr/lib/aarch64-linux-gnu",
            ]
            .map(PathBuf::from),
        );
    }

    dirs
}

fn is_runtime_library(file_name: &str) -> bool {
    if cfg!(windows) {
        file_name.eq_ignore_ascii_case("onnxruntime.dll")
    } else if cfg!(target_os = "macos") {
        file_name.starts_with("libonnxruntime") && file_name.ends_with(".dylib")
    } else {
        // libonnxruntime.so, libonnxruntime.so.1, libonnxruntime.so.1.20.0
        file_name == "libonnxruntime.so" || file_name.starts_with("libonnxruntime.so.")
    }
}

fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;

    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| is_runtime_library(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();

    // Shortest name first: the unversioned link when there is one
    candidates.sort_by_key(|path| path.as_os_str().len());
    candidates.into_iter().next()
}
