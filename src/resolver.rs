//! Worker binary discovery among build output directories.
//!
//! The build tooling lays out binaries as
//! `{build_root}/{target}/{configuration}/{binary}[.exe]`, one directory per
//! build target (e.g. `ubuntu-24.04_x86_64`, `macos_arm64`). The resolver
//! picks the target that matches the running platform, falling back to the
//! first available one with a warning.

use std::path::{Path, PathBuf};

/// Error type for executable resolution.
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    /// The build root directory does not exist.
    #[error("build root {0} does not exist")]
    BuildRootMissing(PathBuf),
    /// No target directory under the build root contains the binary.
    #[error("no built {binary} executable found under {build_root}")]
    NotFound {
        build_root: PathBuf,
        binary: String,
    },
    /// Other I/O error while scanning the build root.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A resolved worker executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExecutable {
    /// Full path to the executable.
    pub path: PathBuf,
    /// Name of the build target directory it was found in.
    pub target: String,
}

/// Locates the worker binary under a build root.
#[derive(Debug, Clone)]
pub struct ExecutableResolver {
    binary_name: String,
    configuration: String,
}

impl ExecutableResolver {
    /// Create a resolver for the given binary name, looking in `release`
    /// output.
    #[must_use]
    pub fn new(binary_name: impl Into<String>) -> Self {
        Self {
            binary_name: binary_name.into(),
            configuration: "release".to_string(),
        }
    }

    /// Override the build configuration directory (`release` by default).
    #[must_use]
    pub fn configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = configuration.into();
        self
    }

    /// File name of the binary including the platform suffix.
    fn binary_file_name(&self) -> String {
        format!("{}{}", self.binary_name, std::env::consts::EXE_SUFFIX)
    }

    /// Resolve the executable under `build_root`.
    ///
    /// With exactly one built target the choice is automatic. With several,
    /// the platform preference list decides; if none of the preferred targets
    /// is present the first available one is used and a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::BuildRootMissing` if `build_root` does not
    /// exist, and `ResolveError::NotFound` if no target directory contains
    /// the binary.
    pub fn resolve(&self, build_root: &Path) -> Result<ResolvedExecutable, ResolveError> {
        if !build_root.is_dir() {
            return Err(ResolveError::BuildRootMissing(build_root.to_path_buf()));
        }

        let file_name = self.binary_file_name();
        let mut candidates: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(build_root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let target = entry.file_name().to_string_lossy().into_owned();
            if entry.path().join(&self.configuration).join(&file_name).is_file() {
                candidates.push(target);
            }
        }
        // Directory order is filesystem-dependent; sort for a stable pick.
        candidates.sort();

        if candidates.is_empty() {
            return Err(ResolveError::NotFound {
                build_root: build_root.to_path_buf(),
                binary: self.binary_name.clone(),
            });
        }

        let target = if candidates.len() == 1 {
            let target = candidates.remove(0);
            tracing::info!(%target, "Auto-detected worker build target");
            target
        } else {
            self.pick_preferred(candidates)
        };

        let path = build_root
            .join(&target)
            .join(&self.configuration)
            .join(&file_name);

        Ok(ResolvedExecutable { path, target })
    }

    fn pick_preferred(&self, candidates: Vec<String>) -> String {
        let preferred = preferred_targets(std::env::consts::OS, std::env::consts::ARCH);
        for pref in preferred {
            if let Some(target) = candidates.iter().find(|c| c.as_str() == *pref) {
                tracing::info!(
                    target = %target,
                    available = candidates.len(),
                    "Auto-detected worker build target"
                );
                return target.clone();
            }
        }

        let target = candidates[0].clone();
        tracing::warn!(
            target = %target,
            available = ?candidates,
            "No build target matches this platform, using first available"
        );
        target
    }
}

/// Ordered target preference for the given platform.
fn preferred_targets(os: &str, arch: &str) -> &'static [&'static str] {
    match (os, arch) {
        ("macos", "aarch64") => &["macos_arm64", "macos_x86_64"],
        ("macos", _) => &["macos_x86_64", "macos_arm64"],
        ("linux", "aarch64") => &[
            "ubuntu-24.04_armv8",
            "ubuntu-22.04_armv8",
            "ubuntu-20.04_armv8",
        ],
        ("linux", _) => &[
            "ubuntu-24.04_x86_64",
            "ubuntu-22.04_x86_64",
            "ubuntu-20.04_x86_64",
        ],
        ("windows", _) => &["windows_x86_64"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place_binary(build_root: &Path, target: &str, name: &str) {
        let dir = build_root.join(target).join("release");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
        std::fs::write(file, b"").unwrap();
    }

    #[test]
    fn test_missing_build_root() {
        let resolver = ExecutableResolver::new("media-worker");
        let err = resolver.resolve(Path::new("/nonexistent/_build")).unwrap_err();
        assert!(matches!(err, ResolveError::BuildRootMissing(_)));
    }

    #[test]
    fn test_no_candidates() {
        let dir = tempfile::tempdir().unwrap();
        // Target directory exists but has no binary inside.
        std::fs::create_dir_all(dir.path().join("ubuntu-24.04_x86_64/release")).unwrap();

        let resolver = ExecutableResolver::new("media-worker");
        let err = resolver.resolve(dir.path()).unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
    }

    #[test]
    fn test_single_candidate_selected() {
        let dir = tempfile::tempdir().unwrap();
        place_binary(dir.path(), "some-exotic-target", "media-worker");

        let resolver = ExecutableResolver::new("media-worker");
        let resolved = resolver.resolve(dir.path()).unwrap();
        assert_eq!(resolved.target, "some-exotic-target");
        assert!(resolved.path.ends_with(
            Path::new("some-exotic-target")
                .join("release")
                .join(format!("media-worker{}", std::env::consts::EXE_SUFFIX))
        ));
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn test_preference_ranking_picks_platform_target() {
        let dir = tempfile::tempdir().unwrap();
        place_binary(dir.path(), "macos_arm64", "media-worker");
        place_binary(dir.path(), "ubuntu-22.04_x86_64", "media-worker");
        place_binary(dir.path(), "ubuntu-24.04_x86_64", "media-worker");

        let resolver = ExecutableResolver::new("media-worker");
        let resolved = resolver.resolve(dir.path()).unwrap();
        assert_eq!(resolved.target, "ubuntu-24.04_x86_64");
    }

    #[test]
    fn test_fallback_to_first_available() {
        let dir = tempfile::tempdir().unwrap();
        place_binary(dir.path(), "zz-custom-b", "media-worker");
        place_binary(dir.path(), "aa-custom-a", "media-worker");

        let resolver = ExecutableResolver::new("media-worker");
        let resolved = resolver.resolve(dir.path()).unwrap();
        // Neither matches any platform preference; first sorted wins.
        assert_eq!(resolved.target, "aa-custom-a");
    }

    #[test]
    fn test_custom_configuration_directory() {
        let dir = tempfile::tempdir().unwrap();
        let debug_dir = dir.path().join("ubuntu-24.04_x86_64/debug");
        std::fs::create_dir_all(&debug_dir).unwrap();
        std::fs::write(
            debug_dir.join(format!("media-worker{}", std::env::consts::EXE_SUFFIX)),
            b"",
        )
        .unwrap();

        let release_only = ExecutableResolver::new("media-worker");
        assert!(release_only.resolve(dir.path()).is_err());

        let debug = ExecutableResolver::new("media-worker").configuration("debug");
        assert!(debug.resolve(dir.path()).is_ok());
    }
}
