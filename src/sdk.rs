use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{VvError, VvResult};

/// Environment override for the vendor SDK root, checked after the explicit
/// `--sdk-root` flag and before filesystem discovery.
pub const SDK_ROOT_ENV: &str = "VERIVOICE_SDK_ROOT";

const NATIVE_BINARY_NAME: &str = "VerifyVoiceCPP";

/// Resolved location of the vendor SDK plus the per-engine artifact paths
/// derived from it. Construction succeeds as soon as a plausible root is
/// found; whether the binaries inside it actually exist is reported through
/// the engine diagnostics, not here.
#[derive(Debug, Clone)]
pub struct SdkLayout {
    root: PathBuf,
}

impl SdkLayout {
    /// Resolve the SDK root. Precedence: explicit path, then the
    /// `VERIVOICE_SDK_ROOT` environment variable, then a bounded filesystem
    /// scan. A configured path that is not a directory fails loudly instead
    /// of falling through to discovery.
    pub fn locate(explicit_root: Option<&Path>) -> VvResult<Self> {
        if let Some(root) = explicit_root {
            return Self::from_configured_root(root, "--sdk-root");
        }
        if let Some(raw) = std::env::var_os(SDK_ROOT_ENV) {
            return Self::from_configured_root(Path::new(&raw), SDK_ROOT_ENV);
        }
        Self::discover()
    }

    fn from_configured_root(root: &Path, origin: &str) -> VvResult<Self> {
        if root.is_dir() {
            Ok(Self {
                root: root.to_path_buf(),
            })
        } else {
            Err(VvError::SdkNotFound(format!(
                "configured root ({origin}) is not a directory: {}",
                root.display()
            )))
        }
    }

    fn discover() -> VvResult<Self> {
        let roots = search_roots();
        for root in &roots {
            if let Some(found) = scan_one_level(root) {
                tracing::info!(root = %found.display(), "discovered vendor SDK");
                return Ok(Self { root: found });
            }
        }

        let searched = roots
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(VvError::SdkNotFound(format!(
            "no SDK installation found; searched: {searched}"
        )))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The compiled scoring binary. Prefers the tutorial directory itself,
    /// then the build tree underneath it. When neither exists the primary
    /// path is returned so callers can report where the binary was expected.
    #[must_use]
    pub fn native_binary(&self) -> PathBuf {
        let tutorial_dir = self.native_tutorial_dir();
        let primary = tutorial_dir.join(NATIVE_BINARY_NAME);
        if primary.is_file() {
            return primary;
        }
        let built = tutorial_dir
            .join(".obj")
            .join("release")
            .join("Linux_x86_64")
            .join(NATIVE_BINARY_NAME)
            .join(NATIVE_BINARY_NAME);
        if built.is_file() {
            return built;
        }
        primary
    }

    #[must_use]
    pub fn native_tutorial_dir(&self) -> PathBuf {
        self.root
            .join("Tutorials")
            .join("Biometrics")
            .join("CPP")
            .join(NATIVE_BINARY_NAME)
    }

    /// Shared libraries the native binary links against; prepended to
    /// `LD_LIBRARY_PATH` at invocation time.
    #[must_use]
    pub fn library_dir(&self) -> PathBuf {
        self.root.join("Lib").join("Linux_x86_64")
    }

    /// Working directory for the Java tutorial; the class file lives here.
    #[must_use]
    pub fn managed_work_dir(&self) -> PathBuf {
        self.root
            .join("Tutorials")
            .join("Biometrics")
            .join("Java")
            .join("verify-voice")
    }

    /// Directory of vendor jars put on the Java classpath.
    #[must_use]
    pub fn managed_classpath_dir(&self) -> PathBuf {
        self.root.join("Bin").join("Java")
    }
}

fn search_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        if let Some(parent) = cwd.parent() {
            roots.push(parent.to_path_buf());
            if let Some(grandparent) = parent.parent() {
                roots.push(grandparent.to_path_buf());
            }
        }
    }
    roots.push(PathBuf::from("/opt/neurotec"));
    roots.push(PathBuf::from("/usr/local/neurotec"));
    if let Some(home) = std::env::var_os("HOME") {
        roots.push(PathBuf::from(home).join("neurotec"));
    }
    roots
}

/// Checks the root itself, then its direct children, sorted for a
/// deterministic pick when several SDK versions sit side by side.
fn scan_one_level(root: &Path) -> Option<PathBuf> {
    if is_sdk_root(root) {
        return Some(root.to_path_buf());
    }
    let entries = fs::read_dir(root).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| is_sdk_root(path))
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// A plausible SDK root is named like the vendor drop and carries the
/// tutorial tree the engines are launched from.
fn is_sdk_root(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    name.contains("Neurotec")
        && name.contains("SDK")
        && path.join("Tutorials").join("Biometrics").is_dir()
}
