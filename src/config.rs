//! Startup configuration.
//!
//! Read once from the environment when the process starts; never reloaded.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `HEALTH_HOST` | `0.0.0.0` | Address or host name to bind. |
//! | `HEALTH_PORT` | `8080` | TCP port to bind. |
//! | `PYTHONPATH` | — | Extra directories searched for dependencies. |
//! | `VIRTUAL_ENV` | — | Virtualenv whose site-packages are searched. |

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info";

pub const HOST_VAR: &str = "HEALTH_HOST";
pub const PORT_VAR: &str = "HEALTH_PORT";

/// Application roots tried, in order, when resolving the entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRoots {
    pub primary: PathBuf,
    pub fallback: Option<PathBuf>,
}

impl AppRoots {
    /// Working directory first, then the parent of the directory holding the
    /// running executable.
    ///
    /// A binary installed as `<app>/bin/thakii-health` falls back to `<app>`.
    /// One left in cargo's `target/release/` falls back to `target/`, which
    /// never holds the entry point: install it under the application root or
    /// start it from there.
    pub fn detect() -> Self {
        let primary = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let fallback = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent()?.parent().map(Path::to_path_buf));
        Self { primary, fallback }
    }

    fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.primary).chain(self.fallback.as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub roots: AppRoots,
    pub python_path: Vec<PathBuf>,
    pub virtual_env: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), AppRoots::detect())
    }

    /// Builds the configuration from any variable lookup.
    pub fn from_lookup<F>(lookup: F, roots: AppRoots) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // An empty host means "all interfaces", like the unset default.
        let host = lookup(HOST_VAR)
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_owned());

        let port = match lookup(PORT_VAR) {
            None => DEFAULT_PORT,
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort {
                var: PORT_VAR,
                value: raw,
            })?,
        };

        let python_path = lookup("PYTHONPATH")
            .map(|raw| {
                std::env::split_paths(&raw)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let virtual_env = lookup("VIRTUAL_ENV")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self { host, port, roots, python_path, virtual_env })
    }

    /// `host:port`, bracketing bare IPv6 literals.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Directories searched for the probed dependencies, in priority order:
    /// application roots, `PYTHONPATH`, the virtualenv, then system
    /// site/dist-packages. Directories that do not exist are left out.
    pub fn search_path(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.roots.iter().cloned().collect();
        dirs.extend(self.python_path.iter().cloned());

        if let Some(venv) = &self.virtual_env {
            dirs.extend(python_lib_dirs(&venv.join("lib"), &["site-packages"]));
        }
        for lib in ["/usr/local/lib", "/usr/lib"] {
            dirs.extend(python_lib_dirs(Path::new(lib), &["site-packages", "dist-packages"]));
        }

        let mut seen = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if dir.is_dir() && !seen.contains(&dir) {
                seen.push(dir);
            }
        }
        seen
    }
}

/// `<lib>/python3*/<leaf>` for each leaf, sorted so newer minors come later.
fn python_lib_dirs(lib: &Path, leaves: &[&str]) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(lib) else {
        return Vec::new();
    };
    let mut versions: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| e.file_name().to_str().is_some_and(|n| n.starts_with("python3")))
        .map(|e| e.path())
        .collect();
    versions.sort();

    versions
        .iter()
        .flat_map(|v| leaves.iter().map(move |leaf| v.join(leaf)))
        .collect()
}
