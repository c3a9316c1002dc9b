//! Dependency probe.
//!
//! An ordered list of `(name, capability)` pairs. Each capability answers
//! [`Availability::Present`] with a version string or [`Availability::Absent`];
//! every entry is probed, one absence never stops the rest, and nothing here
//! can fail.
//!
//! The stock capabilities look for Python packages the way the interpreter's
//! import system would, on disk only: a package directory, a `.py` file or an
//! extension module in one of the search directories. Versions come from the
//! installed `*.dist-info/METADATA`.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Reported when a capability resolves but has no readable version.
pub const AVAILABLE: &str = "available";
/// Reported when a capability does not resolve.
pub const MISSING: &str = "missing";

/// Outcome of probing one capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Present(String),
    Absent,
}

impl Availability {
    /// The value reported in `checks.dependencies`.
    pub fn as_report_value(&self) -> &str {
        match self {
            Self::Present(version) => version,
            Self::Absent => MISSING,
        }
    }
}

/// Something whose presence can be checked without invoking it.
pub trait Capability: Send + Sync {
    fn probe(&self) -> Availability;
}

impl<F> Capability for F
where
    F: Fn() -> Availability + Send + Sync,
{
    fn probe(&self) -> Availability {
        self()
    }
}

/// Where a present package's version string comes from.
#[derive(Debug, Clone)]
pub enum VersionSource {
    /// Never read a version; present packages report `"available"`.
    Unversioned,
    /// First matching distribution's `Version:` metadata header.
    Distributions(Vec<String>),
}

/// An importable Python package, looked up across `search_path`.
#[derive(Debug, Clone)]
pub struct PythonPackage {
    module: String,
    version: VersionSource,
    search_path: Vec<PathBuf>,
}

impl PythonPackage {
    pub fn new(module: impl Into<String>, version: VersionSource, search_path: Vec<PathBuf>) -> Self {
        Self { module: module.into(), version, search_path }
    }

    fn resolves_in(&self, dir: &Path) -> bool {
        if dir.join(&self.module).is_dir() || dir.join(format!("{}.py", self.module)).is_file() {
            return true;
        }
        let Ok(entries) = fs::read_dir(dir) else {
            return false;
        };
        entries.flatten().any(|entry| is_extension_module(&entry.file_name(), &self.module))
    }

    fn version_in(&self, dir: &Path) -> Option<String> {
        let VersionSource::Distributions(dists) = &self.version else {
            return None;
        };
        let entries = fs::read_dir(dir).ok()?;
        let infos: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension() == Some(OsStr::new("dist-info")))
            .collect();

        dists.iter().find_map(|dist| {
            let wanted = normalize(dist);
            infos
                .iter()
                .filter(|info| {
                    info.file_stem()
                        .and_then(OsStr::to_str)
                        .and_then(|stem| stem.rsplit_once('-'))
                        .is_some_and(|(name, _)| normalize(name) == wanted)
                })
                .find_map(|info| metadata_version(&info.join("METADATA")))
        })
    }
}

impl Capability for PythonPackage {
    fn probe(&self) -> Availability {
        let Some(dir) = self.search_path.iter().find(|dir| self.resolves_in(dir)) else {
            return Availability::Absent;
        };

        // Installed metadata usually sits next to the package, but a package
        // found on an application root may be versioned in site-packages.
        let version = std::iter::once(dir.as_path())
            .chain(self.search_path.iter().map(PathBuf::as_path))
            .find_map(|d| self.version_in(d));

        Availability::Present(version.unwrap_or_else(|| AVAILABLE.to_owned()))
    }
}

/// `cv2.so`, `cv2.cpython-311-x86_64-linux-gnu.so`, `cv2.cp311-win_amd64.pyd`.
fn is_extension_module(file_name: &OsStr, module: &str) -> bool {
    let Some(name) = file_name.to_str() else {
        return false;
    };
    let Some(rest) = name.strip_prefix(module) else {
        return false;
    };
    rest.starts_with('.') && (rest.ends_with(".so") || rest.ends_with(".pyd"))
}

/// PEP 503 name normalisation: case-insensitive, runs of `-_.` are equal.
fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut sep = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            sep = true;
        } else {
            if sep && !out.is_empty() {
                out.push('-');
            }
            sep = false;
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

fn metadata_version(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    text.lines()
        // Headers end at the first blank line.
        .take_while(|line| !line.is_empty())
        .find_map(|line| line.strip_prefix("Version:"))
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// The ordered dependency list probed for every health report.
pub struct DependencyProbe {
    entries: Vec<(String, Box<dyn Capability>)>,
}

impl DependencyProbe {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn with(mut self, name: impl Into<String>, capability: impl Capability + 'static) -> Self {
        self.entries.push((name.into(), Box::new(capability)));
        self
    }

    /// opencv, fpdf2 and numpy, searched for in `search_path`.
    pub fn conversion_stack(search_path: Vec<PathBuf>) -> Self {
        let opencv = [
            "opencv-python",
            "opencv-python-headless",
            "opencv-contrib-python",
            "opencv-contrib-python-headless",
        ];
        Self::new()
            .with(
                "opencv",
                PythonPackage::new(
                    "cv2",
                    VersionSource::Distributions(opencv.map(String::from).to_vec()),
                    search_path.clone(),
                ),
            )
            .with("fpdf2", PythonPackage::new("fpdf", VersionSource::Unversioned, search_path.clone()))
            .with(
                "numpy",
                PythonPackage::new(
                    "numpy",
                    VersionSource::Distributions(vec!["numpy".to_owned()]),
                    search_path,
                ),
            )
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Probes every entry, in order.
    pub fn run(&self) -> Dependencies {
        Dependencies(
            self.entries
                .iter()
                .map(|(name, capability)| (name.clone(), capability.probe()))
                .collect(),
        )
    }
}

impl Default for DependencyProbe {
    fn default() -> Self { Self::new() }
}

/// Probe results, serialised as a `name → version | "missing"` object in
/// probe order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependencies(pub Vec<(String, Availability)>);

impl Dependencies {
    pub fn get(&self, name: &str) -> Option<&Availability> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }
}

impl Serialize for Dependencies {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, availability) in &self.0 {
            map.serialize_entry(name, availability.as_report_value())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn site_packages() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("cv2/__init__.py"), "");
        touch(
            &root.join("opencv_python_headless-4.8.1.78.dist-info/METADATA"),
            "Metadata-Version: 2.1\nName: opencv-python-headless\nVersion: 4.8.1.78\n\nVersion: bogus\n",
        );
        touch(&root.join("fpdf/__init__.py"), "");
        touch(&root.join("fpdf2-2.7.6.dist-info/METADATA"), "Name: fpdf2\nVersion: 2.7.6\n");
        touch(&root.join("numpy/__init__.py"), "");
        touch(&root.join("numpy-1.26.4.dist-info/METADATA"), "Name: numpy\nVersion: 1.26.4\n");
        dir
    }

    #[test]
    fn conversion_stack_reports_versions_and_available() {
        let dir = site_packages();
        let deps = DependencyProbe::conversion_stack(vec![dir.path().to_path_buf()]).run();

        assert_eq!(deps.get("opencv"), Some(&Availability::Present("4.8.1.78".into())));
        assert_eq!(deps.get("fpdf2"), Some(&Availability::Present(AVAILABLE.into())));
        assert_eq!(deps.get("numpy"), Some(&Availability::Present("1.26.4".into())));
    }

    #[test]
    fn every_name_is_reported_even_when_nothing_resolves() {
        let empty = tempfile::tempdir().unwrap();
        let probe = DependencyProbe::conversion_stack(vec![
            empty.path().to_path_buf(),
            PathBuf::from("/definitely/not/here"),
        ]);
        let deps = probe.run();

        let names: Vec<_> = deps.0.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["opencv", "fpdf2", "numpy"]);
        assert!(deps.0.iter().all(|(_, a)| *a == Availability::Absent));
        assert_eq!(
            serde_json::to_value(&deps).unwrap(),
            serde_json::json!({ "opencv": "missing", "fpdf2": "missing", "numpy": "missing" })
        );
    }

    #[test]
    fn one_absence_does_not_stop_the_rest() {
        let deps = DependencyProbe::new()
            .with("a", || Availability::Absent)
            .with("b", || Availability::Present("2.0".into()))
            .run();
        assert_eq!(deps.get("a"), Some(&Availability::Absent));
        assert_eq!(deps.get("b"), Some(&Availability::Present("2.0".into())));
    }

    #[test]
    fn extension_module_resolves_without_metadata() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("cv2.cpython-311-x86_64-linux-gnu.so"), "");

        let pkg = PythonPackage::new(
            "cv2",
            VersionSource::Distributions(vec!["opencv-python".into()]),
            vec![dir.path().to_path_buf()],
        );
        assert_eq!(pkg.probe(), Availability::Present(AVAILABLE.into()));
    }

    #[test]
    fn version_is_found_elsewhere_on_the_search_path() {
        let app = tempfile::tempdir().unwrap();
        touch(&app.path().join("numpy.py"), "");
        let site = site_packages();

        let pkg = PythonPackage::new(
            "numpy",
            VersionSource::Distributions(vec!["numpy".into()]),
            vec![app.path().to_path_buf(), site.path().to_path_buf()],
        );
        assert_eq!(pkg.probe(), Availability::Present("1.26.4".into()));
    }

    #[test]
    fn extension_module_names() {
        assert!(is_extension_module(OsStr::new("cv2.so"), "cv2"));
        assert!(is_extension_module(OsStr::new("cv2.cp311-win_amd64.pyd"), "cv2"));
        assert!(!is_extension_module(OsStr::new("cv2ext.so"), "cv2"));
        assert!(!is_extension_module(OsStr::new("cv2.txt"), "cv2"));
    }

    #[test]
    fn distribution_names_normalise() {
        assert_eq!(normalize("OpenCV_Python.Headless"), "opencv-python-headless");
        assert_eq!(normalize("opencv--python"), "opencv-python");
        assert_eq!(normalize("numpy"), "numpy");
    }
}
