//! Entry-point resolution.
//!
//! The conversion service is a Python application whose entry point is the
//! `CommandLineArgRunner` symbol in module `src.main`. Resolving it means
//! finding that module under an application root and confirming the symbol is
//! defined at top level. Nothing is executed.
//!
//! The lookup runs in two stages: a primary locator and, only when that
//! fails, a fallback. The default pair covers both layouts the service ships
//! in: run from its installed root (working directory) or from a loose script
//! one directory below the root.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default module holding the entry point, in dotted form.
pub const DEFAULT_MODULE: &str = "src.main";
/// Default entry-point symbol.
pub const DEFAULT_SYMBOL: &str = "CommandLineArgRunner";

/// Where a resolved entry point lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub file: PathBuf,
}

/// Why a single locator could not resolve the entry point.
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("no module named '{module}' under {}", .root.display())]
    ModuleNotFound { module: String, root: PathBuf },

    #[error("cannot import name '{symbol}' from '{module}' ({})", .file.display())]
    SymbolNotFound { module: String, symbol: String, file: PathBuf },

    #[error("failed to read {}: {source}", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One way of finding the entry point.
pub trait Locate: Send + Sync {
    fn locate(&self) -> Result<Resolved, LocateError>;

    /// Short label used in logs and fault messages.
    fn describe(&self) -> String;
}

/// Looks for `module` (dotted) under `root` and checks it defines `symbol`.
#[derive(Debug, Clone)]
pub struct ModuleLocator {
    root: PathBuf,
    module: String,
    symbol: String,
}

impl ModuleLocator {
    pub fn new(root: impl Into<PathBuf>, module: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self { root: root.into(), module: module.into(), symbol: symbol.into() }
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Candidate files for the module: `a/b.py`, then `a/b/__init__.py`.
    fn candidates(&self) -> [PathBuf; 2] {
        let rel: PathBuf = self.module.split('.').collect();
        let file = self.root.join(&rel).with_extension("py");
        let package = self.root.join(&rel).join("__init__.py");
        [file, package]
    }
}

impl Locate for ModuleLocator {
    fn locate(&self) -> Result<Resolved, LocateError> {
        let Some(file) = self.candidates().into_iter().find(|p| p.is_file()) else {
            return Err(LocateError::ModuleNotFound {
                module: self.module.clone(),
                root: self.root.clone(),
            });
        };

        let source = fs::read_to_string(&file)
            .map_err(|source| LocateError::Io { file: file.clone(), source })?;

        if defines_symbol(&source, &self.symbol) {
            Ok(Resolved { file })
        } else {
            Err(LocateError::SymbolNotFound {
                module: self.module.clone(),
                symbol: self.symbol.clone(),
                file,
            })
        }
    }

    fn describe(&self) -> String {
        format!("{}:{} in {}", self.module, self.symbol, self.root.display())
    }
}

/// True when `name` is bound in module scope.
///
/// Module scope includes the bodies of top-level `try`/`except`/`if`/`else`
/// and similar blocks, but not `class` or `def` bodies.
fn defines_symbol(source: &str, name: &str) -> bool {
    // Open compound statements: (indent, opens a function or class scope).
    let mut blocks: Vec<(usize, bool)> = Vec::new();
    for (indent, line) in logical_lines(source) {
        while blocks.last().is_some_and(|&(open, _)| open >= indent) {
            blocks.pop();
        }
        let module_scope = blocks.iter().all(|&(_, scoped)| !scoped);
        if module_scope && binds(&line, name) {
            return true;
        }
        if line.ends_with(':') {
            let scoped = ["class ", "def ", "async def "].iter().any(|kw| line.starts_with(kw));
            blocks.push((indent, scoped));
        }
    }
    false
}

/// `class name`, `def name`, `async def name`, a `name = …` assignment, an
/// `import … as name` or a `from … import name`.
fn binds(line: &str, name: &str) -> bool {
    if let Some(rest) = line
        .strip_prefix("class ")
        .or_else(|| line.strip_prefix("def "))
        .or_else(|| line.strip_prefix("async def "))
    {
        return starts_with_ident(rest, name);
    }
    if line.starts_with("import ") || line.starts_with("from ") {
        return line
            .split(|c: char| c == ',' || c == '(' || c == ')' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .windows(2)
            .any(|w| w[0] == "as" && w[1] == name)
            || (line.starts_with("from ") && imports_name(line, name));
    }
    match line.split_once('=') {
        Some((lhs, rhs)) if !rhs.starts_with('=') => {
            lhs.split(',').any(|t| t.trim().split(':').next().map(str::trim) == Some(name))
        }
        _ => false,
    }
}

/// Splits Python source into logical lines with their indentation.
///
/// Bracketed and backslash continuations are joined onto one line. Comments
/// are dropped and string literals are reduced to `""`, so text inside a
/// docstring never looks like a definition.
fn logical_lines(source: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut indent = 0;
    let mut depth = 0usize;
    let mut triple: Option<&'static str> = None;
    let mut continued = false;

    for physical in source.lines() {
        let text = if continued {
            current.push(' ');
            physical
        } else {
            let trimmed = physical.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            indent = physical.len() - trimmed.len();
            trimmed
        };

        let mut chars = text.char_indices();
        while let Some((i, c)) = chars.next() {
            if let Some(close) = triple {
                if text[i..].starts_with(close) {
                    triple = None;
                    chars.nth(1);
                }
                continue;
            }
            match c {
                '#' => break,
                '"' | '\'' => {
                    current.push_str("\"\"");
                    let opener = if c == '"' { "\"\"\"" } else { "'''" };
                    if text[i..].starts_with(opener) {
                        triple = Some(opener);
                        chars.nth(1);
                        continue;
                    }
                    while let Some((_, s)) = chars.next() {
                        if s == '\\' {
                            chars.next();
                        } else if s == c {
                            break;
                        }
                    }
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    current.push(c);
                }
                ')' | ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                _ => current.push(c),
            }
        }

        let backslash = triple.is_none() && current.ends_with('\\');
        if backslash {
            current.pop();
        }
        continued = backslash || depth > 0 || triple.is_some();
        if !continued {
            let line = current.trim();
            if !line.is_empty() {
                lines.push((indent, line.to_owned()));
            }
            current.clear();
        }
    }
    let line = current.trim();
    if !line.is_empty() {
        lines.push((indent, line.to_owned()));
    }
    lines
}

fn starts_with_ident(rest: &str, name: &str) -> bool {
    rest.strip_prefix(name)
        .and_then(|tail| tail.chars().next())
        .is_some_and(|c| !(c.is_alphanumeric() || c == '_'))
}

/// `from x import a, name, b` without an alias on `name`.
fn imports_name(line: &str, name: &str) -> bool {
    let Some((_, names)) = line.split_once(" import ") else {
        return false;
    };
    names
        .trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace())
        .split(',')
        .any(|item| item.trim() == name)
}

/// The two-stage lookup: `primary`, then `fallback` only if `primary` fails.
pub struct EntryPoint {
    primary: Box<dyn Locate>,
    fallback: Option<Box<dyn Locate>>,
}

/// Both stages failed.
#[derive(Debug)]
pub struct Unresolved {
    pub primary: LocateError,
    pub fallback: Option<LocateError>,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary)?;
        if let Some(fallback) = &self.fallback {
            write!(f, "; fallback: {fallback}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Unresolved {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.primary)
    }
}

impl EntryPoint {
    pub fn new(primary: impl Locate + 'static) -> Self {
        Self { primary: Box::new(primary), fallback: None }
    }

    pub fn with_fallback(mut self, fallback: impl Locate + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn resolve(&self) -> Result<Resolved, Unresolved> {
        let primary = match self.primary.locate() {
            Ok(found) => return Ok(found),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return Err(Unresolved { primary, fallback: None });
        };

        tracing::debug!(
            primary = %self.primary.describe(),
            fallback = %fallback.describe(),
            "entry point not found via primary locator: {primary}"
        );

        fallback
            .locate()
            .map_err(|e| Unresolved { primary, fallback: Some(e) })
    }
}
