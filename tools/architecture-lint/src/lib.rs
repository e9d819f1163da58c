//! Layer-boundary lint for the member service sources.
//!
//! The service is split into a `domain` core, `inbound` adapters and
//! `outbound` adapters, plus the `middleware` that wraps the inbound side.
//! This crate parses every file under `backend/src/<layer>/` and rejects:
//!
//! - `domain` code importing adapters, composition modules or framework
//!   crates
//! - `inbound` or `middleware` code importing `outbound` or storage crates
//! - `outbound` code importing `inbound`, `middleware` or the web framework
//!
//! Run it with `cargo run -p architecture-lint`.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use syn::visit::Visit;

/// Name the library crate is imported under from tests and the binary.
const CRATE_NAME: &str = "member_service";

/// A boundary violation in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Path relative to `backend/src`.
    pub file: PathBuf,
    /// The rule that was broken.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

fn render(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("\n- {violation}"))
        .collect()
}

/// Why a lint run failed.
#[derive(Debug, thiserror::Error)]
pub enum ArchitectureLintError {
    /// Traversal or reading failed.
    #[error("failed to read sources: {0}")]
    Io(#[from] io::Error),
    /// A file could not be parsed or placed in a layer.
    #[error("cannot lint {}: {message}", file.display())]
    Parse {
        /// Offending file.
        file: PathBuf,
        /// Parser message.
        message: String,
    },
    /// At least one rule was broken.
    #[error("layer boundary violations:{}", render(.0))]
    Violations(Vec<Violation>),
}

/// A source file to lint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `backend/src`.
    pub file: PathBuf,
    /// Rust source text.
    pub contents: String,
}

/// Lint every layer directory under `backend_dir/src`.
///
/// # Errors
///
/// [`ArchitectureLintError::Violations`] when a rule is broken; the other
/// variants when sources cannot be read or parsed.
pub fn lint_backend_sources(backend_dir: &Path) -> Result<(), ArchitectureLintError> {
    let src_dir = backend_dir.join("src");
    let mut sources = Vec::new();
    for layer in Layer::ALL {
        let dir = src_dir.join(layer.dir());
        if dir.is_dir() {
            collect_sources(&src_dir, &dir, &mut sources)?;
        }
    }
    lint_sources(&sources)
}

/// Lint in-memory sources.
///
/// # Errors
///
/// As [`lint_backend_sources`].
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();
    for source in sources {
        let layer = Layer::of(&source.file).ok_or_else(|| ArchitectureLintError::Parse {
            file: source.file.clone(),
            message: "file is outside every layer directory".to_owned(),
        })?;
        let parsed =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        violations.extend(check(&source.file, layer, &parsed));
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(violations))
    }
}

const WEB_CRATES: &[&str] = &["actix_web", "actix_http", "actix_rt"];
const STORAGE_CRATES: &[&str] = &["diesel", "diesel_async", "diesel_migrations"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Domain,
    Inbound,
    Middleware,
    Outbound,
}

impl Layer {
    const ALL: [Self; 4] = [Self::Domain, Self::Inbound, Self::Middleware, Self::Outbound];

    const fn dir(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Inbound => "inbound",
            Self::Middleware => "middleware",
            Self::Outbound => "outbound",
        }
    }

    fn of(relative: &Path) -> Option<Self> {
        let first = relative.components().next()?.as_os_str().to_str()?;
        Self::ALL.into_iter().find(|layer| layer.dir() == first)
    }

    fn forbidden_modules(self) -> &'static [&'static str] {
        match self {
            Self::Domain => &["inbound", "outbound", "middleware", "modules", "server"],
            Self::Inbound | Self::Middleware => &["outbound", "modules", "server"],
            Self::Outbound => &["inbound", "middleware", "modules", "server"],
        }
    }

    fn forbidden_crates(self) -> Vec<&'static str> {
        match self {
            Self::Domain => [WEB_CRATES, STORAGE_CRATES, &["reqwest", "serde_yaml"]].concat(),
            Self::Inbound | Self::Middleware => STORAGE_CRATES.to_vec(),
            Self::Outbound => WEB_CRATES.to_vec(),
        }
    }
}

fn check(file: &Path, layer: Layer, parsed: &syn::File) -> Vec<Violation> {
    let mut paths = PathCollector::default();
    paths.visit_file(parsed);

    let modules = layer.forbidden_modules();
    let crates = layer.forbidden_crates();
    let mut messages = BTreeSet::new();
    for segments in &paths.0 {
        if let Some(root) = internal_root(segments).filter(|root| modules.iter().any(|m| m == root)) {
            messages.insert(format!("{} must not depend on crate::{root}", layer.dir()));
        }
        if let Some(root) = external_root(segments).filter(|root| crates.iter().any(|c| c == root)) {
            messages.insert(format!(
                "{} must not depend on external crate `{root}`",
                layer.dir()
            ));
        }
    }
    messages
        .into_iter()
        .map(|message| Violation {
            file: file.to_path_buf(),
            message,
        })
        .collect()
}

fn is_relative(segment: &str) -> bool {
    matches!(segment, "crate" | "self" | "super")
}

/// First module below `crate`, `super` chains or the library name.
fn internal_root(segments: &[String]) -> Option<&str> {
    let first = segments.first()?.as_str();
    let index = if is_relative(first) {
        segments.iter().position(|segment| !is_relative(segment))?
    } else if first == CRATE_NAME {
        1
    } else {
        return Layer::ALL
            .iter()
            .any(|layer| layer.dir() == first)
            .then_some(first);
    };
    segments.get(index).map(String::as_str)
}

fn external_root(segments: &[String]) -> Option<&str> {
    let root = segments.first()?.as_str();
    (!is_relative(root) && root != CRATE_NAME).then_some(root)
}

#[derive(Default)]
struct PathCollector(BTreeSet<Vec<String>>);

impl PathCollector {
    fn use_tree(&mut self, tree: &syn::UseTree, mut prefix: Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.use_tree(&path.tree, prefix);
            }
            syn::UseTree::Name(name) => {
                prefix.push(name.ident.to_string());
                self.0.insert(prefix);
            }
            syn::UseTree::Rename(rename) => {
                prefix.push(rename.ident.to_string());
                self.0.insert(prefix);
            }
            syn::UseTree::Glob(_) => {
                prefix.push("*".to_owned());
                self.0.insert(prefix);
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.use_tree(item, prefix.clone());
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Vec<String> = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        if !segments.is_empty() {
            self.0.insert(segments);
        }
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.use_tree(&node.tree, Vec::new());
    }
}

fn collect_sources(
    src_root: &Path,
    dir: &Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_sources(src_root, &path, sources)?;
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("rs") {
            continue;
        }
        let file = path
            .strip_prefix(src_root)
            .map_err(|err| ArchitectureLintError::Parse {
                file: path.clone(),
                message: err.to_string(),
            })?
            .to_path_buf();
        let contents = fs::read_to_string(&path)?;
        sources.push(LintSource { file, contents });
    }
    Ok(())
}

#[cfg(test)]
mod tests;
