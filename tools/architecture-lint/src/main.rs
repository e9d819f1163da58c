//! Command-line entry point: lints `backend/src` of the enclosing workspace.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    let Some(root) = workspace_root() else {
        let _ = writeln!(
            io::stderr().lock(),
            "no workspace Cargo.toml found above the current directory"
        );
        return ExitCode::FAILURE;
    };
    match architecture_lint::lint_backend_sources(&root.join("backend")) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(io::stderr().lock(), "{err}");
            ExitCode::FAILURE
        }
    }
}

/// First ancestor of the working directory, then of this manifest, whose
/// `Cargo.toml` declares a workspace.
fn workspace_root() -> Option<PathBuf> {
    let starts = [
        std::env::current_dir().ok(),
        Some(PathBuf::from(env!("CARGO_MANIFEST_DIR"))),
    ];
    starts
        .into_iter()
        .flatten()
        .find_map(|start| start.ancestors().find(|dir| is_workspace(dir)).map(Path::to_path_buf))
}

fn is_workspace(dir: &Path) -> bool {
    std::fs::read_to_string(dir.join("Cargo.toml"))
        .is_ok_and(|manifest| manifest.contains("[workspace]"))
}
