//! Links the emitted object with the runtime through the system C driver.
//!
//! Everything is written inside a temporary directory next to the output and
//! the finished executable is renamed into place, so a failed or cancelled
//! link never leaves a partial file at `output`.

use std::fs;
use std::path::Path;
use std::process::Command;

use compiler_core::{CancellationToken, CodeGenError, debug_log};

use crate::runtime::RUNTIME_OBJECT;

pub fn link(object: &[u8], output: &Path, linker: &str, cancel: &CancellationToken) -> Result<(), CodeGenError> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let workspace = tempfile::Builder::new().prefix(".tl-link").tempdir_in(dir)?;
    let program_object = workspace.path().join("program.o");
    let runtime_object = workspace.path().join("tl_rt.o");
    fs::write(&program_object, object)?;
    fs::write(&runtime_object, RUNTIME_OBJECT)?;

    let staged = tempfile::Builder::new().prefix(".tl-out").tempfile_in(dir)?;
    debug_log!("link", "{linker} -> {}", staged.path().display());
    let result = Command::new(linker)
        .arg(&program_object)
        .arg(&runtime_object)
        .arg("-o")
        .arg(staged.path())
        .arg("-lm")
        .output()
        .map_err(|e| CodeGenError::Link(format!("could not run `{linker}`: {e}")))?;
    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
        return Err(CodeGenError::Link(if stderr.is_empty() {
            format!("`{linker}` exited with {}", result.status)
        } else {
            stderr
        }));
    }

    if cancel.is_cancelled() {
        return Err(CodeGenError::Cancelled);
    }
    make_executable(staged.path())?;
    staged.persist(output).map_err(|e| CodeGenError::Io(e.error))?;
    debug_log!("link", "wrote {}", output.display());
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), CodeGenError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), CodeGenError> {
    Ok(())
}
