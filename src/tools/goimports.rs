//! MG-012: `goimports` executable as the imports tidier.

use super::local::exec_command;
use super::ImportTidier;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct GoimportsCommand {
    pub program: String,
}

impl GoimportsCommand {
    pub fn new(program: &str) -> Self {
        GoimportsCommand {
            program: program.to_string(),
        }
    }
}

impl ImportTidier for GoimportsCommand {
    /// Pipe `src` through the tidier; `path`'s directory resolves local imports.
    fn tidy(&self, path: &Path, src: &[u8]) -> Result<Vec<u8>, String> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let args = vec!["-srcdir".to_string(), dir.display().to_string()];
        let out = exec_command(&self.program, &args, None, Some(src))?;
        if !out.success() {
            return Err(format!(
                "{} failed for {}: {}",
                self.program,
                path.display(),
                out.stderr.trim()
            ));
        }
        Ok(out.stdout.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, body: &str) -> String {
        let path = dir.join("tidy.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_mg012_tidy_pipes_source() {
        let dir = tempfile::tempdir().unwrap();
        let tidier = GoimportsCommand::new(&script(dir.path(), "test \"$1\" = -srcdir || exit 3\ncat"));
        let out = tidier
            .tidy(&dir.path().join("x.go"), b"package p\n")
            .unwrap();
        assert_eq!(out, b"package p\n");
    }

    #[test]
    fn test_mg012_tidy_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tidier = GoimportsCommand::new(&script(dir.path(), "cat >/dev/null\necho bad import >&2\nexit 1"));
        let err = tidier
            .tidy(Path::new("/tmp/x.go"), b"package p\n")
            .unwrap_err();
        assert!(err.contains("failed for /tmp/x.go: bad import"));
    }
}
