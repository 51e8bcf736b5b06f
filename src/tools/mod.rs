//! MG-012: External tools — codec generator and imports tidier.
//!
//! The orchestrator talks to both through traits so tests can substitute
//! in-process stubs for the real executables.

pub mod goimports;
pub mod local;
pub mod msgp;

use crate::core::types::GenMode;
use std::path::Path;
use std::sync::Mutex;

/// Output from running a tool.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Generates serialization code for every type in `input`, writing the
/// result to `output` (and `<output base>_test.go` when `mode` has `TEST`).
pub trait CodecGenerator {
    fn generate(
        &self,
        input: &Path,
        output: &Path,
        mode: GenMode,
        unexported: bool,
    ) -> Result<ExecOutput, String>;
}

/// Fixes the import block of a Go source file.
pub trait ImportTidier {
    fn tidy(&self, path: &Path, src: &[u8]) -> Result<Vec<u8>, String>;
}

static GENERATOR_LOCK: Mutex<()> = Mutex::new(());

/// Run the generator inside a process-wide critical section. Generators
/// may write to shared process state, so only one runs at a time.
pub fn run_generator(
    generator: &dyn CodecGenerator,
    input: &Path,
    output: &Path,
    mode: GenMode,
    unexported: bool,
) -> Result<ExecOutput, String> {
    let _guard = GENERATOR_LOCK
        .lock()
        .map_err(|e| format!("codec generator lock poisoned: {}", e))?;
    generator.generate(input, output, mode, unexported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        active: Arc<AtomicUsize>,
        max: Arc<AtomicUsize>,
    }

    impl CodecGenerator for Counting {
        fn generate(&self, _: &Path, _: &Path, _: GenMode, _: bool) -> Result<ExecOutput, String> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(ExecOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    #[test]
    fn test_mg012_exec_output_success() {
        let ok = ExecOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(ok.success());
        let failed = ExecOutput { exit_code: 2, ..ok };
        assert!(!failed.success());
    }

    #[test]
    fn test_mg012_generator_runs_exclusively() {
        let active = Arc::new(AtomicUsize::new(0));
        let max = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gen = Counting {
                    active: Arc::clone(&active),
                    max: Arc::clone(&max),
                };
                std::thread::spawn(move || {
                    run_generator(&gen, Path::new("in.go"), Path::new("out.go"), GenMode::SIZE, false)
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max.load(Ordering::SeqCst), 1);
    }
}
