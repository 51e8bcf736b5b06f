//! MG-012: `msgp` executable as the codec generator.

use super::local::exec_command;
use super::{CodecGenerator, ExecOutput};
use crate::core::types::GenMode;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct MsgpCommand {
    pub program: String,
}

impl MsgpCommand {
    pub fn new(program: &str) -> Self {
        MsgpCommand {
            program: program.to_string(),
        }
    }

    /// Command-line arguments for one invocation.
    pub fn args(input: &Path, output: &Path, mode: GenMode, unexported: bool) -> Vec<String> {
        let io = mode.contains(GenMode::ENCODE) || mode.contains(GenMode::DECODE);
        let marshal = mode.contains(GenMode::MARSHAL) || mode.contains(GenMode::UNMARSHAL);
        let mut args = vec![
            "-file".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
            format!("-io={}", io),
            format!("-marshal={}", marshal),
            format!("-tests={}", mode.contains(GenMode::TEST)),
        ];
        if unexported {
            args.push("-unexported".to_string());
        }
        args
    }
}

impl CodecGenerator for MsgpCommand {
    fn generate(
        &self,
        input: &Path,
        output: &Path,
        mode: GenMode,
        unexported: bool,
    ) -> Result<ExecOutput, String> {
        let args = Self::args(input, output, mode, unexported);
        let cwd = input.parent().filter(|p| !p.as_os_str().is_empty());
        let out = exec_command(&self.program, &args, cwd, None)?;
        if !out.success() && out.stderr.is_empty() {
            return Err(format!(
                "{} exited with code {}: {}",
                self.program,
                out.exit_code,
                out.stdout.trim()
            ));
        }
        Ok(out)
    }
}
