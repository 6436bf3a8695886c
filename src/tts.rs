use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::TtsCommand;
use crate::error::{LexreelError, LexreelResult};

/// External speech synthesis collaborator.
///
/// Implementations produce one audio file per call; the pipeline treats
/// the process as opaque and only checks that the output file appears.
pub trait SpeechSynthesizer {
    fn synthesize(&self, text: &str, out_path: &Path) -> LexreelResult<()>;
}

/// Substitute `{text}` and `{out}` placeholders in an argv template.
pub fn substitute_args(args: &[String], text: &str, out: &str) -> Vec<String> {
    args.iter()
        .map(|a| a.replace("{text}", text).replace("{out}", out))
        .collect()
}

/// Synthesizer backed by a configured command template.
///
/// Voice, language, and rate are baked into the template's arguments, so
/// one `CommandSynthesizer` exists per language side.
pub struct CommandSynthesizer {
    command: TtsCommand,
}

impl CommandSynthesizer {
    pub fn new(command: TtsCommand) -> LexreelResult<Self> {
        command.validate()?;
        Ok(Self { command })
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn synthesize(&self, text: &str, out_path: &Path) -> LexreelResult<()> {
        let out = out_path.to_string_lossy();
        let args = substitute_args(&self.command.args, text, &out);
        debug!(program = %self.command.program, ?args, "tts invocation");

        let output = Command::new(&self.command.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                LexreelError::synthesis(format!(
                    "failed to spawn '{}' (is it installed and on PATH?): {e}",
                    self.command.program
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LexreelError::synthesis(format!(
                "'{}' exited with status {}: {}",
                self.command.program,
                output.status,
                stderr.trim()
            )));
        }
        if !out_path.is_file() {
            return Err(LexreelError::synthesis(format!(
                "'{}' reported success but wrote no file at '{}'",
                self.command.program,
                out_path.display()
            )));
        }
        Ok(())
    }
}
