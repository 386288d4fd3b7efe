//! A solc binary driven over its `--standard-json` interface.

use std::io::Write;
use std::process::{Command, Stdio};

use super::{Compiler, CompilerInput, CompilerOutput};

/// Handle to one solc executable. The version is probed once, when the
/// handle is created.
pub struct SolcCompiler {
    command: String,
    version: String,
}

impl SolcCompiler {
    /// Run `<command> --version` and build a handle for the binary.
    pub fn probe(command: &str) -> Result<SolcCompiler, String> {
        let output = Command::new(command)
            .arg("--version")
            .output()
            .map_err(|e| format!("cannot run '{} --version': {}", command, e))?;
        if !output.status.success() {
            return Err(format!(
                "'{} --version' exited with {}",
                command, output.status
            ));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let version = parse_version(&text)
            .ok_or_else(|| format!("unrecognized version output from '{}'", command))?;
        Ok(SolcCompiler {
            command: command.to_string(),
            version,
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// Extract `0.8.21` from solc's `Version: 0.8.21+commit.d9974bed...` line.
fn parse_version(text: &str) -> Option<String> {
    let line = text
        .lines()
        .find(|line| line.trim_start().starts_with("Version:"))?;
    let rest = line.trim_start().strip_prefix("Version:")?.trim();
    let core: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if core.is_empty() {
        None
    } else {
        Some(core)
    }
}

impl Compiler for SolcCompiler {
    fn version(&self) -> &str {
        &self.version
    }

    fn compile(&self, input: &CompilerInput) -> Result<CompilerOutput, String> {
        let payload =
            serde_json::to_string(input).map_err(|e| format!("encode compiler input: {}", e))?;

        let mut child = Command::new(&self.command)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("cannot spawn '{}': {}", self.command, e))?;

        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| format!("no stdin pipe to '{}'", self.command))?;
            stdin
                .write_all(payload.as_bytes())
                .map_err(|e| format!("write to '{}': {}", self.command, e))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| format!("wait for '{}': {}", self.command, e))?;
        if !output.status.success() {
            return Err(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("malformed output from '{}': {}", self.command, e))
    }
}
