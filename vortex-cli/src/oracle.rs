use std::io::Write;
use std::process::{Command, Stdio};

use vortex_core::{Oracle, OracleError};

/// Oracle backed by an external program: prompt on stdin, reply on stdout.
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
}

impl CommandOracle {
    /// Splits a command line on whitespace; no shell quoting.
    pub fn parse(command_line: &str) -> Option<CommandOracle> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(CommandOracle {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Oracle for CommandOracle {
    fn query(&mut self, prompt: &str) -> Result<String, OracleError> {
        let unavailable =
            |e: std::io::Error| OracleError::Unavailable(format!("{}: {e}", self.program));

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(unavailable)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).map_err(unavailable)?;
        }
        let output = child.wait_with_output().map_err(unavailable)?;

        if !output.status.success() {
            return Err(OracleError::Unavailable(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| OracleError::Unavailable(format!("{}: non-utf8 reply: {e}", self.program)))
    }
}
