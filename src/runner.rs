use crate::{
    error::GradCheckError,
    tool_overrides::{Tool, resolve_tool_executable},
};
use std::{
    io::ErrorKind,
    process::{Command, Output},
};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external commands synchronously, appending the shared MRtrix flags.
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    nthreads: Option<usize>,
    quiet: bool,
}

impl ToolRunner {
    pub fn new(nthreads: Option<usize>, quiet: bool) -> Self {
        Self { nthreads, quiet }
    }

    pub fn command_args(&self, args: &[String]) -> Vec<String> {
        let mut full = args.to_vec();
        if let Some(n) = self.nthreads {
            full.push("-nthreads".to_string());
            full.push(n.to_string());
        }
        if self.quiet {
            full.push("-quiet".to_string());
        }
        full
    }

    pub fn run(&self, tool: Tool, args: &[String]) -> Result<ToolOutput, GradCheckError> {
        let executable = resolve_tool_executable(tool);
        let args = self.command_args(args);
        debug!(command = %format!("{} {}", executable, args.join(" ")), "running external tool");
        let output = spawn(&executable, &args, tool)?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(GradCheckError::ExternalTool {
                executable,
                args,
                status: output.status.code(),
                stderr,
            });
        }
        Ok(ToolOutput { stdout, stderr })
    }
}

fn spawn(executable: &str, args: &[String], tool: Tool) -> Result<Output, GradCheckError> {
    Command::new(executable).args(args).output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            GradCheckError::ToolNotFound {
                executable: executable.to_string(),
                env_var: tool.env_var().to_string(),
            }
        } else {
            GradCheckError::ExternalTool {
                executable: executable.to_string(),
                args: args.to_vec(),
                status: None,
                stderr: format!("could not start process: {e}"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_flags_are_appended() {
        let runner = ToolRunner::new(Some(4), true);
        let args = runner.command_args(&["in.mif".to_string(), "-size".to_string()]);
        assert_eq!(args, vec!["in.mif", "-size", "-nthreads", "4", "-quiet"]);
        assert_eq!(
            ToolRunner::default().command_args(&["x".to_string()]),
            vec!["x"]
        );
    }
}
