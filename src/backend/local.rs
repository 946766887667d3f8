//! Local model CLI backend (`ollama run <model> <prompt>`).

use std::process::Command;
use std::time::Duration;
use tracing::info;

use crate::backend::Generate;
use crate::collect::runner::{self, Execution};
use crate::report::prompt::Prompt;
use crate::utils::{BackendError, BackendKind};

pub const DEFAULT_PROGRAM: &str = "ollama";
pub const DEFAULT_MODEL: &str = "llama2";

pub struct LocalCli {
    program: String,
    model: String,
    timeout: Duration,
}

impl LocalCli {
    pub fn new(program: &str, model: &str, timeout: Duration) -> Self {
        Self { program: program.to_string(), model: model.to_string(), timeout }
    }

    fn unavailable(&self, reason: String) -> BackendError {
        BackendError::Unavailable { backend: BackendKind::Local, reason }
    }
}

impl Generate for LocalCli {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn generate(&self, prompt: &Prompt) -> Result<String, BackendError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("run").arg(&self.model).arg(prompt.text());

        info!(program = %self.program, model = %self.model, "running local model");
        let exec = runner::execute(cmd, self.timeout)
            .map_err(|e| self.unavailable(format!("{}: {}", self.program, e)))?;

        match exec {
            Execution::TimedOut => Err(BackendError::Timeout {
                backend: BackendKind::Local,
                after: self.timeout,
            }),
            Execution::Completed { stdout, stderr, exit_code } => {
                let text = stdout.trim();
                if text.is_empty() {
                    // 没有输出就没有报告，不论退出码
                    return Err(self.unavailable(format!(
                        "{} exited with {:?} and no output: {}",
                        self.program,
                        exit_code,
                        stderr.trim()
                    )));
                }
                Ok(text.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::prompt::{build, TemplateKind};
    use crate::utils::{DiagnosticPayload, Payload};
    use chrono::Utc;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn prompt() -> Prompt {
        let payload =
            Payload::Diagnostics(DiagnosticPayload { collected_at: Utc::now(), entries: vec![] });
        build(&payload, TemplateKind::Troubleshoot)
    }

    /// Writes an executable stand-in for the model CLI.
    fn fake_cli(name: &str, script: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("agentops-local-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("fake-ollama");
        fs::write(&path, format!("#!/bin/sh\n{}\n", script)).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    #[test]
    fn test_passes_model_and_prompt_returns_trimmed_stdout() {
        let cli = fake_cli(
            "echo",
            r#"echo "  $1 $2 words=$(printf '%s' "$3" | wc -w)  "; echo noise >&2"#,
        );
        let out = LocalCli::new(cli.to_str().expect("path"), "llama2", Duration::from_secs(5))
            .generate(&prompt())
            .expect("generate");
        assert!(out.starts_with("run llama2 words="));
        assert!(!out.contains("noise"));
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let err = LocalCli::new("/nonexistent/ollama", "llama2", Duration::from_secs(1))
            .generate(&prompt())
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable { backend: BackendKind::Local, .. }));
    }

    #[test]
    fn test_hang_is_timeout() {
        let cli = fake_cli("hang", "sleep 5");
        let err = LocalCli::new(cli.to_str().expect("path"), "llama2", Duration::from_millis(200))
            .generate(&prompt())
            .unwrap_err();
        assert!(matches!(err, BackendError::Timeout { backend: BackendKind::Local, .. }));
    }

    #[test]
    fn test_silent_failure_is_unavailable() {
        let cli = fake_cli("fail", "echo 'model not found' >&2; exit 1");
        let err = LocalCli::new(cli.to_str().expect("path"), "llama2", Duration::from_secs(5))
            .generate(&prompt())
            .unwrap_err();
        match err {
            BackendError::Unavailable { reason, .. } => assert!(reason.contains("model not found")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
