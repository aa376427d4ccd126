//! Command hooks run after accepted changes
//!
//! Each configured command line is split on whitespace into a program and
//! its arguments and executed as a subprocess. Commands run in order; the
//! first failure stops the run and is returned as [`Error::HookFailed`].
//! A cancelled token kills the running command.

use std::collections::HashMap;
use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::event::ChangeEvent;
use crate::{Error, Result};

/// Variables exported to hook commands and substituted in their arguments
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    pub vars: HashMap<String, String>,
}

impl HookContext {
    /// Context describing one accepted change.
    pub fn for_event(event: &ChangeEvent) -> Self {
        let mut vars = HashMap::new();
        vars.insert("DIRMIRROR_PATH".to_string(), event.target.to_string());
        vars.insert("DIRMIRROR_BACKUP_PATH".to_string(), event.backup.to_string());
        vars.insert("DIRMIRROR_OP".to_string(), event.op.to_string());
        Self { vars }
    }
}

/// Result of running a single command
#[derive(Debug, Clone)]
pub struct HookResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl HookResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Ordered command lines executed for every accepted change
#[derive(Debug, Clone, Default)]
pub struct CommandHook {
    commands: Vec<String>,
}

impl CommandHook {
    /// Blank command lines are dropped.
    pub fn new(commands: impl IntoIterator<Item = String>) -> Self {
        Self {
            commands: commands
                .into_iter()
                .filter(|line| !line.trim().is_empty())
                .collect(),
        }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run every command in order and concatenate their stdout.
    pub async fn run(&self, context: &HookContext, cancel: &CancellationToken) -> Result<String> {
        let results = self.run_all(context, cancel).await?;
        Ok(results.into_iter().map(|r| r.stdout).collect())
    }

    /// Run every command in order, stopping at the first failure.
    pub async fn run_all(
        &self,
        context: &HookContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<HookResult>> {
        let mut results = Vec::with_capacity(self.commands.len());

        for line in &self.commands {
            let result = execute(line, context, cancel).await?;
            if !result.success() {
                let stderr_snippet = result.stderr.trim();
                let message = if stderr_snippet.is_empty() {
                    format!("exited with status {:?}", result.exit_code)
                } else {
                    format!("exited with status {:?}: {}", result.exit_code, stderr_snippet)
                };
                return Err(Error::HookFailed {
                    command: line.clone(),
                    message,
                });
            }
            results.push(result);
        }

        Ok(results)
    }
}

async fn execute(
    line: &str,
    context: &HookContext,
    cancel: &CancellationToken,
) -> Result<HookResult> {
    let mut parts = line.split_whitespace().map(|part| substitute_vars(part, &context.vars));
    let Some(program) = parts.next() else {
        return Err(Error::HookFailed {
            command: line.to_string(),
            message: "empty command line".into(),
        });
    };

    let mut command = Command::new(&program);
    command
        .args(parts)
        .envs(&context.vars)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(command = %line, "running hook");
    let child = command.spawn().map_err(|e| Error::HookFailed {
        command: line.to_string(),
        message: e.to_string(),
    })?;

    let output = tokio::select! {
        output = child.wait_with_output() => output?,
        () = cancel.cancelled() => {
            return Err(Error::HookCancelled { command: line.to_string() });
        }
    };

    Ok(HookResult {
        command: line.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    })
}

/// Substitute `${VAR_NAME}` patterns with context variables.
fn substitute_vars(input: &str, vars: &HashMap<String, String>) -> String {
    let mut result = input.to_string();
    for (key, value) in vars {
        let pattern = format!("${{{}}}", key);
        result = result.replace(&pattern, value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_vars() {
        let mut vars = HashMap::new();
        vars.insert("DIRMIRROR_OP".to_string(), "modify".to_string());

        assert_eq!(substitute_vars("op=${DIRMIRROR_OP}", &vars), "op=modify");
        assert_eq!(substitute_vars("plain", &vars), "plain");
    }

    #[test]
    fn test_blank_lines_dropped() {
        let hook = CommandHook::new(vec!["echo a".into(), "   ".into(), String::new()]);
        assert_eq!(hook.commands(), ["echo a".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_outputs_concatenated_in_order() {
        let hook = CommandHook::new(vec!["echo one".into(), "echo two".into()]);
        let out = hook
            .run(&HookContext::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, "one\ntwo\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_stops_run() {
        let hook = CommandHook::new(vec!["false".into(), "echo never".into()]);
        let err = hook
            .run_all(&HookContext::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HookFailed { ref command, .. } if command == "false"));
    }

    #[tokio::test]
    async fn test_missing_program_is_hook_failure() {
        let hook = CommandHook::new(vec!["definitely-not-a-real-program-4821".into()]);
        let err = hook
            .run(&HookContext::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HookFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_kills_running_command() {
        let hook = CommandHook::new(vec!["sleep 30".into()]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = hook.run(&HookContext::default(), &cancel).await.unwrap_err();
        assert!(matches!(err, Error::HookCancelled { .. }));
    }
}
