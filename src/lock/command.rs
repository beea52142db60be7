//! Shell execution of lock file commands
//!
//! A command string may span several lines. Lines ending in `\` continue on
//! the next line, lines ending in `|` pipe into the next line, and any other
//! line break starts a new command. Commands run in order and the output of
//! the last one is returned.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tokio::process::Command as AsyncCommand;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no commands provided")]
    Empty,

    #[error("failed to start {shell}: {source}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for command: {0}")]
    Wait(#[source] std::io::Error),

    #[error("command timed out after {0}s")]
    TimedOut(u64),

    #[error("command exited with {status}: {stderr}")]
    Failed {
        status: String,
        stderr: String,
        stdout: Vec<u8>,
    },
}

impl CommandError {
    /// Whatever the command printed before failing
    pub fn output(&self) -> &[u8] {
        match self {
            CommandError::Failed { stdout, .. } => stdout,
            _ => &[],
        }
    }
}

/// Everything needed to run a lock file command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandRequest {
    pub commands: String,
    pub env: HashMap<String, String>,
    pub work_dir: PathBuf,
    pub timeout: Duration,
    /// `{{key}}` substitutions, shell-escaped before use
    pub placeholders: HashMap<String, String>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Stdout of the last command
    async fn run(&self, request: CommandRequest) -> Result<Vec<u8>, CommandError>;
}

/// Runs commands through `$SHELL -c`, falling back to `sh -c`
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner {
    shell: Option<String>,
}

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: Some(shell.into()),
        }
    }

    fn shell(&self) -> String {
        self.shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "sh".to_string())
    }

    async fn run_line(&self, line: &str, request: &CommandRequest) -> Result<Vec<u8>, CommandError> {
        let shell = self.shell();
        trace!("Running {} -c {:?} in {}", shell, line, request.work_dir.display());

        let mut command = AsyncCommand::new(&shell);
        command
            .arg("-c")
            .arg(line)
            .envs(&request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !request.work_dir.as_os_str().is_empty() {
            command.current_dir(&request.work_dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| CommandError::Spawn {
            shell: shell.clone(),
            source,
        })?;
        let pid = child.id();

        let output = match timeout(request.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(CommandError::Wait)?,
            Err(_) => {
                warn!("Command timed out after {:?}: {}", request.timeout, line);
                kill_process_group(pid);
                return Err(CommandError::TimedOut(request.timeout.as_secs()));
            }
        };

        if output.status.success() {
            return Ok(output.stdout);
        }

        Err(CommandError::Failed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            stdout: output.stdout,
        })
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, request: CommandRequest) -> Result<Vec<u8>, CommandError> {
        if request.commands.trim().is_empty() {
            return Err(CommandError::Empty);
        }

        let commands = apply_placeholders(&request.commands, &request.placeholders);
        let lines = split_command_lines(&commands);
        debug!("Running {} command(s) in {}", lines.len(), request.work_dir.display());

        let mut last_output = Vec::new();
        for line in &lines {
            last_output = self.run_line(line, &request).await?;
        }
        Ok(last_output)
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    // the direct child is also killed on drop; this reaches its descendants
    let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL)
        .inspect_err(|e| debug!("Failed to kill process group {}: {}", pid, e));
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Replace `{{key}}` with the shell-escaped value
pub fn apply_placeholders(commands: &str, placeholders: &HashMap<String, String>) -> String {
    placeholders
        .iter()
        .fold(commands.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{{{key}}}}}"), &shell_escape(value))
        })
}

/// Quote `value` for a POSIX shell, leaving plain words unquoted
pub fn shell_escape(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }

    if value.chars().all(is_shell_safe) {
        return value.to_string();
    }

    format!("'{}'", value.replace('\'', r"'\''"))
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '@' | ':' | '+' | '=')
}

/// Join continuations and pipe chains into one shell line per command
pub fn split_command_lines(commands: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending = String::new();

    for line in commands.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(continued) = line.strip_suffix('\\') {
            pending.push_str(continued.trim_end());
            pending.push(' ');
            continue;
        }

        pending.push_str(line);
        if pending.ends_with('|') {
            pending.push(' ');
            continue;
        }

        lines.push(std::mem::take(&mut pending).trim().to_string());
    }

    let rest = pending.trim().trim_end_matches('|').trim();
    if !rest.is_empty() {
        lines.push(rest.to_string());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn request(commands: &str) -> CommandRequest {
        CommandRequest {
            commands: commands.to_string(),
            timeout: Duration::from_secs(10),
            ..Default::default()
        }
    }

    fn runner() -> ShellCommandRunner {
        ShellCommandRunner::with_shell("sh")
    }

    #[rstest]
    #[case("", "''")]
    #[case("package-lock.json", "package-lock.json")]
    #[case("/tmp/dir/go.sum", "/tmp/dir/go.sum")]
    #[case("my file", "'my file'")]
    #[case("a;rm -rf /", "'a;rm -rf /'")]
    #[case("it's", r"'it'\''s'")]
    #[case("$(whoami)", "'$(whoami)'")]
    fn test_shell_escape(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(shell_escape(input), expected);
    }

    #[test]
    fn apply_placeholders_escapes_values() {
        let placeholders = HashMap::from([
            ("lock_file".to_string(), "/tmp/my dir/package-lock.json".to_string()),
            ("base_dir".to_string(), "/tmp".to_string()),
        ]);
        assert_eq!(
            apply_placeholders("cat {{lock_file}} && ls {{base_dir}} {{unknown}}", &placeholders),
            "cat '/tmp/my dir/package-lock.json' && ls /tmp {{unknown}}"
        );
    }

    #[rstest]
    #[case("npm ls --json", &["npm ls --json"])]
    #[case("echo a\necho b", &["echo a", "echo b"])]
    #[case("npm ls \\\n  --json \\\n  --depth=0", &["npm ls --json --depth=0"])]
    #[case("cat file |\n  grep x |\n  sort", &["cat file | grep x | sort"])]
    #[case("cat file | sort\r\n\r\necho done", &["cat file | sort", "echo done"])]
    #[case("echo dangling |", &["echo dangling"])]
    #[case("  \n\n ", &[])]
    fn test_split_command_lines(#[case] commands: &str, #[case] expected: &[&str]) {
        assert_eq!(split_command_lines(commands), expected);
    }

    #[tokio::test]
    async fn run_returns_output_of_last_command() {
        let output = runner().run(request("echo first\necho second")).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&output).trim(), "second");
    }

    #[tokio::test]
    async fn run_pipes_and_substitutes() {
        let mut req = request("echo {{value}} |\n tr a-z A-Z");
        req.placeholders.insert("value".to_string(), "hello world".to_string());
        let output = runner().run(req).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&output).trim(), "HELLO WORLD");
    }

    #[tokio::test]
    async fn run_uses_env_and_work_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();

        let mut req = request("echo $LOCK_TEST_VALUE && ls");
        req.env.insert("LOCK_TEST_VALUE".to_string(), "from-env".to_string());
        req.work_dir = dir.path().to_path_buf();

        let output = runner().run(req).await.unwrap();
        let output = String::from_utf8_lossy(&output);
        assert!(output.contains("from-env"));
        assert!(output.contains("marker.txt"));
    }

    #[tokio::test]
    async fn run_keeps_output_of_failed_command() {
        let err = runner()
            .run(request("echo '{\"lodash\": \"4.17.21\"}'; echo broken >&2; exit 1"))
            .await
            .unwrap_err();

        let CommandError::Failed { ref stderr, .. } = err else {
            panic!("expected Failed, got {err:?}");
        };
        assert_eq!(stderr, "broken");
        assert!(String::from_utf8_lossy(err.output()).contains("lodash"));
    }

    #[tokio::test]
    async fn run_rejects_empty_commands() {
        assert!(matches!(runner().run(request("  \n ")).await, Err(CommandError::Empty)));
    }

    #[tokio::test]
    async fn run_times_out() {
        let mut req = request("sleep 5");
        req.timeout = Duration::from_millis(200);

        let started = std::time::Instant::now();
        let err = runner().run(req).await.unwrap_err();
        assert!(matches!(err, CommandError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
