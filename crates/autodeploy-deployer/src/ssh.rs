//! ssh deployer implementation.

use async_trait::async_trait;
use autodeploy_config::RemoteConfig;
use autodeploy_core::log_target;
use autodeploy_core::{DeployError, DeployOutcome, Deployer, PushEvent};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs `cd <workdir> && ./<script>` on the remote host over ssh.
///
/// Remote stdout goes to the deploy log line by line as it arrives; stderr is
/// collected and handed back on failure.
pub struct SshDeployer {
    program: String,
    options: Vec<String>,
    destination: String,
    remote_command: String,
    timeout: Duration,
}

impl SshDeployer {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            program: config.ssh_program.clone(),
            options: config.ssh_options.clone(),
            destination: config.destination(),
            remote_command: config.remote_command(),
            timeout: config.timeout,
        }
    }

    /// Arguments passed to the ssh binary.
    ///
    /// `BatchMode=yes` keeps ssh from ever prompting.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
        for option in &self.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }
        args.push(self.destination.clone());
        args.push(self.remote_command.clone());
        args
    }

    async fn run(&self, event: &PushEvent) -> DeployOutcome {
        debug!(program = %self.program, args = ?self.args(), "Spawning ssh");

        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // stderr is drained alongside stdout so a chatty script cannot fill
        // the pipe. Both reads live in this future and stop when it is
        // dropped on timeout.
        let stream_stdout = async {
            let Some(stdout) = stdout else { return };
            let mut lines = BufReader::new(stdout).split(b'\n');
            loop {
                match lines.next_segment().await {
                    Ok(Some(line)) => {
                        info!(
                            target: log_target::DEPLOYS,
                            event_id = %event.id,
                            "{}",
                            String::from_utf8_lossy(&line).trim_end()
                        );
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Error reading ssh stdout");
                        break;
                    }
                }
            }
        };

        let collect_stderr = async {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                if let Err(e) = stderr.read_to_end(&mut buf).await {
                    warn!(error = %e, "Error reading ssh stderr");
                }
            }
            String::from_utf8_lossy(&buf).into_owned()
        };

        let ((), stderr) = tokio::join!(stream_stdout, collect_stderr);
        let status = child.wait().await?;

        if status.success() {
            Ok(())
        } else {
            Err(DeployError::Exited {
                code: status.code(),
                stderr,
            })
        }
    }
}

#[async_trait]
impl Deployer for SshDeployer {
    fn name(&self) -> &'static str {
        "ssh"
    }

    async fn deploy(&self, event: &PushEvent) -> DeployOutcome {
        info!(
            destination = %self.destination,
            command = %self.remote_command,
            timeout_secs = self.timeout.as_secs(),
            "Running remote deploy"
        );

        // Dropping `run` on timeout drops the child, which kills ssh.
        match tokio::time::timeout(self.timeout, self.run(event)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DeployError::TimedOut(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodeploy_core::parse_event;

    fn event() -> PushEvent {
        let body = serde_json::to_vec(&serde_json::json!({
            "ref": "refs/heads/master",
            "repository": { "name": "Nettverksdagen-2" },
        }))
        .unwrap();
        parse_event(Some("push"), &body, None).unwrap()
    }

    #[test]
    fn test_args() {
        let config = RemoteConfig {
            ssh_options: vec!["StrictHostKeyChecking=yes".to_string()],
            ..RemoteConfig::default()
        };
        let deployer = SshDeployer::new(&config);

        assert_eq!(
            deployer.args(),
            vec![
                "-o",
                "BatchMode=yes",
                "-o",
                "StrictHostKeyChecking=yes",
                "sigtot@nvdagen.no",
                "cd ~/Nettverksdagen-2 && ./autodeploy.sh",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let config = RemoteConfig {
            ssh_program: "/nonexistent/autodeploy-test-ssh".to_string(),
            ..RemoteConfig::default()
        };
        let result = SshDeployer::new(&config).deploy(&event()).await;
        assert!(matches!(result, Err(DeployError::Spawn(_))));
    }

    #[cfg(unix)]
    mod fake_ssh {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;
        use tempfile::TempDir;

        /// Writes an executable shell script that stands in for ssh.
        fn fake_ssh(dir: &TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("ssh");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn deployer(program: PathBuf, timeout: Duration) -> SshDeployer {
            let config = RemoteConfig {
                ssh_program: program.to_string_lossy().into_owned(),
                timeout,
                ..RemoteConfig::default()
            };
            SshDeployer::new(&config)
        }

        #[tokio::test]
        async fn test_successful_deploy() {
            let dir = TempDir::new().unwrap();
            let program = fake_ssh(&dir, "echo \"connecting to $3\"\necho done\nexit 0");

            let result = deployer(program, Duration::from_secs(10))
                .deploy(&event())
                .await;
            assert!(result.is_ok(), "unexpected failure: {result:?}");
        }

        #[tokio::test]
        async fn test_failed_deploy_captures_stderr() {
            let dir = TempDir::new().unwrap();
            let program = fake_ssh(&dir, "echo starting\necho 'npm ERR! build failed' >&2\nexit 3");

            let err = deployer(program, Duration::from_secs(10))
                .deploy(&event())
                .await
                .unwrap_err();

            match &err {
                DeployError::Exited { code, stderr } => {
                    assert_eq!(*code, Some(3));
                    assert!(stderr.contains("npm ERR! build failed"));
                }
                other => panic!("expected Exited, got {other:?}"),
            }
            assert_eq!(err.stderr().map(str::trim), Some("npm ERR! build failed"));
        }

        #[tokio::test]
        async fn test_hung_deploy_times_out() {
            let dir = TempDir::new().unwrap();
            let program = fake_ssh(&dir, "sleep 30");

            let err = deployer(program, Duration::from_millis(200))
                .deploy(&event())
                .await
                .unwrap_err();
            assert!(matches!(err, DeployError::TimedOut(d) if d == Duration::from_millis(200)));
        }

        #[tokio::test]
        async fn test_timed_out_deploy_leaves_no_tasks_behind() {
            let dir = TempDir::new().unwrap();
            // `sleep` outlives the killed shell and keeps both pipes open.
            let program = fake_ssh(&dir, "echo started >&2\nsleep 30");
            let metrics = tokio::runtime::Handle::current().metrics();
            let before = metrics.num_alive_tasks();

            let err = deployer(program, Duration::from_millis(200))
                .deploy(&event())
                .await
                .unwrap_err();

            assert!(matches!(err, DeployError::TimedOut(_)));
            assert_eq!(metrics.num_alive_tasks(), before);
        }
    }
}
