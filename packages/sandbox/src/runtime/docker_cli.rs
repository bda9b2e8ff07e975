// ABOUTME: Docker CLI runtime that shells out once per container operation
// ABOUTME: Captures exit code and output of each invocation and maps failures to RuntimeError

use super::{ContainerRuntime, Result, RunSpec, RuntimeError};
use crate::types::ExecOutput;
use async_trait::async_trait;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Container runtime backed by the `docker` command line (or a compatible binary)
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    /// Use a different Docker-compatible binary (e.g. `podman` or an absolute path)
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command_line(&self, args: &[String]) -> String {
        let mut line = self.binary.clone();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Spawn the binary and wait for it. The child dies with the future if the caller is cancelled.
    async fn output(&self, args: &[String]) -> Result<Output> {
        let command = self.command_line(args);
        debug!("Running container command: {}", command);

        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn { command, source })
    }

    /// Run a command that must succeed and return its stdout
    async fn run(&self, args: Vec<String>) -> Result<String> {
        let output = self.output(&args).await?;

        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command: self.command_line(&args),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Arguments for a detached `run` carrying limits, network, workspace volume, ports and labels
pub fn run_args(spec: &RunSpec) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-d".to_string(),
        "--name".to_string(),
        spec.container_name.clone(),
    ];

    for (key, value) in &spec.labels {
        args.push("--label".to_string());
        args.push(format!("{}={}", key, value));
    }

    args.extend([
        "--memory".to_string(),
        spec.memory_limit.clone(),
        "--cpus".to_string(),
        spec.cpu_limit.clone(),
        "--network".to_string(),
        spec.network.clone(),
        "-v".to_string(),
        format!("{}:{}", spec.volume_name, spec.workspace_path),
    ]);

    for (container_port, host_port) in &spec.ports {
        args.push("-p".to_string());
        args.push(format!("{}:{}", host_port, container_port));
    }

    args.push(spec.image.clone());
    args
}

/// Arguments for `exec` inside a working directory
pub fn exec_args(container_id: &str, command: &[String], workdir: &str) -> Vec<String> {
    let mut args = vec![
        "exec".to_string(),
        "-w".to_string(),
        workdir.to_string(),
        container_id.to_string(),
    ];
    args.extend(command.iter().cloned());
    args
}

fn strings<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn is_available(&self) -> bool {
        match self.output(&strings(["info"])).await {
            Ok(output) => output.status.success(),
            Err(e) => {
                debug!("Container runtime unavailable: {}", e);
                false
            }
        }
    }

    async fn create_volume(&self, name: &str) -> Result<()> {
        self.run(strings(["volume", "create", name])).await?;
        Ok(())
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        self.run(strings(["volume", "rm", name])).await?;
        Ok(())
    }

    async fn run_container(&self, spec: &RunSpec) -> Result<String> {
        let stdout = self.run(run_args(spec)).await?;
        Ok(stdout.trim().to_string())
    }

    async fn start_container(&self, container_id: &str) -> Result<()> {
        self.run(strings(["start", container_id])).await?;
        Ok(())
    }

    async fn stop_container(&self, container_id: &str) -> Result<()> {
        self.run(strings(["stop", container_id])).await?;
        Ok(())
    }

    async fn remove_container(&self, container_id: &str, force: bool) -> Result<()> {
        let args = if force {
            strings(["rm", "-f", container_id])
        } else {
            strings(["rm", container_id])
        };
        self.run(args).await?;
        Ok(())
    }

    async fn exec(
        &self,
        container_id: &str,
        command: &[String],
        workdir: &str,
    ) -> Result<ExecOutput> {
        let output = self
            .output(&exec_args(container_id, command, workdir))
            .await?;

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn copy_in(
        &self,
        container_id: &str,
        host_path: &Path,
        container_path: &str,
    ) -> Result<()> {
        let args = vec![
            "cp".to_string(),
            host_path.display().to_string(),
            format!("{}:{}", container_id, container_path),
        ];
        self.run(args).await?;
        Ok(())
    }

    async fn copy_out(
        &self,
        container_id: &str,
        container_path: &str,
        host_path: &Path,
    ) -> Result<()> {
        let args = vec![
            "cp".to_string(),
            format!("{}:{}", container_id, container_path),
            host_path.display().to_string(),
        ];
        self.run(args).await?;
        Ok(())
    }
}
