use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use surge_errors::{SurgeError, SurgeResult};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// 外部程序调用描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 外部程序执行结果
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub execution_time_ms: u64,
}

impl CommandOutput {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            ..Default::default()
        }
    }

    pub fn failed(exit_code: i32, stderr: &str) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            stderr: stderr.to_string(),
            ..Default::default()
        }
    }

    /// 先 stdout 后 stderr, 与终端显示一致
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }

    /// 非零退出码转换为外部程序错误
    pub fn into_result(self, spec: &CommandSpec) -> SurgeResult<CommandOutput> {
        if self.success {
            return Ok(self);
        }
        Err(SurgeError::collaborator_error(
            spec.program.clone(),
            format!(
                "退出码: {:?}, 输出: {}",
                self.exit_code,
                self.combined_output()
            ),
        ))
    }
}

/// 外部程序执行器; 启动失败返回错误, 非零退出通过 [`CommandOutput::success`] 报告
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> SurgeResult<CommandOutput>;
}

/// 基于 tokio::process 的执行器
#[derive(Debug, Default, Clone)]
pub struct ProcessCommandRunner;

impl ProcessCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> SurgeResult<CommandOutput> {
        let start_time = Instant::now();

        info!(
            "执行外部程序: command={}, working_dir={:?}",
            spec.command_line(),
            spec.working_dir
        );

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        if let Some(ref dir) = spec.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            SurgeError::collaborator_error(spec.program.clone(), format!("启动失败: {e}"))
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            SurgeError::collaborator_error(spec.program.clone(), "无法获取stdout")
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            SurgeError::collaborator_error(spec.program.clone(), "无法获取stderr")
        })?;

        let mut stdout_reader = BufReader::new(stdout);
        let mut stderr_reader = BufReader::new(stderr);
        let mut stdout_lines = Vec::new();
        let mut stderr_lines = Vec::new();

        // 模拟程序会运行数分钟, 输出逐行写入日志
        let stdout_task = async {
            let mut line = String::new();
            while stdout_reader.read_line(&mut line).await.unwrap_or(0) > 0 {
                debug!(program = %spec.program, "{}", line.trim_end());
                stdout_lines.push(line.trim_end().to_string());
                line.clear();
            }
        };

        let stderr_task = async {
            let mut line = String::new();
            while stderr_reader.read_line(&mut line).await.unwrap_or(0) > 0 {
                debug!(program = %spec.program, stream = "stderr", "{}", line.trim_end());
                stderr_lines.push(line.trim_end().to_string());
                line.clear();
            }
        };

        tokio::join!(stdout_task, stderr_task);

        let exit_status = child.wait().await.map_err(|e| {
            SurgeError::collaborator_error(spec.program.clone(), format!("等待进程结束失败: {e}"))
        })?;

        let output = CommandOutput {
            success: exit_status.success(),
            exit_code: exit_status.code(),
            stdout: stdout_lines.join("\n"),
            stderr: stderr_lines.join("\n"),
            execution_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "外部程序执行完成: program={}, success={}, exit_code={:?}, duration={}ms",
            spec.program, output.success, output.exit_code, output.execution_time_ms
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_builder() {
        let spec = CommandSpec::new("aws")
            .args(["s3", "cp"])
            .arg("a.json")
            .current_dir("/app");
        assert_eq!(spec.command_line(), "aws s3 cp a.json");
        assert_eq!(spec.working_dir, Some(PathBuf::from("/app")));
    }

    #[test]
    fn test_combined_output() {
        let output = CommandOutput {
            stdout: "out".to_string(),
            stderr: "err".to_string(),
            ..Default::default()
        };
        assert_eq!(output.combined_output(), "out\nerr");
        assert_eq!(CommandOutput::failed(1, "err").combined_output(), "err");
        assert_eq!(CommandOutput::succeeded().combined_output(), "");
    }

    #[test]
    fn test_into_result() {
        let spec = CommandSpec::new("run_WebCentralAnalysis.sh");
        assert!(CommandOutput::succeeded().into_result(&spec).is_ok());

        let err = CommandOutput::failed(2, "license expired")
            .into_result(&spec)
            .unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("license expired"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_output() {
        let runner = ProcessCommandRunner::new();
        let spec = CommandSpec::new("sh").args(["-c", "echo hello; echo oops >&2; exit 3"]);
        let output = runner.run(&spec).await.unwrap();

        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, "hello");
        assert_eq!(output.stderr, "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_uses_working_dir() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let runner = ProcessCommandRunner::new();
        let spec = CommandSpec::new("pwd").current_dir(temp_dir.path());
        let output = runner.run(&spec).await.unwrap();

        assert!(output.success);
        let reported = std::fs::canonicalize(output.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(temp_dir.path()).unwrap());
    }

    #[tokio::test]
    async fn test_process_runner_spawn_failure_is_job_scoped() {
        let runner = ProcessCommandRunner::new();
        let spec = CommandSpec::new("/nonexistent/surge-collaborator");
        let err = runner.run(&spec).await.unwrap_err();
        assert!(!err.is_fatal());
    }
}
