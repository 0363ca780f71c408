// src/exec/runner.rs

//! Runs one dispatch job as a subprocess.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::exec::dispatcher::DispatchJob;

/// Captured result of a finished script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutcome {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run the job and log its outcome. Errors are logged, never returned.
pub async fn run_and_report(job: &DispatchJob) -> Option<ScriptOutcome> {
    match run_script(job).await {
        Ok(outcome) => {
            report_outcome(job, &outcome);
            Some(outcome)
        }
        Err(err) => {
            error!(
                script = %job.script_path.display(),
                event = %job.event_kind_label,
                path = %job.affected_path,
                error = %format!("{err:#}"),
                "failed to run script"
            );
            None
        }
    }
}

/// Spawn `interpreter script label path`, draining stdout and stderr
/// concurrently while waiting for exit.
pub async fn run_script(job: &DispatchJob) -> Result<ScriptOutcome> {
    info!(
        script = %job.script_path.display(),
        event = %job.event_kind_label,
        path = %job.affected_path,
        "starting script"
    );

    let mut cmd = Command::new(&job.interpreter);
    cmd.arg(&job.script_path)
        .arg(&job.event_kind_label)
        .arg(&job.affected_path)
        .envs(&job.environment)
        .current_dir(&job.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning {:?} for script {:?}", job.interpreter, job.script_path))?;

    let mut stdout = child.stdout.take().context("child stdout not captured")?;
    let mut stderr = child.stderr.take().context("child stderr not captured")?;

    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let (out_res, err_res, status) = tokio::join!(
        stdout.read_to_end(&mut out_buf),
        stderr.read_to_end(&mut err_buf),
        child.wait()
    );
    out_res.context("reading script stdout")?;
    err_res.context("reading script stderr")?;
    let status = status.with_context(|| format!("waiting for script {:?}", job.script_path))?;

    Ok(ScriptOutcome {
        exit_code: status.code(),
        stdout: String::from_utf8_lossy(&out_buf).into_owned(),
        stderr: String::from_utf8_lossy(&err_buf).into_owned(),
    })
}

fn report_outcome(job: &DispatchJob, outcome: &ScriptOutcome) {
    if outcome.success() {
        info!(
            script = %job.script_path.display(),
            event = %job.event_kind_label,
            path = %job.affected_path,
            stdout = %outcome.stdout.trim_end(),
            "script finished"
        );
    } else {
        warn!(
            script = %job.script_path.display(),
            event = %job.event_kind_label,
            path = %job.affected_path,
            exit_code = outcome.exit_code.unwrap_or(-1),
            stdout = %outcome.stdout.trim_end(),
            stderr = %outcome.stderr.trim_end(),
            "script exited with failure"
        );
    }
}
