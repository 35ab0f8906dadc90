//! Update plan and the updater command line built from it.

use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

/// Flag carrying the caller's process id.
pub const ARG_PID: &str = "--pid";
/// Flag carrying the staged source path.
pub const ARG_SRC: &str = "--src";
/// Flag carrying the destination path.
pub const ARG_DST: &str = "--dst";
/// Flag carrying the ready marker path.
pub const ARG_READY_FILE: &str = "--ready-file";
/// Flag carrying the updater's wait bound in seconds.
pub const ARG_WAIT_TIMEOUT: &str = "--wait-timeout-secs";

/// Everything the updater needs to finish an update. Consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Downloaded replacement.
    pub staged_path: PathBuf,
    /// Executable to overwrite and relaunch.
    pub destination_path: PathBuf,
    /// Updater executable.
    pub updater_path: PathBuf,
    /// Process the updater waits on.
    pub caller_pid: u32,
}

/// The updater invocation derived from an [`UpdatePlan`].
#[derive(Debug, Clone)]
pub struct HandoffCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl HandoffCommand {
    /// Build the invocation for `plan`.
    #[must_use]
    pub fn new(plan: &UpdatePlan, ready_file: &Path, wait_timeout: Duration) -> Self {
        let args = vec![
            ARG_PID.into(),
            plan.caller_pid.to_string().into(),
            ARG_SRC.into(),
            plan.staged_path.clone().into_os_string(),
            ARG_DST.into(),
            plan.destination_path.clone().into_os_string(),
            ARG_READY_FILE.into(),
            ready_file.as_os_str().to_owned(),
            ARG_WAIT_TIMEOUT.into(),
            wait_timeout.as_secs().to_string().into(),
        ];

        Self {
            program: plan.updater_path.clone(),
            args,
        }
    }

    /// Updater executable.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments, unquoted.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Command line for logs, with arguments quoted the way the Windows
    /// command-line parser expects.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|a| quote_arg(&a.to_string_lossy()).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Process builder for this invocation, detached from our stdio.
    #[must_use]
    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);
        cmd
    }
}

/// Quote an argument for `CommandLineToArgvW`.
///
/// Arguments without whitespace or quotes are left as they are. Otherwise the
/// argument is wrapped in double quotes, embedded quotes are escaped, and
/// backslashes are doubled where they precede a quote.
#[must_use]
pub fn quote_arg(arg: &str) -> Cow<'_, str> {
    if !arg.is_empty() && !arg.contains(|c: char| matches!(c, ' ' | '\t' | '"')) {
        return Cow::Borrowed(arg);
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0usize;
    for c in arg.chars() {
        if c == '\\' {
            backslashes += 1;
            continue;
        }
        let run = if c == '"' { backslashes * 2 + 1 } else { backslashes };
        quoted.extend(std::iter::repeat('\\').take(run));
        backslashes = 0;
        quoted.push(c);
    }
    quoted.extend(std::iter::repeat('\\').take(backslashes * 2));
    quoted.push('"');
    Cow::Owned(quoted)
}
