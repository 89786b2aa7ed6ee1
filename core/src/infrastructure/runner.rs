//! Command runner abstraction for executing the admin CLI.
//!
//! `CommandRunner` is the trait the admin client uses to execute an
//! `Invocation`. `ProcessRunner` is the production implementation: it spawns
//! the program directly (no shell), optionally as another user, and bounds the
//! run with a timeout. `MockRunner` is the test double that records calls and
//! returns preset results.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::io::{self, Read};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::ExecError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

// ---------------------------------------------------------------------------
// Invocation / ExecutionResult
// ---------------------------------------------------------------------------

/// One external command: what to run, where, as whom, and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub identity: Option<String>,
    pub working_dir: PathBuf,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Invocation {
            identity: None,
            working_dir: working_dir.into(),
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn identity(mut self, user: Option<String>) -> Self {
        self.identity = user;
        self
    }

    pub fn timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    /// Program and arguments joined with spaces, for logs and errors.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Outcome of a command that ran to completion. A non-zero exit is a normal
/// result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit 0 with the given stdout.
    pub fn ok(stdout: &str) -> Self {
        ExecutionResult {
            exit_code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    /// Non-zero exit with the given stderr.
    pub fn failed(exit_code: i32, stderr: &str) -> Self {
        ExecutionResult {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

/// Trait for executing external commands.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult, ExecError>;
}

// ---------------------------------------------------------------------------
// ProcessRunner
// ---------------------------------------------------------------------------

/// Production runner that spawns the invocation's program as a child process.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult, ExecError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        if let Some(user) = &invocation.identity {
            switch_identity(&mut cmd, user)?;
        }

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let waited = match invocation.timeout {
            Some(limit) => wait_or_kill(&mut child, |c| wait_with_timeout(c, limit)),
            None => wait_or_kill(&mut child, |c| c.wait().map(Some)),
        };
        let status = match waited? {
            Some(status) => status,
            None => {
                warn!(command = %invocation.command_line(), "command timed out, process group killed");
                // Reader threads are left detached: a grandchild may still
                // hold the pipes open.
                return Err(ExecError::Timeout {
                    command: invocation.command_line(),
                    after: invocation.timeout.unwrap_or_default(),
                });
            }
        };

        let result = ExecutionResult {
            exit_code: exit_code(status),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        };
        debug!(command = %invocation.command_line(), exit = ?result.exit_code, "command finished");
        Ok(result)
    }
}

fn exit_code(status: ExitStatus) -> Option<i32> {
    match status.code() {
        Some(code) => Some(code),
        None => {
            debug!(signal = ?status.signal(), "command terminated by signal");
            None
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn wait_with_timeout(child: &mut Child, limit: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Run `wait`, killing the child's process group when it gives up (`None`)
/// or fails. The child is always reaped unless it exited normally.
fn wait_or_kill<W>(child: &mut Child, wait: W) -> io::Result<Option<ExitStatus>>
where
    W: FnOnce(&mut Child) -> io::Result<Option<ExitStatus>>,
{
    match wait(child) {
        Ok(Some(status)) => Ok(Some(status)),
        Ok(None) => {
            kill_group(child);
            Ok(None)
        }
        Err(e) => {
            kill_group(child);
            Err(e)
        }
    }
}

/// Kill the child's whole process group (the CLI script forks a JVM), then
/// reap the child.
fn kill_group(child: &mut Child) {
    let pgid = child.id() as libc::pid_t;
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
    let _ = child.kill();
    let _ = child.wait();
}

// ---------------------------------------------------------------------------
// Identity switching
// ---------------------------------------------------------------------------

/// A resolved OS account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub uid: libc::uid_t,
    pub gid: libc::gid_t,
    pub home: PathBuf,
}

/// Arrange for `cmd` to run as `user`. A no-op when `user` is already the
/// effective user.
fn switch_identity(cmd: &mut Command, user: &str) -> Result<(), ExecError> {
    let account = lookup_account(user)?;
    if account.uid == unsafe { libc::geteuid() } {
        return Ok(());
    }
    debug!(user, uid = account.uid, "switching identity for child");
    cmd.uid(account.uid)
        .gid(account.gid)
        .env("HOME", &account.home)
        .env("USER", user)
        .env("LOGNAME", user);
    Ok(())
}

/// Look up `user` in the password database.
pub fn lookup_account(user: &str) -> Result<Account, ExecError> {
    let name = CString::new(user).map_err(|_| ExecError::UnknownIdentity(user.to_string()))?;
    let mut buf: Vec<libc::c_char> = vec![0; 1024];
    loop {
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut found: *mut libc::passwd = std::ptr::null_mut();
        let rc = unsafe {
            libc::getpwnam_r(name.as_ptr(), &mut pwd, buf.as_mut_ptr(), buf.len(), &mut found)
        };
        if rc == libc::ERANGE && buf.len() < (1 << 20) {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if rc != 0 {
            return Err(ExecError::Io(io::Error::from_raw_os_error(rc)));
        }
        if found.is_null() {
            return Err(ExecError::UnknownIdentity(user.to_string()));
        }
        let home = if pwd.pw_dir.is_null() {
            PathBuf::from("/")
        } else {
            let dir = unsafe { CStr::from_ptr(pwd.pw_dir) };
            PathBuf::from(dir.to_string_lossy().into_owned())
        };
        return Ok(Account {
            uid: pwd.pw_uid,
            gid: pwd.pw_gid,
            home,
        });
    }
}

// ---------------------------------------------------------------------------
// MockRunner
// ---------------------------------------------------------------------------

/// Test-double runner that records invocations and returns pre-configured
/// results in order. Once the script runs out every call returns exit 0.
pub struct MockRunner {
    responses: RefCell<Vec<Result<ExecutionResult, ExecError>>>,
    invocations: RefCell<Vec<Invocation>>,
}

impl MockRunner {
    pub fn with_responses(responses: Vec<Result<ExecutionResult, ExecError>>) -> Self {
        let mut reversed = responses;
        reversed.reverse();
        MockRunner {
            responses: RefCell::new(reversed),
            invocations: RefCell::new(Vec::new()),
        }
    }

    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    /// Last argument of every recorded invocation.
    pub fn executed_commands(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .filter_map(|inv| inv.args.last().cloned())
            .collect()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult, ExecError> {
        self.invocations.borrow_mut().push(invocation.clone());
        match self.responses.borrow_mut().pop() {
            Some(response) => response,
            None => Ok(ExecutionResult::ok("")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Invocation {
        Invocation::new("/bin/sh", std::env::temp_dir())
            .arg("-c")
            .arg(script)
    }

    #[test]
    fn mock_runner_records_invocations() {
        let runner = MockRunner::with_responses(vec![
            Ok(ExecutionResult::ok("first")),
            Ok(ExecutionResult::failed(1, "nope")),
        ]);
        let r1 = runner.run(&sh("echo hello")).unwrap();
        assert!(r1.success());
        let r2 = runner.run(&sh("echo world")).unwrap();
        assert!(!r2.success());
        assert_eq!(r2.stderr, "nope");
        assert_eq!(runner.executed_commands(), vec!["echo hello", "echo world"]);
    }

    #[test]
    fn mock_runner_defaults_to_success() {
        let runner = MockRunner::new();
        assert!(runner.run(&sh("anything")).unwrap().success());
        assert_eq!(runner.invocations().len(), 1);
    }

    #[test]
    fn mock_runner_propagates_errors() {
        let runner = MockRunner::with_responses(vec![Err(ExecError::UnknownIdentity("jboss".into()))]);
        assert!(matches!(
            runner.run(&sh("true")),
            Err(ExecError::UnknownIdentity(u)) if u == "jboss"
        ));
    }

    #[test]
    fn process_runner_captures_output_and_exit_code() {
        let result = ProcessRunner
            .run(&sh("echo out; echo err >&2; exit 3"))
            .unwrap();
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert!(!result.success());
    }

    #[test]
    fn process_runner_uses_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("/bin/sh", dir.path()).arg("-c").arg("pwd");
        let result = ProcessRunner.run(&inv).unwrap();
        let reported = PathBuf::from(result.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn process_runner_times_out() {
        let inv = sh("sleep 5").timeout(Some(Duration::from_millis(100)));
        let started = Instant::now();
        let err = ProcessRunner.run(&inv).unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    /// Gone means reaped, or a zombie waiting for init.
    #[cfg(target_os = "linux")]
    fn pid_is_gone(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Err(_) => true,
            Ok(stat) => matches!(
                stat.rsplit(')').next().and_then(|rest| rest.trim_start().chars().next()),
                Some('Z') | Some('X')
            ),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn timeout_kills_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("sleep.pid");
        let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
        let inv = sh(&script).timeout(Some(Duration::from_millis(500)));
        let err = ProcessRunner.run(&inv).unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));

        let pid: i32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while !pid_is_gone(pid) && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
        }
        assert!(pid_is_gone(pid), "background sleep {} survived the timeout", pid);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_wait_kills_and_reaps_child() {
        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg("sleep 30")
            .process_group(0)
            .spawn()
            .unwrap();
        let pid = child.id() as i32;
        let err = wait_or_kill(&mut child, |_| {
            Err(io::Error::new(io::ErrorKind::Interrupted, "wait failed"))
        })
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
        assert!(pid_is_gone(pid));
    }

    #[test]
    fn process_runner_spawn_failure() {
        let inv = Invocation::new("/nonexistent/jboss-cli.sh", std::env::temp_dir());
        assert!(matches!(ProcessRunner.run(&inv), Err(ExecError::Spawn { .. })));
    }

    #[test]
    fn unknown_identity_is_reported() {
        let inv = sh("true").identity(Some("no-such-user-secdomain".into()));
        assert!(matches!(
            ProcessRunner.run(&inv),
            Err(ExecError::UnknownIdentity(u)) if u == "no-such-user-secdomain"
        ));
    }

    #[test]
    fn lookup_root_account() {
        let account = lookup_account("root").unwrap();
        assert_eq!(account.uid, 0);
    }

    #[test]
    fn command_line_joins_args() {
        let inv = Invocation::new("/opt/wildfly/bin/jboss-cli.sh", "/opt/wildfly")
            .arg("--connect")
            .arg("--command=:read-resource");
        assert_eq!(
            inv.command_line(),
            "/opt/wildfly/bin/jboss-cli.sh --connect --command=:read-resource"
        );
    }
}
