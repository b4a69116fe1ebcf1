//! Viewer process probing and lifecycle.
//!
//! The engine only needs one bit from this module: is the viewer process
//! alive right now? That bit is behind the [`ProcessProbe`] trait so tests
//! and embedders can substitute their own answer. [`ViewerProcess`] is the
//! real implementation, matching a configurable set of process names
//! against the live process table, and also carries the launch/terminate
//! helpers built on the same matching.

use std::process::Command;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::Result;

/// Liveness predicate polled by the supervisor on every tick.
pub trait ProcessProbe: Send + Sync {
    fn is_running(&self) -> bool;
}

/// Any `Fn() -> bool` closure is a probe.
impl<F> ProcessProbe for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_running(&self) -> bool {
        self()
    }
}

/// Process names the viewer shows up under.
pub const DEFAULT_PROCESS_NAMES: [&str; 3] =
    ["Pavlov.exe", "Pavlov-Win64-Shipping.exe", "GameThread"];

const LAUNCH_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Probe and lifecycle control for the viewer process.
pub struct ViewerProcess {
    names: Vec<String>,
}

impl ViewerProcess {
    /// Probe matching [`DEFAULT_PROCESS_NAMES`].
    pub fn new() -> Self {
        Self::with_names(DEFAULT_PROCESS_NAMES)
    }

    /// Probe matching a custom name set.
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    fn matching_pids(&self, extra_names: &[&str]) -> Vec<u32> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.extend_from_slice(extra_names);
        scan(&names)
    }

    /// Opens the viewer through Steam and waits for its process to appear.
    ///
    /// Polls [`is_running`](ProcessProbe::is_running) every 250 ms until
    /// the process shows up, `timeout` elapses, or `keep_waiting` returns
    /// false. Blocking; call it off the async workers.
    pub fn launch(
        &self,
        keep_waiting: impl Fn() -> bool,
        timeout: Duration,
        steam_app_id: u32,
    ) -> Result<bool> {
        open_url(&format!("steam://rungameid/{}", steam_app_id))?;
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.is_running() {
                return Ok(true);
            }
            if !keep_waiting() {
                return Ok(false);
            }
            std::thread::sleep(LAUNCH_POLL_INTERVAL);
        }
        Ok(self.is_running())
    }

    /// Sends a terminate signal to every matching process.
    pub fn close(&self, extra_names: &[&str]) {
        for pid in self.matching_pids(extra_names) {
            debug!("terminating viewer process {}", pid);
            if let Err(e) = terminate(pid) {
                warn!("could not terminate process {}: {}", pid, e);
            }
        }
    }
}

impl Default for ViewerProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for ViewerProcess {
    fn is_running(&self) -> bool {
        !self.matching_pids(&[]).is_empty()
    }
}

#[cfg(target_os = "linux")]
fn scan(names: &[&str]) -> Vec<u32> {
    let mut pids = Vec::new();
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return pids;
    };
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Ok(pid) = file_name.to_string_lossy().parse::<u32>() else {
            continue;
        };
        let comm = std::fs::read_to_string(entry.path().join("comm")).unwrap_or_default();
        let cmdline = std::fs::read_to_string(entry.path().join("cmdline")).unwrap_or_default();
        if names.iter().any(|n| matches_name(n, comm.trim(), &cmdline)) {
            pids.push(pid);
        }
    }
    pids
}

/// Name match against one `/proc` entry. `comm` is truncated to 15 bytes
/// by the kernel, so a long name may only match its prefix there; the
/// executable basename from `cmdline` carries the full name.
#[cfg(target_os = "linux")]
fn matches_name(name: &str, comm: &str, cmdline: &str) -> bool {
    if !comm.is_empty() && (comm == name || (comm.len() == 15 && name.starts_with(comm))) {
        return true;
    }
    cmdline
        .split('\0')
        .next()
        .and_then(|argv0| argv0.rsplit(['/', '\\']).next())
        .map_or(false, |basename| basename == name)
}

#[cfg(target_os = "windows")]
fn scan(names: &[&str]) -> Vec<u32> {
    let mut pids = Vec::new();
    for name in names {
        let output = Command::new("tasklist")
            .args(["/FO", "CSV", "/NH", "/FI", &format!("IMAGENAME eq {}", name)])
            .output();
        let Ok(output) = output else { continue };
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            let mut fields = line.split(',');
            let (Some(_image), Some(pid)) = (fields.next(), fields.next()) else {
                continue;
            };
            if let Ok(pid) = pid.trim_matches('"').parse::<u32>() {
                pids.push(pid);
            }
        }
    }
    pids
}

#[cfg(all(unix, not(target_os = "linux")))]
fn scan(names: &[&str]) -> Vec<u32> {
    let mut pids = Vec::new();
    for name in names {
        let output = Command::new("pgrep").args(["-x", name]).output();
        let Ok(output) = output else { continue };
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            if let Ok(pid) = line.trim().parse::<u32>() {
                pids.push(pid);
            }
        }
    }
    pids
}

#[cfg(windows)]
fn terminate(pid: u32) -> std::io::Result<()> {
    Command::new("taskkill")
        .args(["/PID", &pid.to_string()])
        .output()
        .map(|_| ())
}

#[cfg(unix)]
fn terminate(pid: u32) -> std::io::Result<()> {
    Command::new("kill").arg(pid.to_string()).output().map(|_| ())
}

#[cfg(target_os = "windows")]
fn open_url(url: &str) -> Result<()> {
    Command::new("cmd").args(["/C", "start", "", url]).spawn()?;
    Ok(())
}

#[cfg(target_os = "macos")]
fn open_url(url: &str) -> Result<()> {
    Command::new("open").arg(url).spawn()?;
    Ok(())
}

#[cfg(all(unix, not(target_os = "macos")))]
fn open_url(url: &str) -> Result<()> {
    Command::new("xdg-open").arg(url).spawn()?;
    Ok(())
}
