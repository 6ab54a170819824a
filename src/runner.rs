//! Trial runner: compile one candidate, measure one cost.
//!
//! The runner isolates all subprocess and filesystem contact. One call
//! to [`Runner::evaluate`] runs the compile command, then depending on
//! the optimization mode stats the artifact, runs it for its exit code,
//! or runs it and parses its self-reported elapsed seconds. Failed
//! trials come back as [`BOGUS_FITNESS`]; the artifact is removed on
//! every exit path.
//!
//! While children run, the runner polls their status and calls the
//! listener's `yield_now` between polls, so progress events keep
//! flowing and the listener can sleep instead of spinning.

use crate::listener::Listener;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

/// Sentinel fitness for failed trials. Large but finite, so failed
/// organisms sort to the back without poisoning arithmetic.
pub const BOGUS_FITNESS: f64 = 1_000_000_000.0;

/// What the fitness scalar measures. Lower is always better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationMode {
    /// The benchmark's self-reported elapsed seconds.
    Speed,
    /// Size of the produced artifact in bytes.
    Size,
    /// The benchmark's exit status.
    Retval,
}

impl OptimizationMode {
    /// Human-readable mode name for the run header.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            OptimizationMode::Speed => "speed",
            OptimizationMode::Size => "size",
            OptimizationMode::Retval => "return value",
        }
    }
}

impl fmt::Display for OptimizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Executes compile-and-measure trials.
///
/// The engine and reporter talk to this trait so tests can substitute a
/// deterministic implementation.
pub trait Runner {
    /// Choose a fresh scratch artifact path for one trial.
    fn scratch_path(&mut self) -> PathBuf;

    /// Run one trial: compile, then measure according to `mode`.
    ///
    /// Returns the cost, or [`BOGUS_FITNESS`] when the compile or run
    /// fails; failures are reported through the listener. The artifact
    /// at `artifact` is removed before returning.
    fn evaluate(
        &mut self,
        command: &[String],
        artifact: &Path,
        mode: OptimizationMode,
        listener: &mut dyn Listener,
    ) -> f64;

    /// Run the target's version probe, returning its first stdout line.
    fn probe_version(
        &mut self,
        _command: &[String],
        _listener: &mut dyn Listener,
    ) -> Option<String> {
        None
    }
}

/// The production runner: forks real processes and touches the real
/// filesystem.
#[derive(Debug)]
pub struct SubprocessRunner {
    scratch_dir: PathBuf,
    fallback_counter: u32,
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SubprocessRunner {
    /// Create a runner writing artifacts under the system temp dir.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            fallback_counter: 0,
        }
    }

    /// Create a runner writing artifacts under a specific directory.
    #[must_use]
    pub fn with_scratch_dir(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            fallback_counter: 0,
        }
    }

    /// Draw a 32-bit artifact identifier: 4 bytes of `/dev/urandom`, or
    /// a wall-clock value mixed with a process-local counter when the
    /// device is unavailable.
    fn artifact_id(&mut self) -> u32 {
        if let Ok(mut urandom) = fs::File::open("/dev/urandom") {
            let mut bytes = [0u8; 4];
            if urandom.read_exact(&mut bytes).is_ok() {
                return u32::from_ne_bytes(bytes);
            }
        }

        self.fallback_counter = self.fallback_counter.wrapping_add(1);
        let clock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        clock.wrapping_add(self.fallback_counter)
    }

    fn spawn_trial(command: &[String]) -> std::io::Result<Child> {
        Command::new(&command[0])
            .args(&command[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
    }

    /// Wait for a child, yielding to the listener between status polls.
    fn wait_with_yield(
        child: &mut Child,
        listener: &mut dyn Listener,
    ) -> std::io::Result<ExitStatus> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            listener.yield_now();
        }
    }

    /// Run the compiled artifact with the single argument `-ga` and an
    /// empty environment.
    fn run_artifact(
        artifact: &Path,
        capture_stdout: bool,
        listener: &mut dyn Listener,
    ) -> std::io::Result<(ExitStatus, String)> {
        let stdout = if capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let mut child = Command::new(artifact)
            .arg("-ga")
            .env_clear()
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::null())
            .spawn()?;

        let status = Self::wait_with_yield(&mut child, listener)?;

        let mut output = String::new();
        if let Some(mut pipe) = child.stdout.take() {
            // The benchmark writes one short line; reading after exit
            // cannot deadlock on a full pipe.
            let _ = pipe.read_to_string(&mut output);
        }

        Ok((status, output))
    }

    fn measure(
        artifact: &Path,
        mode: OptimizationMode,
        command_text: &str,
        listener: &mut dyn Listener,
    ) -> f64 {
        match mode {
            OptimizationMode::Size => match fs::metadata(artifact) {
                Ok(meta) => meta.len() as f64,
                Err(_) => {
                    listener.report_error(&format!("\nCOMPILE FAILED:\n{command_text}\n"));
                    BOGUS_FITNESS
                }
            },
            OptimizationMode::Retval => {
                match Self::run_artifact(artifact, false, listener) {
                    Ok((status, _)) => status.code().map_or(BOGUS_FITNESS, f64::from),
                    Err(_) => {
                        listener.report_error(&format!("\nRUN FAILED:\n{command_text}\n"));
                        BOGUS_FITNESS
                    }
                }
            }
            OptimizationMode::Speed => {
                match Self::run_artifact(artifact, true, listener) {
                    Ok((status, output)) if status.success() => {
                        match output.trim().parse::<f64>() {
                            Ok(seconds) => seconds,
                            Err(_) => {
                                listener.report_error(&format!(
                                    "\nRUN FAILED:\n{command_text}\n"
                                ));
                                BOGUS_FITNESS
                            }
                        }
                    }
                    _ => {
                        listener.report_error(&format!("\nRUN FAILED:\n{command_text}\n"));
                        BOGUS_FITNESS
                    }
                }
            }
        }
    }
}

impl Runner for SubprocessRunner {
    fn scratch_path(&mut self) -> PathBuf {
        // Redraw on the rare collision so paths stay unique within this
        // process; there is no cross-process coordination.
        loop {
            let id = self.artifact_id();
            let path = self.scratch_dir.join(format!("ACOVEA{id:08X}"));
            if !path.exists() {
                return path;
            }
        }
    }

    fn evaluate(
        &mut self,
        command: &[String],
        artifact: &Path,
        mode: OptimizationMode,
        listener: &mut dyn Listener,
    ) -> f64 {
        // Removes the artifact on every exit path, including failures.
        let _cleanup = RemoveOnDrop(artifact);

        if command.is_empty() {
            return BOGUS_FITNESS;
        }

        let command_text = command.join(" ");

        let compile_status = Self::spawn_trial(command)
            .and_then(|mut child| Self::wait_with_yield(&mut child, listener));

        match compile_status {
            Ok(status) if status.success() => {
                Self::measure(artifact, mode, &command_text, listener)
            }
            _ => {
                listener.report_error(&format!("\nCOMPILE FAILED:\n{command_text}\n"));
                BOGUS_FITNESS
            }
        }
    }

    fn probe_version(
        &mut self,
        command: &[String],
        listener: &mut dyn Listener,
    ) -> Option<String> {
        if command.is_empty() {
            return None;
        }

        let mut child = Command::new(&command[0])
            .args(&command[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .ok()?;

        let status = Self::wait_with_yield(&mut child, listener).ok()?;

        let mut output = String::new();
        if let Some(mut pipe) = child.stdout.take() {
            pipe.read_to_string(&mut output).ok()?;
        }

        if status.success() {
            output.lines().next().map(str::to_string)
        } else {
            None
        }
    }
}

/// Removes a file when dropped; absence is tolerated.
struct RemoveOnDrop<'a>(&'a Path);

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        let _ = fs::remove_file(self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Default)]
    struct RecordingListener {
        errors: Vec<String>,
    }

    impl Listener for RecordingListener {
        fn report_error(&mut self, text: &str) {
            self.errors.push(text.to_string());
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_scratch_paths_are_unique_and_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = SubprocessRunner::with_scratch_dir(dir.path());

        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            let path = runner.scratch_path();
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("ACOVEA"));
            assert_eq!(name.len(), "ACOVEA".len() + 8);
            assert!(seen.insert(path));
        }
    }

    #[test]
    fn test_size_mode_stats_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("ACOVEA00000001");
        fs::write(&artifact, vec![0u8; 1024]).unwrap();

        let mut runner = SubprocessRunner::with_scratch_dir(dir.path());
        let mut listener = RecordingListener::default();
        let fitness = runner.evaluate(
            &strings(&["sh", "-c", "exit 0"]),
            &artifact,
            OptimizationMode::Size,
            &mut listener,
        );

        assert!((fitness - 1024.0).abs() < f64::EPSILON);
        assert!(listener.errors.is_empty());
        assert!(!artifact.exists(), "artifact must be removed");
    }

    #[test]
    fn test_compile_failure_is_bogus() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("ACOVEA00000002");

        let mut runner = SubprocessRunner::with_scratch_dir(dir.path());
        let mut listener = RecordingListener::default();
        let fitness = runner.evaluate(
            &strings(&["sh", "-c", "exit 1"]),
            &artifact,
            OptimizationMode::Size,
            &mut listener,
        );

        assert!((fitness - BOGUS_FITNESS).abs() < f64::EPSILON);
        assert_eq!(listener.errors.len(), 1);
        assert!(listener.errors[0].contains("COMPILE FAILED"));
    }

    #[test]
    fn test_speed_mode_parses_benchmark_output() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("ACOVEA00000003");
        write_script(&artifact, "#!/bin/sh\necho 3.25\n");

        let mut runner = SubprocessRunner::with_scratch_dir(dir.path());
        let mut listener = RecordingListener::default();
        let fitness = runner.evaluate(
            &strings(&["sh", "-c", "exit 0"]),
            &artifact,
            OptimizationMode::Speed,
            &mut listener,
        );

        assert!((fitness - 3.25).abs() < f64::EPSILON);
        assert!(!artifact.exists());
    }

    #[test]
    fn test_speed_mode_run_failure_is_bogus() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("ACOVEA00000004");
        write_script(&artifact, "#!/bin/sh\nexit 3\n");

        let mut runner = SubprocessRunner::with_scratch_dir(dir.path());
        let mut listener = RecordingListener::default();
        let fitness = runner.evaluate(
            &strings(&["sh", "-c", "exit 0"]),
            &artifact,
            OptimizationMode::Speed,
            &mut listener,
        );

        assert!((fitness - BOGUS_FITNESS).abs() < f64::EPSILON);
        assert!(listener.errors.iter().any(|e| e.contains("RUN FAILED")));
    }

    #[test]
    fn test_retval_mode_uses_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("ACOVEA00000005");
        write_script(&artifact, "#!/bin/sh\nexit 7\n");

        let mut runner = SubprocessRunner::with_scratch_dir(dir.path());
        let mut listener = RecordingListener::default();
        let fitness = runner.evaluate(
            &strings(&["sh", "-c", "exit 0"]),
            &artifact,
            OptimizationMode::Retval,
            &mut listener,
        );

        assert!((fitness - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_probe_version_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = SubprocessRunner::with_scratch_dir(dir.path());
        let mut listener = RecordingListener::default();

        let version = runner.probe_version(
            &strings(&["sh", "-c", "echo 13.2.0; echo extra"]),
            &mut listener,
        );
        assert_eq!(version.as_deref(), Some("13.2.0"));

        let failed = runner.probe_version(&strings(&["sh", "-c", "exit 1"]), &mut listener);
        assert_eq!(failed, None);
    }

    fn write_script(path: &Path, body: &str) {
        let mut file = fs::File::create(path).unwrap();
        file.write_all(body.as_bytes()).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
        }
    }
}
