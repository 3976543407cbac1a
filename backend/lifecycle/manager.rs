//! Server lifecycle operations.
//!
//! Supervises the HTTP server process through three files in the working
//! directory: a PID file, a log file the server's output is appended to,
//! and a JSON configuration file. Every operation is idempotent: stopping a
//! stopped server succeeds, and starting a healthy one returns its PID.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use log::{info, warn};

use super::process;
use super::types::{ConfigPatch, LifecycleError, ServerConfig, ServerHealth, StatusReport};

/// Substring of the supervised command line that identifies our server
const SERVER_SIGNATURE: &str = "docforge";

/// How long `start` waits for the server to bind its port
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `stop` waits after SIGTERM before escalating
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Grace period between SIGTERM and SIGKILL in `kill_port`
const KILL_PORT_GRACE: Duration = Duration::from_secs(3);

/// Lifecycle manager for one server instance
pub struct ServerManager {
    pid_file: PathBuf,
    log_file: PathBuf,
    config_file: PathBuf,
}

impl Default for ServerManager {
    fn default() -> Self {
        Self {
            pid_file: PathBuf::from(".backend.pid"),
            log_file: PathBuf::from("backend.log"),
            config_file: PathBuf::from(".backend_config.json"),
        }
    }
}

impl ServerManager {
    /// A manager rooted at explicit file paths
    pub fn with_paths(pid_file: PathBuf, log_file: PathBuf, config_file: PathBuf) -> Self {
        Self {
            pid_file,
            log_file,
            config_file,
        }
    }

    // ---- config file ----

    /// Reads the configuration file, defaulting when absent or corrupt
    pub fn load_config(&self) -> ServerConfig {
        match std::fs::read_to_string(&self.config_file) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("Corrupt config file ({}); using defaults", e);
                ServerConfig::default()
            }),
            Err(_) => ServerConfig::default(),
        }
    }

    /// Writes the configuration file
    pub fn save_config(&self, config: &ServerConfig) -> Result<(), LifecycleError> {
        let payload = serde_json::to_string_pretty(config)
            .map_err(|e| LifecycleError::Other(format!("config serialization failed: {}", e)))?;
        std::fs::write(&self.config_file, payload)?;
        Ok(())
    }

    /// Merge-updates the configuration file; a running server picks the
    /// change up on its next restart
    pub fn patch_config(&self, patch: ConfigPatch) -> Result<ServerConfig, LifecycleError> {
        let mut config = self.load_config();
        config.merge(patch);
        self.save_config(&config)?;
        Ok(config)
    }

    // ---- pid file ----

    fn read_pid(&self) -> Option<u32> {
        std::fs::read_to_string(&self.pid_file)
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    fn write_pid(&self, pid: u32) -> Result<(), LifecycleError> {
        std::fs::write(&self.pid_file, pid.to_string())?;
        Ok(())
    }

    fn clear_pid(&self) {
        let _ = std::fs::remove_file(&self.pid_file);
    }

    /// Three-point validation of the recorded PID: process exists, command
    /// line matches the server signature, configured port is listening
    fn validated_pid(&self, config: &ServerConfig) -> Option<u32> {
        let pid = self.read_pid()?;
        if !process::pid_alive(pid) {
            return None;
        }
        if !process::matches_signature(pid, SERVER_SIGNATURE) {
            return None;
        }
        if !process::port_in_use(&config.host, config.port) {
            return None;
        }
        Some(pid)
    }

    // ---- operations ----

    /// Starts the supervised server.
    ///
    /// With `force`, whatever currently holds the configured port is
    /// terminated first; without it an occupied port is an error. Rolls
    /// back (kills the child, clears the PID file) when the server does not
    /// bind within the startup timeout.
    pub fn start(&self, force: bool) -> Result<u32, LifecycleError> {
        let config = self.load_config();

        if let Some(pid) = self.validated_pid(&config) {
            info!("Server already running with pid {}", pid);
            return Ok(pid);
        }

        if process::port_in_use(&config.host, config.port) {
            if force {
                info!("Port {} occupied; reclaiming it", config.port);
                self.kill_port(config.port)?;
            } else {
                return Err(LifecycleError::PortInUse(config.port));
            }
        }

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;
        let log_err = log.try_clone()?;

        let binary = server_binary();
        info!(
            "Starting {} on {}:{} ({} workers)",
            binary.display(),
            config.host,
            config.port,
            config.workers
        );

        let mut child = Command::new(&binary)
            .env("DOCFORGE_HOST", &config.host)
            .env("DOCFORGE_PORT", config.port.to_string())
            .env("DOCFORGE_WORKERS", config.workers.to_string())
            .env("RUST_LOG", &config.log_level)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|e| {
                LifecycleError::StartFailed(format!("could not spawn {}: {}", binary.display(), e))
            })?;

        if process::wait_for_port(&config.host, config.port, STARTUP_TIMEOUT) {
            // The child may have bound and immediately died; re-check.
            if let Ok(Some(status)) = child.try_wait() {
                self.clear_pid();
                return Err(LifecycleError::StartFailed(format!(
                    "server exited during startup with {}\n{}",
                    status,
                    self.log_tail(20)
                )));
            }
            let pid = child.id();
            self.write_pid(pid)?;
            info!("Server started with pid {}", pid);
            Ok(pid)
        } else {
            let _ = child.kill();
            let _ = child.wait();
            self.clear_pid();
            Err(LifecycleError::StartFailed(format!(
                "did not bind {}:{} within {:?}\n{}",
                config.host,
                config.port,
                STARTUP_TIMEOUT,
                self.log_tail(20)
            )))
        }
    }

    /// Stops the supervised server. Stopping an already-stopped server (or
    /// clearing a stale PID file) is a success.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        let Some(pid) = self.read_pid() else {
            info!("No PID file; server already stopped");
            return Ok(());
        };

        if !process::pid_alive(pid) || !process::matches_signature(pid, SERVER_SIGNATURE) {
            info!("Stale PID file for {}; clearing it", pid);
            self.clear_pid();
            return Ok(());
        }

        info!("Stopping server pid {} (SIGTERM)", pid);
        process::terminate(pid, false);

        let deadline = std::time::Instant::now() + STOP_TIMEOUT;
        while std::time::Instant::now() < deadline && process::pid_alive(pid) {
            std::thread::sleep(Duration::from_millis(200));
        }

        if process::pid_alive(pid) {
            warn!("Server pid {} survived SIGTERM; sending SIGKILL", pid);
            process::terminate(pid, true);
            std::thread::sleep(Duration::from_millis(500));
        }

        self.clear_pid();
        info!("Server stopped");
        Ok(())
    }

    /// Stop followed by start. Not atomic: a start failure leaves the
    /// service stopped and surfaces the error.
    pub fn restart(&self, force: bool) -> Result<u32, LifecycleError> {
        self.stop()?;
        self.start(force)
    }

    /// Reports the current state, demoting to not-running (and clearing the
    /// stale PID file) when any validation point fails
    pub fn status(&self) -> StatusReport {
        let config = self.load_config();

        let Some(pid) = self.read_pid() else {
            return StatusReport::stopped(config.port);
        };

        match self.validated_pid(&config) {
            Some(pid) => {
                let stats = process::process_stats(pid);
                StatusReport {
                    running: true,
                    state: ServerHealth::Running,
                    pid: Some(pid),
                    uptime_secs: stats.map(|s| s.0),
                    cpu_percent: stats.map(|s| s.1),
                    rss_bytes: stats.map(|s| s.2),
                    port: config.port,
                }
            }
            None => {
                info!("PID {} failed validation; clearing stale PID file", pid);
                self.clear_pid();
                StatusReport {
                    state: ServerHealth::Unhealthy,
                    ..StatusReport::stopped(config.port)
                }
            }
        }
    }

    /// Prints the last `lines` of the log; with `follow`, keeps streaming
    /// appended bytes until interrupted
    pub fn logs(&self, lines: usize, follow: bool) -> Result<(), LifecycleError> {
        for line in self.tail_lines(lines)? {
            println!("{}", line);
        }

        if follow {
            let mut file = std::fs::File::open(&self.log_file)?;
            let mut offset = file.seek(SeekFrom::End(0))?;
            loop {
                std::thread::sleep(Duration::from_millis(500));
                let len = file.metadata()?.len();
                if len < offset {
                    // Log was truncated or rotated; start over.
                    offset = 0;
                }
                if len > offset {
                    file.seek(SeekFrom::Start(offset))?;
                    let mut buf = String::new();
                    file.read_to_string(&mut buf)?;
                    offset = len;
                    print!("{}", buf);
                }
            }
        }
        Ok(())
    }

    /// The last `lines` lines of the log file
    pub fn tail_lines(&self, lines: usize) -> Result<Vec<String>, LifecycleError> {
        let file = match std::fs::File::open(&self.log_file) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let all: Vec<String> = BufReader::new(file).lines().map_while(Result::ok).collect();
        let skip = all.len().saturating_sub(lines);
        Ok(all.into_iter().skip(skip).collect())
    }

    fn log_tail(&self, lines: usize) -> String {
        self.tail_lines(lines).unwrap_or_default().join("\n")
    }

    /// Terminates every process listening on `port`: SIGTERM first, SIGKILL
    /// after a short grace period. Succeeds iff the port is free at the
    /// end; a free port is a no-op success.
    pub fn kill_port(&self, port: u16) -> Result<(), LifecycleError> {
        let holders = process::pids_listening_on(port);
        if holders.is_empty() && !process::port_in_use("127.0.0.1", port) {
            info!("Port {} is already free", port);
            return Ok(());
        }

        for pid in &holders {
            info!("Terminating pid {} holding port {}", pid, port);
            process::terminate(*pid, false);
        }

        if !process::wait_for_port_free("127.0.0.1", port, KILL_PORT_GRACE) {
            for pid in process::pids_listening_on(port) {
                warn!("Pid {} survived SIGTERM; sending SIGKILL", pid);
                process::terminate(pid, true);
            }
        }

        if process::wait_for_port_free("127.0.0.1", port, Duration::from_secs(2)) {
            Ok(())
        } else {
            Err(LifecycleError::Other(format!(
                "port {} is still in use after kill",
                port
            )))
        }
    }
}

/// Resolves the server binary: a `docforge` sibling of the current
/// executable when present, the PATH lookup otherwise
fn server_binary() -> PathBuf {
    if let Ok(current) = std::env::current_exe() {
        if let Some(dir) = current.parent() {
            let sibling = dir.join(SERVER_SIGNATURE);
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from(SERVER_SIGNATURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn temp_manager(tag: &str) -> (ServerManager, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "docforge-lifecycle-{}-{}",
            tag,
            uuid::Uuid::new_v4()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let manager = ServerManager::with_paths(
            dir.join(".backend.pid"),
            dir.join("backend.log"),
            dir.join(".backend_config.json"),
        );
        (manager, dir)
    }

    #[test]
    fn test_config_defaults_and_patch() {
        let (manager, dir) = temp_manager("config");
        assert_eq!(manager.load_config(), ServerConfig::default());

        let updated = manager
            .patch_config(ConfigPatch {
                port: Some(8100),
                reload: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.port, 8100);
        assert!(updated.reload);

        // A later patch preserves earlier changes.
        let updated = manager
            .patch_config(ConfigPatch {
                host: Some("0.0.0.0".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.port, 8100);
        assert_eq!(updated.host, "0.0.0.0");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_config_falls_back_to_defaults() {
        let (manager, dir) = temp_manager("corrupt");
        std::fs::write(dir.join(".backend_config.json"), "not json").unwrap();
        assert_eq!(manager.load_config(), ServerConfig::default());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_status_without_pid_file_is_stopped() {
        let (manager, dir) = temp_manager("status");
        let report = manager.status();
        assert!(!report.running);
        assert_eq!(report.state, ServerHealth::Stopped);
        assert!(report.pid.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_stale_pid_file_is_cleared() {
        let (manager, dir) = temp_manager("stale");
        std::fs::write(dir.join(".backend.pid"), "3999999").unwrap();

        let report = manager.status();
        assert!(!report.running);
        assert_eq!(report.state, ServerHealth::Unhealthy);
        assert!(!dir.join(".backend.pid").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_stop_without_pid_file_succeeds() {
        let (manager, dir) = temp_manager("stop");
        assert!(manager.stop().is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_stop_with_stale_pid_clears_it() {
        let (manager, dir) = temp_manager("stop-stale");
        std::fs::write(dir.join(".backend.pid"), "3999999").unwrap();
        assert!(manager.stop().is_ok());
        assert!(!dir.join(".backend.pid").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_kill_port_on_free_port_is_noop_success() {
        let (manager, dir) = temp_manager("killport");
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        assert!(manager.kill_port(port).is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_tail_lines_of_missing_log_is_empty() {
        let (manager, dir) = temp_manager("logs");
        assert!(manager.tail_lines(10).unwrap().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_tail_lines_returns_last_n() {
        let (manager, dir) = temp_manager("tail");
        let contents: String = (1..=30).map(|i| format!("line {}\n", i)).collect();
        std::fs::write(dir.join("backend.log"), contents).unwrap();

        let tail = manager.tail_lines(5).unwrap();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0], "line 26");
        assert_eq!(tail[4], "line 30");
        std::fs::remove_dir_all(&dir).ok();
    }
}
