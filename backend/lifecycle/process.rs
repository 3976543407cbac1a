//! Process and port inspection.
//!
//! The discipline for trusting a PID file is three-point validation: the
//! PID exists, its command line matches the server signature, and the
//! configured port is actually accepting connections. This defeats PID
//! reuse after a crash.

use std::collections::HashSet;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::process::Command;
use std::time::{Duration, Instant};

use log::{debug, warn};
use sysinfo::{Pid, ProcessRefreshKind, RefreshKind, Signal, System};

/// How long one port probe may take
const PROBE_TIMEOUT: Duration = Duration::from_millis(250);

/// Poll interval while waiting for a port to change state
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn system_with_processes() -> System {
    System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::everything()),
    )
}

/// Whether a process with this PID currently exists
pub fn pid_alive(pid: u32) -> bool {
    system_with_processes()
        .process(Pid::from_u32(pid))
        .is_some()
}

/// Whether the process's command line carries the server signature
pub fn matches_signature(pid: u32, signature: &str) -> bool {
    let system = system_with_processes();
    let Some(process) = system.process(Pid::from_u32(pid)) else {
        return false;
    };
    process.cmd().iter().any(|arg| arg.contains(signature))
        || process.name().contains(signature)
}

/// Runtime stats of a process: (uptime seconds, cpu percent, rss bytes)
pub fn process_stats(pid: u32) -> Option<(u64, f32, u64)> {
    let system = system_with_processes();
    let process = system.process(Pid::from_u32(pid))?;
    Some((process.run_time(), process.cpu_usage(), process.memory()))
}

/// Sends a termination signal; `force` escalates to SIGKILL
pub fn terminate(pid: u32, force: bool) -> bool {
    let system = system_with_processes();
    let Some(process) = system.process(Pid::from_u32(pid)) else {
        return true;
    };
    let signal = if force { Signal::Kill } else { Signal::Term };
    match process.kill_with(signal) {
        Some(sent) => sent,
        None => {
            // Platform without that signal: fall back to the default kill.
            process.kill()
        }
    }
}

fn probe_addr(host: &str, port: u16) -> Option<SocketAddr> {
    let host = if host == "0.0.0.0" { "127.0.0.1" } else { host };
    format!("{}:{}", host, port)
        .to_socket_addrs()
        .ok()?
        .next()
}

/// Whether something is accepting connections on the port
pub fn port_in_use(host: &str, port: u16) -> bool {
    match probe_addr(host, port) {
        Some(addr) => TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok(),
        None => false,
    }
}

/// Polls until the port accepts connections or the timeout elapses
pub fn wait_for_port(host: &str, port: u16, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if port_in_use(host, port) {
            return true;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    port_in_use(host, port)
}

/// Polls until the port stops accepting connections or the timeout elapses
pub fn wait_for_port_free(host: &str, port: u16, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !port_in_use(host, port) {
            return true;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    !port_in_use(host, port)
}

/// PIDs of processes listening on a TCP port.
///
/// `lsof` is authoritative where present; the `/proc/net/tcp` scan keeps
/// the operation working on minimal Linux hosts.
pub fn pids_listening_on(port: u16) -> Vec<u32> {
    match lsof_listeners(port) {
        Ok(pids) => pids,
        Err(e) => {
            debug!("lsof unavailable ({}); falling back to /proc scan", e);
            proc_net_listeners(port).unwrap_or_else(|e| {
                warn!("failed to enumerate port {} holders: {}", port, e);
                Vec::new()
            })
        }
    }
}

fn lsof_listeners(port: u16) -> std::io::Result<Vec<u32>> {
    let output = Command::new("lsof")
        .args(["-ti", &format!("tcp:{}", port), "-sTCP:LISTEN"])
        .output()?;
    // Exit code 1 with empty output just means "no holders".
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .collect())
}

/// Parses `/proc/net/tcp{,6}` for sockets in LISTEN state on the port, then
/// resolves their inodes to PIDs through `/proc/<pid>/fd`.
fn proc_net_listeners(port: u16) -> std::io::Result<Vec<u32>> {
    const TCP_LISTEN: &str = "0A";

    let mut inodes: HashSet<String> = HashSet::new();
    for table in ["/proc/net/tcp", "/proc/net/tcp6"] {
        let Ok(contents) = std::fs::read_to_string(table) else {
            continue;
        };
        for line in contents.lines().skip(1) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 || fields[3] != TCP_LISTEN {
                continue;
            }
            let Some(local_port_hex) = fields[1].rsplit(':').next() else {
                continue;
            };
            if u16::from_str_radix(local_port_hex, 16) == Ok(port) {
                inodes.insert(fields[9].to_string());
            }
        }
    }

    if inodes.is_empty() {
        return Ok(Vec::new());
    }

    let mut pids = Vec::new();
    for entry in std::fs::read_dir("/proc")? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|n| n.parse::<u32>().ok()) else {
            continue;
        };
        let fd_dir = entry.path().join("fd");
        let Ok(fds) = std::fs::read_dir(&fd_dir) else {
            continue;
        };
        for fd in fds.flatten() {
            if let Ok(target) = std::fs::read_link(fd.path()) {
                let target = target.to_string_lossy();
                if let Some(inode) = target
                    .strip_prefix("socket:[")
                    .and_then(|s| s.strip_suffix(']'))
                {
                    if inodes.contains(inode) {
                        pids.push(pid);
                        break;
                    }
                }
            }
        }
    }
    pids.sort_unstable();
    pids.dedup();
    Ok(pids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_own_pid_is_alive() {
        assert!(pid_alive(std::process::id()));
    }

    #[test]
    fn test_unlikely_pid_is_dead() {
        // PID space on Linux tops out well below this by default.
        assert!(!pid_alive(3_999_999));
    }

    #[test]
    fn test_bound_port_is_detected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(port_in_use("127.0.0.1", port));
        drop(listener);
        assert!(wait_for_port_free("127.0.0.1", port, Duration::from_secs(2)));
    }

    #[test]
    fn test_free_port_has_no_listeners() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(pids_listening_on(port).is_empty());
    }

    #[test]
    fn test_signature_match_on_own_process() {
        // The test binary's path contains the crate name.
        assert!(matches_signature(std::process::id(), "docforge"));
    }
}
