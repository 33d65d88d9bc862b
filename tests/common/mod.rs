//! Shared scaffolding for the end-to-end scenario tests: an isolated state
//! directory plus a minimal hand-rolled HTTP/1.1 stub standing in for the
//! remote aggregation server (the corpus does not pull in a mocking crate
//! for this, so one is not introduced here either).

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use claude_stats_agent::config::Settings;
use claude_stats_agent::orchestrator::Paths;

pub fn test_paths(root: &Path) -> Paths {
    Paths {
        state: root.join("stats-state.json"),
        buffer: root.join("stats-state.buffer.json"),
        lock: root.join("stats.lock"),
        log_roots: vec![root.to_path_buf()],
    }
}

pub fn settings_for(server_url: &str) -> Settings {
    Settings {
        username: "alice".into(),
        server_url: server_url.to_string(),
        enabled: true,
    }
}

pub fn write_log(root: &Path, name: &str, lines: &[String]) -> PathBuf {
    let projects = root.join("projects");
    std::fs::create_dir_all(&projects).unwrap();
    let path = projects.join(name);
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

pub fn append_log(path: &Path, lines: &[String]) {
    let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

pub fn record_line(ts: &str, id: &str) -> String {
    format!(
        r#"{{"timestamp":"{ts}","message":{{"usage":{{"input_tokens":1,"output_tokens":1}},"id":"{id}"}}}}"#
    )
}

/// Spawns a stub server that always answers `status_line` to every request,
/// after an optional per-response `delay`. Returns the base URL and a shared
/// counter of how many requests it has handled so far.
pub fn spawn_stub(status_line: &'static str, delay: Duration) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let counted = count.clone();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(_) => break,
            };
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            let mut buf = [0u8; 8192];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(status_line.as_bytes());
            counted.fetch_add(1, Ordering::SeqCst);
        }
    });

    (format!("http://{addr}"), count)
}

/// A stub that flips from one status line to another after `flip_after`
/// requests, modeling a server that comes back up after an outage.
pub fn spawn_flaky_stub(
    first_status: &'static str,
    later_status: &'static str,
    flip_after: usize,
) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let counted = count.clone();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(_) => break,
            };
            let seen = counted.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 8192];
            let _ = stream.read(&mut buf);
            let status = if seen < flip_after { first_status } else { later_status };
            let _ = stream.write_all(status.as_bytes());
        }
    });

    (format!("http://{addr}"), count)
}
