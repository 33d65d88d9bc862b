//! Scenario 4 (§8): server down, then up. The first run's failed delivery
//! must survive entirely in the Pending Buffer; the next run, once the
//! server recovers, drains it.

mod common;

use claude_stats_agent::{buffer, orchestrator, state};

#[tokio::test]
async fn unsent_records_survive_in_the_buffer_until_the_server_recovers() {
    let dir = tempfile::tempdir().unwrap();
    common::write_log(
        dir.path(),
        "session.jsonl",
        &[
            common::record_line("2026-07-28T00:00:00.000Z", "a"),
            common::record_line("2026-07-28T00:00:01.000Z", "b"),
        ],
    );

    let (url, requests) = common::spawn_flaky_stub(
        "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\n\r\n",
        "HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n",
        1,
    );

    orchestrator::run(common::test_paths(dir.path()), common::settings_for(&url)).await;
    assert_eq!(requests.load(std::sync::atomic::Ordering::SeqCst), 1, "one failed attempt");

    let buffered = buffer::load(&dir.path().join("stats-state.buffer.json"));
    assert_eq!(buffered.records.len(), 2, "both records should have landed in the pending buffer");

    let mut backdated = state::load(&dir.path().join("stats-state.json"));
    backdated.last_run_timestamp -= 31_000;
    state::commit(&dir.path().join("stats-state.json"), &backdated).unwrap();

    orchestrator::run(common::test_paths(dir.path()), common::settings_for(&url)).await;

    assert_eq!(requests.load(std::sync::atomic::Ordering::SeqCst), 2, "second attempt should have succeeded");
    let drained = buffer::load(&dir.path().join("stats-state.buffer.json"));
    assert!(drained.records.is_empty(), "buffer should be fully drained once the server recovers");
}
