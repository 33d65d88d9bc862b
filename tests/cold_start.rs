//! Scenario 1 (§8): cold start, one file, three lines.

mod common;

use claude_stats_agent::{orchestrator, state};

#[tokio::test]
async fn three_fresh_lines_are_sent_in_a_single_batch() {
    let dir = tempfile::tempdir().unwrap();
    common::write_log(
        dir.path(),
        "session.jsonl",
        &[
            common::record_line("2026-07-28T00:00:00.000Z", "a"),
            common::record_line("2026-07-28T00:00:01.000Z", "b"),
            common::record_line("2026-07-28T00:00:02.000Z", "c"),
        ],
    );

    let (url, requests) = common::spawn_stub("HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n", std::time::Duration::ZERO);
    let paths = common::test_paths(dir.path());

    orchestrator::run(paths, common::settings_for(&url)).await;

    assert_eq!(requests.load(std::sync::atomic::Ordering::SeqCst), 1, "expected exactly one batch POST");

    let committed = state::load(&dir.path().join("stats-state.json"));
    assert_eq!(committed.file_offsets.len(), 1);
    let (_, offset) = committed.file_offsets.iter().next().unwrap();
    assert_eq!(offset.offset, offset.size);
    assert_eq!(committed.recent_hashes.0.get("2026-07-28").map(|v| v.len()), Some(3));

    let buffer = claude_stats_agent::buffer::load(&dir.path().join("stats-state.buffer.json"));
    assert!(buffer.records.is_empty(), "nothing should be left pending after a clean send");
}
