//! End-to-end trace replay, through the library and the `memgoal` binary

use std::path::{Path, PathBuf};
use std::process::Command;

use memgoal::trace::{parse_trace, render_report, TraceReplay};
use memgoal::ProbeConfig;

fn trace_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("traces")
        .join(name)
}

fn replay_file(name: &str, config: ProbeConfig) -> String {
    let text = std::fs::read_to_string(trace_path(name)).expect("read trace fixture");
    let lines = parse_trace(&text).expect("fixture parses");
    let report = TraceReplay::new(config).run(&lines).expect("replay succeeds");
    render_report(&report).expect("report renders")
}

#[test]
fn test_cache_fill_trace_report() {
    let rendered = replay_file("cache_fill.trace", ProbeConfig::default());
    assert_eq!(
        rendered,
        "8\tCache.fill()\treturned\tPASS net=128B limit=128B allocated=192B/2 freed=64B/1\n\
         16\tLoader.read()\treturned\tFAIL net=512B limit=0B allocated=512B/1 freed=0B/0\n\
         22\tParser.parse()\traised SyntaxError: unexpected token\tPASS net=32B limit=64B allocated=32B/1 freed=0B/0\n"
    );
}

#[test]
fn test_untouched_target_passes_zero_limit() {
    let rendered = replay_file("untouched.trace", ProbeConfig::default());
    assert_eq!(
        rendered,
        "5\tNever.called()\treturned\tPASS net=0B limit=0B allocated=0B/0 freed=0B/0\n"
    );
}

#[test]
fn test_profiled_replay_appends_profile() {
    let rendered = replay_file(
        "untouched.trace",
        ProbeConfig::default().with_growth_profiling(true),
    );
    assert!(
        rendered.trim_end().ends_with("peak=0B activations=0 ignored=1"),
        "{}",
        rendered
    );
}

#[test]
fn test_cli_exit_status_follows_checks() {
    let binary = env!("CARGO_BIN_EXE_memgoal");

    let output = Command::new(binary)
        .arg("replay")
        .arg(trace_path("untouched.trace"))
        .output()
        .expect("run memgoal");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("PASS net=0B"));

    let output = Command::new(binary)
        .arg("replay")
        .arg(trace_path("cache_fill.trace"))
        .output()
        .expect("run memgoal");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("FAIL net=512B"));
}

#[test]
fn test_cli_reports_missing_trace() {
    let output = Command::new(env!("CARGO_BIN_EXE_memgoal"))
        .args(["replay", "does-not-exist.trace"])
        .output()
        .expect("run memgoal");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read trace"));
}
