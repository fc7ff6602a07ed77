//! The scripts under demos/ run cleanly and replay identically.

use std::fs;
use std::path::PathBuf;

use degenerate::config::EngineConfig;
use degenerate::filter::Mask;
use degenerate::headless::{HeadlessConfig, HeadlessHost, Transcript};
use degenerate::WorkerMessage;

fn demo(name: &str) -> String {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "demos", name].iter().collect();
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e))
}

fn run(name: &str, frames: u64) -> Transcript {
    let mut host = HeadlessHost::new(
        EngineConfig::default(),
        HeadlessConfig {
            frames,
            ..Default::default()
        },
    );
    let transcript = host.run(&demo(name)).unwrap();
    assert!(transcript.errors().is_empty(), "{name}: {:?}", transcript.errors());
    transcript
}

#[test]
fn test_finite_demos_finish() {
    for (name, renders) in [
        ("target.rhai", 8),
        ("x.rhai", 8),
        ("pattern.rhai", 8),
        ("default_color.rhai", 1),
        ("kaleidoscope.rhai", 16),
        ("starburst.rhai", 30),
    ] {
        let transcript = run(name, 60);
        assert!(transcript.finished, "{name} did not finish");
        assert_eq!(transcript.snapshot_count(), renders, "{name}");
        assert_eq!(transcript.done_count(), 1, "{name}");
    }
}

#[test]
fn test_reboot_clears_first() {
    let transcript = run("target.rhai", 60);
    assert_eq!(transcript.messages[0], WorkerMessage::Clear);
}

#[test]
fn test_x_toggles_wrap_between_renders() {
    let transcript = run("x.rhai", 60);
    let wraps: Vec<bool> = transcript.snapshots().map(|s| s.wrap).collect();
    assert_eq!(wraps, vec![false, true, false, true, false, true, false, true]);
}

#[test]
fn test_starburst_is_seeded() {
    let a = run("starburst.rhai", 60);
    let b = run("starburst.rhai", 60);
    assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    let masks: Vec<Mask> = a.snapshots().map(|s| s.mask).collect();
    assert!(masks.iter().any(|m| *m != masks[0]));
}

#[test]
fn test_spinning_kaleidoscope_keeps_going() {
    let transcript = run("spinning_kaleidoscope.rhai", 40);
    assert!(!transcript.finished);
    assert_eq!(transcript.done_count(), 0);
    assert!(transcript.snapshot_count() > 16);
}
