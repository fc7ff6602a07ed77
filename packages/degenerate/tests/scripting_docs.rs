//! Test that all Rhai code blocks in docs/scripting.md compile and run.
//!
//! Run with: cargo test --test scripting_docs

use std::fs;

use degenerate::config::EngineConfig;
use degenerate::headless::{HeadlessConfig, HeadlessHost};
use degenerate::scripting;

/// Extract all Rhai code blocks from markdown content
fn extract_rhai_blocks(content: &str) -> Vec<(usize, String)> {
    let mut blocks = Vec::new();
    let mut in_rhai_block = false;
    let mut current_block = String::new();
    let mut block_start_line = 0;

    for (line_num, line) in content.lines().enumerate() {
        if line.trim().starts_with("```rhai") {
            in_rhai_block = true;
            block_start_line = line_num + 1;
            current_block.clear();
        } else if in_rhai_block && line.trim() == "```" {
            in_rhai_block = false;
            blocks.push((block_start_line, current_block.clone()));
        } else if in_rhai_block {
            current_block.push_str(line);
            current_block.push('\n');
        }
    }

    blocks
}

fn docs() -> Vec<(usize, String)> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/docs/scripting.md");
    let content = fs::read_to_string(path).expect("Failed to read scripting.md");
    let blocks = extract_rhai_blocks(&content);
    assert!(!blocks.is_empty(), "No Rhai code blocks found in scripting.md");
    blocks
}

fn excerpt(block: &str) -> String {
    block.lines().take(3).collect::<Vec<_>>().join("\n")
}

#[test]
fn test_all_rhai_blocks_compile() {
    let config = EngineConfig::default();
    let mut errors = Vec::new();

    for (line_num, block) in docs() {
        for diagnostic in scripting::check(&block, &config) {
            errors.push(format!(
                "Block starting at line {} failed to compile:\n{}\nError: {}",
                line_num,
                excerpt(&block),
                diagnostic.message
            ));
        }
    }

    if !errors.is_empty() {
        panic!(
            "Found {} compile error(s) in scripting.md:\n\n{}",
            errors.len(),
            errors.join("\n\n---\n\n")
        );
    }
}

#[test]
fn test_all_rhai_blocks_run_without_errors() {
    let mut errors = Vec::new();

    for (line_num, block) in docs() {
        // Looping examples never finish on their own; a few frames is enough.
        let mut host = HeadlessHost::new(
            EngineConfig::default(),
            HeadlessConfig {
                frames: 4,
                ..Default::default()
            },
        );
        match host.run(&block) {
            Ok(transcript) => {
                for error in transcript.errors() {
                    errors.push(format!(
                        "Block starting at line {}:\n{}\nError: {}",
                        line_num,
                        excerpt(&block),
                        error
                    ));
                }
                assert!(transcript.done_count() <= 1);
            }
            Err(e) => errors.push(format!("Block starting at line {}: {}", line_num, e)),
        }
    }

    if !errors.is_empty() {
        panic!(
            "Found {} runtime error(s) in scripting.md:\n\n{}",
            errors.len(),
            errors.join("\n\n---\n\n")
        );
    }
}
