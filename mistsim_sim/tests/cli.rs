//! End-to-end checks of the `mistsim` binary.

use std::process::Command;

fn mistsim() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mistsim"))
}

#[test]
fn test_json_mode_prints_only_the_summary() {
    let output = mistsim()
        .args(["--json", "-S", "three_node", "-d", "20"])
        .output()
        .unwrap();

    let stdout = String::from_utf8(output.stdout).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["total"], 1);
    assert_eq!(summary["results"][0]["scenario"], "three_node");

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Starting scenario"));
}

#[test]
fn test_export_writes_frames() {
    let path = std::env::temp_dir().join(format!("mistsim_export_{}.json", std::process::id()));
    let path_str = path.to_str().unwrap();
    let output = mistsim()
        .args(["-S", "three_node", "-d", "20", "--export", path_str])
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = std::fs::read_to_string(&path).unwrap();
    let export: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(export["scenario"], "three_node");
    assert_eq!(export["passed"], true);
    assert!(!export["frames"].as_array().unwrap().is_empty());
    std::fs::remove_file(&path).unwrap();
}
