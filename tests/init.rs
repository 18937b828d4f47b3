use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_heatmap"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "heatmap init failed: {}", String::from_utf8_lossy(&output.stderr));

    let config_path = dir.path().join(".heatmap.toml");
    assert!(config_path.exists(), ".heatmap.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[gerrit]"));
    assert!(content.contains("[git]"));
    assert!(content.contains("[tree]"));

    // Everything is commented out, so the defaults apply
    let config: heatmap_core::HeatmapConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.gerrit.project, "openstack/nova");
    assert_eq!(config.git.remote, "gerrit");
    assert_eq!(config.tree.prune_segments, 1);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".heatmap.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_heatmap"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".heatmap.toml")).unwrap();
    assert_eq!(content, "# existing");
}

#[test]
fn bare_invocation_prints_welcome() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_heatmap"))
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("heatmap init"));
    assert!(stdout.contains("patches"));
}

#[test]
fn patches_requires_directories() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_heatmap"))
        .arg("patches")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
}

#[test]
fn changes_subcommand_is_listed() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_heatmap"))
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&output.stdout).contains("changes"));

    let help = Command::new(env!("CARGO_BIN_EXE_heatmap"))
        .args(["changes", "--help"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(help.status.success());
    assert!(String::from_utf8_lossy(&help.stdout).contains("depend on"));
}
