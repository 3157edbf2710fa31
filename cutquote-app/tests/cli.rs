use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

fn cutquote() -> Command {
    let mut cmd = Command::cargo_bin("cutquote").expect("binary built");
    cmd.env_remove("CUTQUOTE_CONFIG");
    cmd
}

#[test]
fn prints_minimum_price_for_small_plate() {
    cutquote()
        .arg(fixture("plate.dxf"))
        .assert()
        .success()
        .stdout(predicate::str::contains("文件: plate.dxf"))
        .stdout(predicate::str::contains("尺寸: 100 × 50 mm"))
        .stdout(predicate::str::contains("机时: 1 min"))
        .stdout(predicate::str::contains("价格: $50.00"));
}

#[test]
fn slow_material_exceeds_minimum() {
    // 362.83 mm @ 0.00075 m/s ×1.3 ≈ 629 s → 11 min
    cutquote()
        .arg(fixture("plate.dxf"))
        .args(["--material", "inox", "--thickness", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("机时: 11 min"))
        .stdout(predicate::str::contains("价格: $55.00"));
}

#[test]
fn json_output_and_preview() {
    let dir = tempfile::tempdir().expect("temp dir");
    let png = dir.path().join("plate.png");
    cutquote()
        .arg(fixture("plate.dxf"))
        .args(["--units", "in", "--json", "--zoom-steps", "2", "--pan", "-10,5"])
        .arg("--png")
        .arg(&png)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"time_minutes\""))
        .stdout(predicate::str::contains("\"width_mm\": 2540.0"));
    assert!(png.exists());
}

#[test]
fn unknown_material_fails() {
    cutquote()
        .arg(fixture("plate.dxf"))
        .args(["--material", "madera"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("未知材料: madera"));
}

#[test]
fn missing_file_fails() {
    cutquote()
        .arg(fixture("missing.dxf"))
        .assert()
        .failure();
}

#[test]
fn lists_materials() {
    cutquote()
        .arg("--list-materials")
        .assert()
        .success()
        .stdout(predicate::str::contains("aluminio (ALUMINIO)"));
}

#[test]
fn broken_config_file_fails_loudly() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = dir.path().join("broken.toml");
    std::fs::write(&config, "[pricing]\ncost_per_minute = \"cheap\"\n").expect("write config");
    cutquote()
        .arg(fixture("plate.dxf"))
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("解析配置文件"))
        .stdout(predicate::str::contains("价格").not());
}
