use std::fs;
use std::process::Command;

use kernelife_app::HeadlessReport;
use kernelife_core::{DisplayMode, Tick};

#[test]
fn headless_run_writes_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("keys.txt");
    let report_path = dir.path().join("out").join("report.json");
    fs::write(&script, "# tweak the rules then switch views\na\nwait 1\nf\n").expect("script");

    let bin = env!("CARGO_BIN_EXE_kernelife");
    let status = Command::new(bin)
        .args(["--width", "32", "--height", "32", "--ticks", "5"])
        .args(["--preset", "moore", "--seed", "1"])
        .arg("--script")
        .arg(&script)
        .arg("--report")
        .arg(&report_path)
        .env_remove("KERNELIFE_CONFIG")
        .env("RUST_LOG", "off")
        .status()
        .expect("failed to run kernelife binary");
    assert!(status.success(), "headless run failed");

    let raw = fs::read_to_string(&report_path).expect("report written");
    let report: HeadlessReport = serde_json::from_str(&raw).expect("report parses");
    assert_eq!(report.ticks, 5);
    assert_eq!(report.final_tick, Tick(5));
    assert_eq!(report.commands_applied, 2);
    assert!((report.rules.pop_max - 0.51).abs() < 1e-6);
    assert_eq!(report.display_mode, DisplayMode::Fourier);
    let spread = report.live_fraction.expect("spread");
    assert!(spread.min >= 0.0 && spread.max <= 1.0);
}

#[test]
fn invalid_dimensions_fail() {
    let status = Command::new(env!("CARGO_BIN_EXE_kernelife"))
        .args(["--width", "0", "--ticks", "1"])
        .env_remove("KERNELIFE_CONFIG")
        .env("RUST_LOG", "off")
        .status()
        .expect("failed to run kernelife binary");
    assert!(!status.success());
}
