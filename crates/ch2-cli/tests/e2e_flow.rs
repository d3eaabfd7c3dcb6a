//! End-to-end tests for the complete ingestion flow.
//!
//! Tests the full pipeline: import → rescan → forced reimport → show → measure
//! by driving the `ch2` binary against a temporary database.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::{NamedTempFile, TempDir};

fn ch2_binary() -> String {
    env!("CARGO_BIN_EXE_ch2").to_string()
}

struct Env {
    temp: TempDir,
    config: NamedTempFile,
}

impl Env {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let mut config = NamedTempFile::new().unwrap();
        writeln!(
            config,
            "database_path = \"{}\"\n\n[measures]\nHR = \"higher\"",
            temp.path().join("ch2.db").display()
        )
        .unwrap();
        Self { temp, config }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.temp.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(ch2_binary())
            .env("HOME", self.temp.path())
            .env("XDG_CONFIG_HOME", self.temp.path().join("config"))
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.config.path())
            .args(args)
            .output()
            .expect("failed to run ch2")
    }

    fn success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "ch2 {args:?} should succeed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }
}

fn write_ride(path: &Path, heart_rates: [f64; 3]) {
    let mut content = String::new();
    for (second, hr) in heart_rates.iter().enumerate() {
        content.push_str(&format!(
            "{{\"name\":\"HR\",\"units\":\"bpm\",\"summary\":\"[max]\",\"owner\":\"monitor\",\
             \"time\":\"2018-03-01T12:00:0{second}Z\",\"kind\":\"float\",\"value\":{hr}}}\n"
        ));
    }
    std::fs::write(path, content).unwrap();
}

fn status_line<'a>(status: &'a str, label: &str) -> &'a str {
    status
        .lines()
        .find(|line| line.starts_with(label))
        .unwrap_or_else(|| panic!("missing {label} in status:\n{status}"))
}

#[test]
fn test_import_rescan_and_force() {
    let env = Env::new();
    let ride = env.path("ride.jsonl");
    write_ride(&ride, [150.4, 151.0, 152.9]);
    let ride_arg = ride.to_str().unwrap();

    let first = env.success(&["import", ride_arg]);
    assert!(first.contains("ride.jsonl: 3 statistics"), "{first}");

    let status = env.success(&["status"]);
    assert_eq!(status_line(&status, "Statistic names:"), "Statistic names: 1");
    assert_eq!(
        status_line(&status, "Statistic journals:"),
        "Statistic journals: 3"
    );

    let rescan = env.success(&["import", ride_arg]);
    assert!(
        rescan.contains("Imported 0 file(s), 0 failed, 1 unchanged"),
        "{rescan}"
    );

    let forced = env.success(&["import", "--force", ride_arg]);
    assert!(forced.contains("Imported 1 file(s)"), "{forced}");
    let status = env.success(&["status"]);
    assert_eq!(
        status_line(&status, "Statistic journals:"),
        "Statistic journals: 3"
    );

    let show = env.success(&["show", "--date", "2018-03-01"]);
    assert!(show.contains("  HR: 150bpm\n"), "{show}");
    assert!(show.contains("  HR: 152bpm\n"), "{show}");
}

#[test]
fn test_changed_file_updates_values() {
    let env = Env::new();
    let ride = env.path("ride.jsonl");
    write_ride(&ride, [150.4, 151.0, 152.9]);
    let ride_arg = ride.to_str().unwrap();
    env.success(&["import", ride_arg]);

    write_ride(&ride, [140.0, 141.0, 142.0]);
    let second = env.success(&["import", ride_arg]);
    assert!(second.contains("Imported 1 file(s)"), "{second}");

    let show = env.success(&["show", "--date", "2018-03-01"]);
    assert!(show.contains("  HR: 140bpm\n"), "{show}");
    assert!(!show.contains("150bpm"), "{show}");

    let status = env.success(&["status"]);
    assert_eq!(
        status_line(&status, "Statistic journals:"),
        "Statistic journals: 3"
    );
}

#[test]
fn test_copied_file_is_skipped() {
    let env = Env::new();
    let ride = env.path("ride.jsonl");
    write_ride(&ride, [150.4, 151.0, 152.9]);
    env.success(&["import", ride.to_str().unwrap()]);

    let copy = env.path("copy.jsonl");
    std::fs::copy(&ride, &copy).unwrap();
    let source = std::fs::File::open(&ride).unwrap();
    let modified = source.metadata().unwrap().modified().unwrap();
    std::fs::File::options()
        .write(true)
        .open(&copy)
        .unwrap()
        .set_modified(modified)
        .unwrap();

    let output = env.success(&["scan", copy.to_str().unwrap()]);
    assert_eq!(output, "");
}

#[test]
fn test_measure_ranks_imported_values() {
    let env = Env::new();
    let ride = env.path("ride.jsonl");
    write_ride(&ride, [150.4, 171.0, 160.9]);
    env.success(&["import", ride.to_str().unwrap()]);

    let output = env.success(&[
        "measure",
        "--schedule",
        "d",
        "--start",
        "2018-03-01",
        "--finish",
        "2018-03-02",
        "--interval-owner",
        "summary",
        "--name",
        "HR",
        "--owner",
        "monitor",
    ]);
    let ranked: Vec<&str> = output.lines().skip(1).collect();
    assert_eq!(ranked.len(), 3, "{output}");
    assert!(ranked[0].starts_with("  #1 100.0% Q4"), "{output}");
    assert!(ranked[0].ends_with("171bpm"), "{output}");
    assert!(ranked[2].ends_with("150bpm"), "{output}");

    let status = env.success(&["status"]);
    assert_eq!(
        status_line(&status, "Statistic measures:"),
        "Statistic measures: 3"
    );
}

#[test]
fn test_diary_entry_round_trip() {
    let env = Env::new();
    env.success(&[
        "diary",
        "--date",
        "2018-03-01",
        "--rest-hr",
        "48",
        "--weather",
        "windy",
    ]);

    let show = env.success(&["show", "--date", "2018-03-01"]);
    assert_eq!(show, "diary:\n  Rest HR: 48bpm\n  Weather: windy\n");
}

#[test]
fn test_import_missing_file_fails() {
    let env = Env::new();
    let missing = env.path("missing.jsonl");
    let output = env.run(&["import", missing.to_str().unwrap()]);
    assert!(!output.status.success());
}
