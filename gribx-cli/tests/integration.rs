use assert_cmd::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const HOUR: i64 = 3_600_000;

/// `gribx` running inside `work_dir` with color disabled.
fn gribx_cmd(work_dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("gribx");
    cmd.current_dir(work_dir.path());
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Inventory for two runs in `files`, three offsets; TMP on two levels,
/// PRMSL at the surface.
fn write_inventory(dir: &Path, name: &str, runs: [i64; 2], files: [&str; 2]) {
    let mut lines = Vec::new();
    let mut pos = 0;
    for (run, file) in runs.iter().zip(files) {
        std::fs::write(dir.join(file), b"GRIB").unwrap();
        for time in [0, 6, 12] {
            for level in [850, 500] {
                pos += 100;
                lines.push(format!(
                    r#"{{"group":"TMP","file":"{file}","pos":{pos},"runtime":{run},"time":{time},"level":{level}}}"#
                ));
            }
            pos += 100;
            lines.push(format!(
                r#"{{"group":"PRMSL","file":"{file}","pos":{pos},"runtime":{run},"time":{time}}}"#
            ));
        }
    }
    std::fs::write(dir.join(name), lines.join("\n")).unwrap();
}

fn build(tmp: &TempDir, records: &str, output: &str) {
    gribx_cmd(tmp)
        .args(["build", records, "-o", output, "--top-dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Built index"));
}

// ============================================================================
// Argument handling
// ============================================================================

#[test]
fn help_lists_commands() {
    cargo_bin_cmd!("gribx")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("merge"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn verbose_quiet_conflict() {
    cargo_bin_cmd!("gribx")
        .args(["--verbose", "--quiet", "inspect", "x.ncx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

// ============================================================================
// Golden path
// ============================================================================

#[test]
fn build_inspect_find_search() {
    let tmp = TempDir::new().unwrap();
    write_inventory(tmp.path(), "gfs.jsonl", [0, 12 * HOUR], ["a.grib2", "b.grib2"]);
    build(&tmp, "gfs.jsonl", "gfs.ncx");
    assert!(tmp.path().join("gfs.ncx").exists());

    gribx_cmd(&tmp)
        .args(["inspect", "gfs.ncx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("collection"))
        .stdout(predicate::str::contains("TMP"))
        .stdout(predicate::str::contains("PRMSL"))
        .stdout(predicate::str::contains("regular"));

    gribx_cmd(&tmp)
        .args(["inspect", "gfs.ncx", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""kind": "collection""#))
        .stdout(predicate::str::contains(r#""density": 1.0"#));

    gribx_cmd(&tmp)
        .args(["find", "gfs.ncx", "TMP", "43200000", "6", "500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("File:      b.grib2"));

    gribx_cmd(&tmp)
        .args(["find", "gfs.ncx", "TMP", "43200000", "7", "500"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no record"));

    gribx_cmd(&tmp)
        .args(["find", "gfs.ncx", "TMP", "0"])
        .assert()
        .code(2);

    gribx_cmd(&tmp)
        .args(["search", "gfs.ncx", "PRMSL", "1", "7"])
        .assert()
        .success()
        .stdout("1\t6\n");

    gribx_cmd(&tmp)
        .args(["search", "gfs.ncx", "PRMSL", "1", "0", "--to", "12"])
        .assert()
        .success()
        .stdout("0\t0\n1\t6\n2\t12\n");

    gribx_cmd(&tmp)
        .args(["search", "gfs.ncx", "PRMSL", "1", "40", "--unbounded"])
        .assert()
        .code(1);

    gribx_cmd(&tmp)
        .args(["search", "gfs.ncx", "PRMSL", "1", "40"])
        .assert()
        .success()
        .stdout("2\t12\n");
}

#[test]
fn nested_time_build() {
    let tmp = TempDir::new().unwrap();
    write_inventory(tmp.path(), "gfs.jsonl", [0, 12 * HOUR], ["a.grib2", "b.grib2"]);
    gribx_cmd(&tmp)
        .args(["build", "gfs.jsonl", "-o", "nested.ncx", "--nested-time", "--top-dir"])
        .arg(tmp.path())
        .assert()
        .success();

    gribx_cmd(&tmp)
        .args(["find", "nested.ncx", "PRMSL", "0", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("File:      a.grib2"));
}

#[test]
fn rebuild_and_check_follow_update_policy() {
    let tmp = TempDir::new().unwrap();
    write_inventory(tmp.path(), "gfs.jsonl", [0, 12 * HOUR], ["a.grib2", "b.grib2"]);
    build(&tmp, "gfs.jsonl", "gfs.ncx");

    gribx_cmd(&tmp)
        .args(["build", "gfs.jsonl", "-o", "gfs.ncx", "--top-dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("is up to date"));

    gribx_cmd(&tmp)
        .args(["check", "gfs.ncx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is up to date"));

    std::fs::remove_file(tmp.path().join("b.grib2")).unwrap();
    gribx_cmd(&tmp)
        .args(["check", "gfs.ncx"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("must be rebuilt"));

    gribx_cmd(&tmp)
        .args(["check", "gfs.ncx", "--update", "nocheck"])
        .assert()
        .success();

    gribx_cmd(&tmp)
        .args(["check", "missing.ncx"])
        .assert()
        .code(3);
}

#[test]
fn merge_partitions() {
    let tmp = TempDir::new().unwrap();
    write_inventory(tmp.path(), "day1.jsonl", [0, 12 * HOUR], ["a.grib2", "b.grib2"]);
    write_inventory(tmp.path(), "day2.jsonl", [24 * HOUR, 36 * HOUR], ["c.grib2", "d.grib2"]);
    build(&tmp, "day1.jsonl", "day1.ncx");
    build(&tmp, "day2.jsonl", "day2.ncx");

    gribx_cmd(&tmp)
        .args(["merge", "day1.ncx", "day2.ncx", "-o", "gfs.ncx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Merged 2 partitions"));

    gribx_cmd(&tmp)
        .args(["inspect", "gfs.ncx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("partition"))
        .stdout(predicate::str::contains("day1, day2"));

    gribx_cmd(&tmp)
        .args(["find", "gfs.ncx", "TMP", "129600000", "12", "850"])
        .assert()
        .success()
        .stdout(predicate::str::contains("File:      d.grib2"));
}

#[test]
fn config_file_sets_cache_dir() {
    let tmp = TempDir::new().unwrap();
    write_inventory(tmp.path(), "gfs.jsonl", [0, 12 * HOUR], ["a.grib2", "b.grib2"]);
    std::fs::write(tmp.path().join("gribx.toml"), "[index]\ncache-dir = \"cache\"\n").unwrap();
    build(&tmp, "gfs.jsonl", "gfs.ncx");
    assert!(tmp.path().join("cache/gfs.ncx").exists());

    gribx_cmd(&tmp)
        .args(["inspect", "gfs.ncx"])
        .assert()
        .success();
}

#[test]
fn config_cancel_interval_applies_to_build() {
    let tmp = TempDir::new().unwrap();
    write_inventory(tmp.path(), "gfs.jsonl", [0, 12 * HOUR], ["a.grib2", "b.grib2"]);
    std::fs::write(tmp.path().join("gribx.toml"), "[index]\ncancel-check-every = 1\n").unwrap();
    build(&tmp, "gfs.jsonl", "gfs.ncx");

    std::fs::write(tmp.path().join("gribx.toml"), "[index]\ncancel-check-every = 0\n").unwrap();
    gribx_cmd(&tmp)
        .args(["build", "gfs.jsonl", "-o", "again.ncx"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cancel-check-every"));
}

// ============================================================================
// Error paths
// ============================================================================

#[test]
fn corrupt_index_suggests_rebuild() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("bad.ncx"), b"Grib2CollectionIndex garbage").unwrap();
    gribx_cmd(&tmp)
        .args(["inspect", "bad.ncx"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Corrupt index"))
        .stderr(predicate::str::contains("gribx build"));
}

#[test]
fn missing_data_file_fails_build() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("r.jsonl"),
        r#"{"group":"g","file":"nope.grib2","pos":0,"runtime":0}"#,
    )
    .unwrap();
    gribx_cmd(&tmp)
        .args(["build", "r.jsonl", "-o", "x.ncx"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot stat"));
    assert!(!tmp.path().join("x.ncx").exists());
}

#[test]
fn bad_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("gribx.toml"), "[index]\nmax-metadata-bytes = 0\n").unwrap();
    gribx_cmd(&tmp)
        .args(["inspect", "x.ncx"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("max-metadata-bytes"));
}
