use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::{Value, json};

fn run_cli(cache_root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lectio"))
        .args(args)
        .arg("--cache-root")
        .arg(cache_root)
        .env("RUST_LOG", "warn")
        .output()
        .expect("command runs")
}

fn run_ok(cache_root: &Path, args: &[&str]) -> String {
    let output = run_cli(cache_root, args);
    assert!(
        output.status.success(),
        "command failed: args={args:?}\nstdout={}\nstderr={}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf8 stdout")
}

fn run_json(cache_root: &Path, args: &[&str]) -> Value {
    serde_json::from_str(&run_ok(cache_root, args)).expect("json stdout")
}

fn write_dataset(dir: &Path) -> String {
    let verse = |id: i64, reference: &str| {
        json!({
            "id": id,
            "rank": id,
            "reference": reference,
            "scripture_verse_id": 100 + id,
            "scripture_rank": id,
            "char_count": 10
        })
    };
    let dataset = json!({
        "verses": [
            verse(1, "Jn 1:1"),
            verse(2, "Jn 1:2"),
            verse(3, "Jn 1:3"),
            verse(4, "Jn 1:4"),
            verse(5, "Jn 1:5")
        ],
        "lections": [
            {"id": 10, "description": "Jn 1:1-2", "verses": [1, 2]},
            {"id": 11, "description": "Jn 1:3-4", "verses": [3, 4]},
            {"id": 12, "description": "Jn 1:5", "verses": [5]}
        ],
        "systems": [
            {"id": 1, "name": "Sunday", "memberships": [
                {"id": 102, "lection": 12, "order": 3, "day_id": 3, "day": "Tuesday"},
                {"id": 100, "lection": 10, "order": 1, "day_id": 1, "day": "Easter"},
                {"id": 101, "lection": 11, "order": 2, "day_id": 2, "day": "Monday"}
            ]}
        ],
        "witnesses": [
            {"siglum": "L1", "kind": "lectionary", "system": "Sunday", "transcriptions": [
                {"verse": 1, "text": "en arche en o logos"},
                {"verse": 2, "text": "outos en en arche"},
                {"verse": 3, "text": "panta di autou"},
                {"verse": 4, "text": "en auto zoe en"},
                {"verse": 5, "text": "kai to phos"}
            ]},
            {"siglum": "A", "kind": "continuous_text", "transcriptions": [
                {"verse": 101, "text": "en  arche en o logos"},
                {"verse": 102, "text": "outos en en arche"},
                {"verse": 103, "text": "panta di autou"},
                {"verse": 104, "text": "en auto zoe en"},
                {"verse": 105, "text": "kai to phos"}
            ]},
            {"siglum": "B", "kind": "continuous_text", "transcriptions": [
                {"verse": 101, "text": "wxyqwxyqwxyqwxyqwxy"}
            ]},
            {"siglum": "C", "kind": "continuous_text", "transcriptions": []}
        ]
    });

    let path = dir.join("dataset.json");
    fs::write(&path, serde_json::to_vec_pretty(&dataset).expect("dataset json"))
        .expect("write dataset");
    path.display().to_string()
}

fn imported_cache() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    let dataset = write_dataset(temp.path());
    run_ok(temp.path(), &["import", "--dataset", &dataset]);
    temp
}

#[test]
fn import_writes_store_and_manifest() {
    let temp = imported_cache();
    let cache_root = temp.path();

    assert!(cache_root.join("lectio.sqlite").exists());
    let manifests: Vec<_> = fs::read_dir(cache_root.join("manifests"))
        .expect("manifest dir")
        .filter_map(|entry| entry.ok())
        .collect();
    assert_eq!(manifests.len(), 1);

    let manifest: Value =
        serde_json::from_slice(&fs::read(manifests[0].path()).expect("read manifest"))
            .expect("manifest json");
    assert_eq!(manifest["status"], "completed");
    assert_eq!(manifest["counts"]["verses"], 5);
    assert_eq!(manifest["counts"]["memberships"], 3);
    assert_eq!(manifest["counts"]["witnesses"], 4);
    assert_eq!(manifest["counts"]["transcriptions"], 11);

    run_ok(cache_root, &["status"]);
}

#[test]
fn sweep_csv_follows_system_order_and_blanks_absent_witnesses() {
    let temp = imported_cache();
    let stdout = run_ok(
        temp.path(),
        &["sweep", "--base", "L1", "--compare", "A", "--compare", "B", "--compare", "C"],
    );

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines[0],
        "Lection,Lection_Membership__id,Lection_Membership__order,A_similarity,A_probability,B_similarity,B_probability,C_similarity,C_probability"
    );
    assert_eq!(lines.len(), 3, "single-verse lection is skipped");
    assert!(lines[1].starts_with("Jn 1:1-2 in Sunday on Easter,100,1,100,"));
    assert!(lines[2].starts_with("Jn 1:3-4 in Sunday on Monday,101,2,100,"));
    assert!(lines[1].ends_with(",,"), "C has no transcriptions: {}", lines[1]);
    assert!(lines[2].ends_with(",,,,"), "B and C absent in second lection: {}", lines[2]);
}

#[test]
fn sweep_json_reports_null_for_absent_and_zero_for_disagreement() {
    let temp = imported_cache();
    let table = run_json(
        temp.path(),
        &["sweep", "--base", "L1", "--compare", "A", "--compare", "B", "--compare", "C", "--json"],
    );

    let rows = table["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["membership_id"], 100);
    assert_eq!(rows[0]["scores"][0]["similarity"], 100.0);
    assert!(rows[0]["scores"][0]["probability"].as_f64().expect("probability") > 0.5);
    assert!(rows[0]["scores"][1]["similarity"].as_f64().expect("B similarity") < 20.0);
    assert!(rows[0]["scores"][2]["similarity"].is_null());
    assert!(rows[0]["scores"][2]["probability"].is_null());
    assert_eq!(table["skipped_memberships"], 1);
}

#[test]
fn sweep_min_verses_and_order_filters_apply() {
    let temp = imported_cache();
    let table = run_json(
        temp.path(),
        &[
            "sweep", "--base", "L1", "--compare", "A", "--min-verses", "1", "--min-order", "2",
            "--json",
        ],
    );
    let ids: Vec<i64> = table["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .map(|row| row["membership_id"].as_i64().expect("id"))
        .collect();
    assert_eq!(ids, vec![101, 102]);
}

#[test]
fn sweep_writes_csv_file_when_requested() {
    let temp = imported_cache();
    let output = temp.path().join("reports/similarity.csv");
    let output_arg = output.display().to_string();
    let stdout = run_ok(
        temp.path(),
        &["sweep", "--base", "L1", "--compare", "A", "--output", &output_arg],
    );
    assert!(stdout.is_empty());
    let csv = fs::read_to_string(&output).expect("csv output");
    assert!(csv.starts_with("Lection,Lection_Membership__id"));
}

#[test]
fn families_label_verses_by_best_witness() {
    let temp = imported_cache();
    let response = run_json(
        temp.path(),
        &[
            "families", "--base", "L1", "--compare", "B", "--compare", "A", "--start-rank", "1",
            "--end-rank", "6", "--json",
        ],
    );

    let codes: Vec<u64> = response["codes"]
        .as_array()
        .expect("codes")
        .iter()
        .map(|code| code.as_u64().expect("code"))
        .collect();
    assert_eq!(codes, vec![4, 4, 4, 4, 0, 0]);
    assert_eq!(response["labels"][0], "A");
    assert_eq!(response["agreeing_memberships"]["A"], json!([100, 101]));
}

#[test]
fn coverage_and_locate_report_positions() {
    let temp = imported_cache();

    let coverage = run_json(temp.path(), &["coverage", "--witness", "L1", "--json"]);
    let rows = coverage.as_array().expect("coverage rows");
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3]["lection"], "Total");
    assert_eq!(rows[3]["verses_transcribed"], 5);
    assert_eq!(rows[3]["percentage"], 100.0);

    let located = run_json(
        temp.path(),
        &[
            "locate", "--system", "Sunday", "--verse", "1", "--mass", "25", "--to-verse", "5",
            "--json",
        ],
    );
    assert_eq!(located["verse"]["id"], 3);
    assert_eq!(located["membership_id"], 101);
    assert_eq!(located["distance"], 40);
}

#[test]
fn invalid_calibration_fails_before_sweeping() {
    let temp = imported_cache();
    let calibration = temp.path().join("calibration.json");
    fs::write(
        &calibration,
        serde_json::to_vec(&json!({
            "alignment": {"match_score": 1.0, "mismatch_score": -1.0, "gap_open": -2.0, "gap_extend": -1.0},
            "weights": [0.1, 0.2, 0.3]
        }))
        .expect("calibration json"),
    )
    .expect("write calibration");
    let calibration_arg = calibration.display().to_string();

    let output = run_cli(
        temp.path(),
        &["sweep", "--base", "L1", "--compare", "A", "--calibration-path", &calibration_arg],
    );
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("calibration weights"));
}

#[test]
fn sweep_without_store_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = run_cli(temp.path(), &["sweep", "--base", "L1", "--compare", "A"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("lectio import"));
}
