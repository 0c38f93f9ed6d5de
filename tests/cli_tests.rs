//! End-to-end tests of the crispr-lab command line.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Three forward NGG sites: TGG at 32, CGG at 43, AGG at 55
const TARGET: &str = "ATGGCTAGCTAGGACTGACTTACAGATCATCATGGTTACCGATCGGATCCAGTCAAGGCTTACG";

/// Translates to MKQWPGFK
const CODING: &str = "ATGAAACAGTGGCCCGGATTTAAA";

const GUIDE: &str = "GACTGACTTACAGATCATCA";

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn reverse_complement(bases: &str) -> String {
    bases
        .chars()
        .rev()
        .map(|c| match c {
            'A' => 'T',
            'C' => 'G',
            'G' => 'C',
            'T' => 'A',
            other => other,
        })
        .collect()
}

fn crispr_lab() -> Command {
    Command::cargo_bin("crispr-lab").unwrap()
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn background(dir: &TempDir) -> PathBuf {
    write(
        dir,
        "background.fa",
        &format!(">chr1\nNNNNTTTT{}TTTTNNNN\n>chr2\nACGTACGTACGTACGT\n", reverse_complement(GUIDE)),
    )
}

#[test]
fn test_design_text() {
    let dir = TempDir::new().unwrap();
    let target = write(&dir, "target.txt", TARGET);

    crispr_lab()
        .args(["design", target.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(GUIDE))
        .stdout(predicate::str::contains("Location: target:13-32(+)"))
        .stdout(predicate::str::contains("not searched"));
}

#[test]
fn test_design_json_is_ranked() {
    let dir = TempDir::new().unwrap();
    let target = write(&dir, "target.fa", &format!(">exon1\n{TARGET}\n"));
    let bg = background(&dir);

    let json = json_output(crispr_lab().args([
        "design",
        target.to_str().unwrap(),
        "--background",
        bg.to_str().unwrap(),
        "--format",
        "json",
    ]));

    assert_eq!(json["off_target_strategy"], "direct-scan");
    let guides = json["guides"].as_array().unwrap();
    assert!(!guides.is_empty());

    let composites: Vec<f64> = guides
        .iter()
        .map(|g| g["score"]["composite"].as_f64().unwrap())
        .collect();
    for pair in composites.windows(2) {
        assert!(pair[0] >= pair[1], "{composites:?}");
    }
    for c in &composites {
        assert!((0.0..=1.0).contains(c));
    }

    // The planted site is found for the matching guide
    let planted = guides.iter().find(|g| g["protospacer"] == GUIDE).unwrap();
    assert_eq!(planted["target"], "exon1");
    assert_eq!(planted["off_targets"]["count"], 1);
    assert_eq!(planted["off_targets"]["hits"][0]["strand"], "reverse");
}

#[test]
fn test_design_csv() {
    let dir = TempDir::new().unwrap();
    let target = write(&dir, "target.txt", TARGET);

    crispr_lab()
        .args(["design", target.to_str().unwrap(), "-f", "csv", "-n", "2"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("rank,target,start,end,strand,protospacer"))
        .stdout(predicate::function(|out: &str| out.lines().count() == 3));
}

#[test]
fn test_design_from_stdin() {
    crispr_lab()
        .args(["design", "-", "--format", "tsv"])
        .write_stdin(TARGET.to_lowercase())
        .assert()
        .success()
        .stdout(predicate::str::contains("stdin\t"));
}

#[test]
fn test_design_from_stdin_fasta_with_leading_blank_line() {
    crispr_lab()
        .args(["design", "-"])
        .write_stdin(format!("\n>exon7\n{TARGET}\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Location: exon7:13-32(+)"));
}

#[test]
fn test_design_rejects_invalid_symbol() {
    let dir = TempDir::new().unwrap();
    let target = write(&dir, "bad.txt", "ACGTXACGTACGTACGTACGTAGG");

    crispr_lab()
        .args(["design", target.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized symbol 'X'"));
}

#[test]
fn test_design_rejects_bad_gc_bounds() {
    let dir = TempDir::new().unwrap();
    let target = write(&dir, "target.txt", TARGET);

    crispr_lab()
        .args(["design", target.to_str().unwrap(), "--min-gc", "70", "--max-gc", "30"])
        .assert()
        .failure();
}

#[test]
fn test_offtarget_finds_reverse_complement() {
    let dir = TempDir::new().unwrap();
    let bg = background(&dir);

    let json = json_output(crispr_lab().args([
        "offtarget",
        GUIDE,
        "--background",
        bg.to_str().unwrap(),
        "-f",
        "json",
    ]));

    assert_eq!(json["status"], "complete");
    let hits = json["hits"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["sequence"], "chr1");
    assert_eq!(hits[0]["position"], 8);
    assert_eq!(hits[0]["strand"], "reverse");
    assert_eq!(hits[0]["mismatches"], 0);
    assert_eq!(hits[0]["site"], GUIDE);
}

#[test]
fn test_offtarget_requires_background() {
    crispr_lab()
        .args(["offtarget", GUIDE])
        .assert()
        .failure();
}

#[test]
fn test_index_then_design() {
    let dir = TempDir::new().unwrap();
    let bg = background(&dir);
    let index = dir.path().join("background.idx");
    let target = write(&dir, "target.txt", TARGET);

    crispr_lab()
        .args(["index", bg.to_str().unwrap(), "-o", index.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sequences:    2"));
    assert!(Path::new(&index).exists());

    let json = json_output(crispr_lab().args([
        "design",
        target.to_str().unwrap(),
        "--index",
        index.to_str().unwrap(),
        "-f",
        "json",
    ]));
    assert_eq!(json["off_target_strategy"], "seed-index");
    let planted = json["guides"]
        .as_array()
        .unwrap()
        .iter()
        .find(|g| g["protospacer"] == GUIDE)
        .unwrap();
    assert_eq!(planted["off_targets"]["count"], 1);
}

#[test]
fn test_index_rejects_garbage_file() {
    let dir = TempDir::new().unwrap();
    let target = write(&dir, "target.txt", TARGET);
    let garbage = write(&dir, "garbage.idx", "definitely not an index");

    crispr_lab()
        .args([
            "design",
            target.to_str().unwrap(),
            "--index",
            garbage.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load index"));
}

#[test]
fn test_simulate_single_base_deletion() {
    let dir = TempDir::new().unwrap();
    let coding = write(&dir, "cds.txt", CODING);

    let json = json_output(crispr_lab().args([
        "simulate",
        coding.to_str().unwrap(),
        "--position",
        "4",
        "-f",
        "json",
    ]));

    assert_eq!(json["edit"], "del1");
    assert_eq!(json["frameshift"], true);
    assert_eq!(json["premature_stop"], false);
    assert_eq!(json["protein_before"], "MKQWPGFK");
    assert_eq!(json["protein_after"], "MNSGPDL");
    assert_eq!(json["indel_scan"].as_array().unwrap().len(), 6);
}

#[test]
fn test_simulate_at_guide_cut_site() {
    let dir = TempDir::new().unwrap();
    let coding = write(&dir, "cds.txt", CODING);

    // Forward guide at 2; Cas9 cuts 3 nt from the PAM
    let json = json_output(crispr_lab().args([
        "simulate",
        coding.to_str().unwrap(),
        "--guide",
        "GAAACAGTGGCCCGGATTTA",
        "--edit",
        "del3",
        "-f",
        "json",
    ]));

    assert_eq!(json["position"], 19);
    assert_eq!(json["guide"]["strand"], "forward");
    assert_eq!(json["frameshift"], false);
}

#[test]
fn test_simulate_rejects_deletion_past_end() {
    let dir = TempDir::new().unwrap();
    let coding = write(&dir, "cds.txt", CODING);

    crispr_lab()
        .args([
            "simulate",
            coding.to_str().unwrap(),
            "--position",
            "5",
            "--edit",
            &format!("del{}", usize::MAX),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the"));
}

#[test]
fn test_simulate_requires_site() {
    let dir = TempDir::new().unwrap();
    let coding = write(&dir, "cds.txt", CODING);

    crispr_lab()
        .args(["simulate", coding.to_str().unwrap()])
        .assert()
        .failure();
}
