//! Command-line Test Suite
//!
//! Drives the `s-rna-tools` binary. BLAST+ is replaced by small shell
//! scripts so the adapter, timeouts and output files can be checked on
//! machines without it.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn s_rna_tools_cmd() -> Command {
    Command::cargo_bin("s-rna-tools").unwrap()
}

fn create_test_fasta(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Write an executable shell script
#[cfg(unix)]
fn create_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Stand-in for makeblastdb: accepts plain FASTA only and creates the three
/// core database files
#[cfg(unix)]
const FAKE_MAKEBLASTDB: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    -in) input="$2"; shift ;;
    -out) out="$2"; shift ;;
  esac
  shift
done
if [ "$(head -c 1 "$input")" != ">" ]; then
  echo "FASTA-Reader: Ignoring invalid residues" >&2
  exit 3
fi
touch "$out.nhr" "$out.nin" "$out.nsq"
"#;

/// Stand-in for blastn: any query containing AAAA hits q1
#[cfg(unix)]
const FAKE_BLASTN: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    -version) echo "blastn: 2.15.0+"; exit 0 ;;
    -query) query="$2"; shift ;;
  esac
  shift
done
if grep -q AAAA "$query"; then
  printf 'q1\tr1\t100.000\t4\t0\t0\t1\t4\t1\t4\t1.2e-02\t8.1\n'
fi
"#;

#[test]
fn test_help_lists_find_match() {
    s_rna_tools_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("find-match"));
}

#[test]
fn test_find_match_help_lists_modes() {
    s_rna_tools_cmd()
        .args(["find-match", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("known"))
        .stdout(predicate::str::contains("unknown"))
        .stdout(predicate::str::contains("--out-folder"));
}

#[test]
fn test_missing_subject_fails_without_output() {
    let temp = TempDir::new().unwrap();
    let query = create_test_fasta(temp.path(), "query.fa", ">q1\nAAAA\n");
    let out = temp.path().join("results");

    s_rna_tools_cmd()
        .arg("find-match")
        .arg("-q")
        .arg(&query)
        .arg("-s")
        .arg(temp.path().join("missing.fa"))
        .arg("-o")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"))
        .stderr(predicate::str::contains("missing.fa"));

    assert!(!out.exists());
}

#[test]
fn test_missing_path_is_required_without_terminal() {
    let temp = TempDir::new().unwrap();
    let query = create_test_fasta(temp.path(), "query.fa", ">q1\nAAAA\n");

    s_rna_tools_cmd()
        .arg("find-match")
        .arg("-q")
        .arg(&query)
        .arg("-o")
        .arg(temp.path().join("results"))
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--subject is required"));
}

#[test]
fn test_unknown_mode_rejects_invalid_mode() {
    s_rna_tools_cmd()
        .args(["find-match", "-q", "a.fa", "-s", "b.fa", "-o", "out", "-m", "partial"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_missing_engine_is_reported() {
    let temp = TempDir::new().unwrap();
    let query = create_test_fasta(temp.path(), "query.fa", ">q1\nAAAA\n");
    let subject = create_test_fasta(temp.path(), "subject.fa", ">r1\nAAAA\n");

    s_rna_tools_cmd()
        .arg("find-match")
        .arg("-q")
        .arg(&query)
        .arg("-s")
        .arg(&subject)
        .arg("-o")
        .arg(temp.path().join("results"))
        .args(["--makeblastdb", "makeblastdb-not-installed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("makeblastdb-not-installed"));
}

#[cfg(unix)]
#[test]
fn test_unknown_mode_writes_unmatched_table() {
    let temp = TempDir::new().unwrap();
    let makeblastdb = create_script(temp.path(), "makeblastdb", FAKE_MAKEBLASTDB);
    let blastn = create_script(temp.path(), "blastn", FAKE_BLASTN);
    let query = create_test_fasta(temp.path(), "query.fa", ">q1\nAAAA\n");
    let subject = create_test_fasta(temp.path(), "subject.fa", ">r1\nAAAA\n>r2\nCCCC\n");
    let out = temp.path().join("results");

    s_rna_tools_cmd()
        .arg("find-match")
        .arg("-q")
        .arg(&query)
        .arg("-s")
        .arg(&subject)
        .arg("-o")
        .arg(&out)
        .args(["-m", "unknown"])
        .arg("--makeblastdb")
        .arg(&makeblastdb)
        .arg("--blastn")
        .arg(&blastn)
        .assert()
        .success()
        .stdout(predicate::str::contains("Unmatched: 1"));

    assert_eq!(fs::read_to_string(out.join("unmatched.tsv")).unwrap(), "r2\tCCCC\n");
    assert!(out.join("blast_db").join("query.nsq").exists());
    assert_eq!(fs::read_dir(out.join("tmp_seq")).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn test_known_mode_writes_hit_table_as_json_summary() {
    let temp = TempDir::new().unwrap();
    let makeblastdb = create_script(temp.path(), "makeblastdb", FAKE_MAKEBLASTDB);
    let blastn = create_script(temp.path(), "blastn", FAKE_BLASTN);
    let query = create_test_fasta(temp.path(), "query.fa", ">q1\nAAAA\n");
    let subject = create_test_fasta(temp.path(), "subject.fa", ">r1\nAAAA\n>r2\nCCCC\n");
    let out = temp.path().join("results");

    s_rna_tools_cmd()
        .args(["--format", "json", "find-match"])
        .arg("-q")
        .arg(&query)
        .arg("-s")
        .arg(&subject)
        .arg("-o")
        .arg(&out)
        .env("S_RNA_TOOLS_MAKEBLASTDB", &makeblastdb)
        .env("S_RNA_TOOLS_BLASTN", &blastn)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"mode\": \"known\""))
        .stdout(predicate::str::contains("\"hit_count\": 1"));

    assert_eq!(
        fs::read_to_string(out.join("blast_results.tsv")).unwrap(),
        "q1\tr1\t100.000\t4\t0\t0\t1\t4\t1\t4\t1.2e-02\t8.1\n"
    );
    assert!(!out.join("tmp_seq").exists());
}

#[cfg(unix)]
#[test]
fn test_known_mode_without_hits_reports_and_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let makeblastdb = create_script(temp.path(), "makeblastdb", FAKE_MAKEBLASTDB);
    let blastn = create_script(temp.path(), "blastn", FAKE_BLASTN);
    let query = create_test_fasta(temp.path(), "query.fa", ">q1\nGGGG\n");
    let subject = create_test_fasta(temp.path(), "subject.fa", ">r1\nCCCC\n");
    let out = temp.path().join("results");

    s_rna_tools_cmd()
        .arg("find-match")
        .arg("-q")
        .arg(&query)
        .arg("-s")
        .arg(&subject)
        .arg("-o")
        .arg(&out)
        .arg("--makeblastdb")
        .arg(&makeblastdb)
        .arg("--blastn")
        .arg(&blastn)
        .assert()
        .success()
        .stderr(predicate::str::contains("Not found any match with the query file"));

    assert!(!out.join("blast_results.tsv").exists());
}

#[cfg(unix)]
#[test]
fn test_unresponsive_engine_stops_after_retry() {
    let temp = TempDir::new().unwrap();
    let makeblastdb = create_script(temp.path(), "makeblastdb", FAKE_MAKEBLASTDB);
    let blastn = create_script(temp.path(), "blastn", "exec sleep 30\n");
    let query = create_test_fasta(temp.path(), "query.fa", ">q1\nAAAA\n");
    let subject = create_test_fasta(temp.path(), "subject.fa", ">r1\nAAAA\n>r2\nCCCC\n");
    let out = temp.path().join("results");

    s_rna_tools_cmd()
        .arg("find-match")
        .arg("-q")
        .arg(&query)
        .arg("-s")
        .arg(&subject)
        .arg("-o")
        .arg(&out)
        .args(["-m", "unknown", "--timeout-secs", "1"])
        .arg("--makeblastdb")
        .arg(&makeblastdb)
        .arg("--blastn")
        .arg(&blastn)
        .assert()
        .failure()
        .stderr(predicate::str::contains("retrying once"))
        .stderr(predicate::str::contains("even after a retry"));

    assert!(!out.join("unmatched.tsv").exists());
    assert_eq!(fs::read_dir(out.join("tmp_seq")).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn test_failed_searches_give_nonzero_exit_after_writing() {
    let temp = TempDir::new().unwrap();
    let makeblastdb = create_script(temp.path(), "makeblastdb", FAKE_MAKEBLASTDB);
    // Fails for r2 only
    let blastn = create_script(
        temp.path(),
        "blastn",
        r#"
while [ $# -gt 0 ]; do
  case "$1" in
    -query) query="$2"; shift ;;
  esac
  shift
done
if grep -q r2 "$query"; then
  echo "BLAST query/options error: bad sequence" >&2
  exit 1
fi
"#,
    );
    let query = create_test_fasta(temp.path(), "query.fa", ">q1\nAAAA\n");
    let subject =
        create_test_fasta(temp.path(), "subject.fa", ">r1\nAAAA\n>r2\nCCCC\n>r3\nGGGG\n");
    let out = temp.path().join("results");

    s_rna_tools_cmd()
        .arg("find-match")
        .arg("-q")
        .arg(&query)
        .arg("-s")
        .arg(&subject)
        .arg("-o")
        .arg(&out)
        .args(["-m", "unknown", "--format", "tsv"])
        .arg("--makeblastdb")
        .arg(&makeblastdb)
        .arg("--blastn")
        .arg(&blastn)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad sequence"))
        .stderr(predicate::str::contains("1 of 3 searches failed"));

    // r1 and r3 never hit with this blastn; r2 is left out
    assert_eq!(
        fs::read_to_string(out.join("unmatched.tsv")).unwrap(),
        "r1\tAAAA\nr3\tGGGG\n"
    );
}

#[test]
fn test_log_file_records_fatal_error() {
    let temp = TempDir::new().unwrap();
    let query = create_test_fasta(temp.path(), "query.fa", ">q1\nAAAA\n");
    let log = temp.path().join("run.log");

    s_rna_tools_cmd()
        .arg("--log-file")
        .arg(&log)
        .arg("find-match")
        .arg("-q")
        .arg(&query)
        .arg("-s")
        .arg(temp.path().join("missing.fa"))
        .arg("-o")
        .arg(temp.path().join("results"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist").count(1));

    let contents = fs::read_to_string(&log).unwrap();
    assert!(contents.contains("ERROR"));
    assert!(contents.contains("missing.fa does not exist"));
}

#[test]
fn test_log_file_records_cli_error() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("run.log");

    s_rna_tools_cmd()
        .arg("--log-file")
        .arg(&log)
        .args(["find-match", "-o", "results"])
        .write_stdin("")
        .assert()
        .failure();

    assert!(fs::read_to_string(&log)
        .unwrap()
        .contains("--query is required when not running interactively"));
}

#[cfg(unix)]
#[test]
fn test_log_file_records_progress() {
    let temp = TempDir::new().unwrap();
    let makeblastdb = create_script(temp.path(), "makeblastdb", FAKE_MAKEBLASTDB);
    let blastn = create_script(temp.path(), "blastn", FAKE_BLASTN);
    let query = create_test_fasta(temp.path(), "query.fa", ">q1\nAAAA\n");
    let subject = create_test_fasta(temp.path(), "subject.fa", ">r1\nAAAA\n>r2\nCCCC\n");
    let log = temp.path().join("run.log");

    s_rna_tools_cmd()
        .arg("--log-file")
        .arg(&log)
        .arg("find-match")
        .arg("-q")
        .arg(&query)
        .arg("-s")
        .arg(&subject)
        .arg("-o")
        .arg(temp.path().join("results"))
        .args(["-m", "unknown"])
        .arg("--makeblastdb")
        .arg(&makeblastdb)
        .arg("--blastn")
        .arg(&blastn)
        .assert()
        .success();

    let contents = fs::read_to_string(&log).unwrap();
    assert!(contents.contains("Created index"));
    assert!(contents.contains("1 of 2 sequences have no match"));
}

#[cfg(unix)]
#[test]
fn test_gzipped_inputs_are_decompressed_for_blast() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let gzip = |dir: &Path, name: &str, content: &str| {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        let path = dir.join(name);
        fs::write(&path, encoder.finish().unwrap()).unwrap();
        path
    };

    let temp = TempDir::new().unwrap();
    let makeblastdb = create_script(temp.path(), "makeblastdb", FAKE_MAKEBLASTDB);
    let blastn = create_script(temp.path(), "blastn", FAKE_BLASTN);
    let query = gzip(temp.path(), "query.fa.gz", ">q1\nAAAA\n");
    let subject = gzip(temp.path(), "subject.fa.gz", ">r1\nAAAA\n>r2\nCCCC\n");
    let out = temp.path().join("results");

    s_rna_tools_cmd()
        .arg("find-match")
        .arg("-q")
        .arg(&query)
        .arg("-s")
        .arg(&subject)
        .arg("-o")
        .arg(&out)
        .arg("--makeblastdb")
        .arg(&makeblastdb)
        .arg("--blastn")
        .arg(&blastn)
        .assert()
        .success();

    // The hit only shows up if blastn was given readable text
    assert_eq!(
        fs::read_to_string(out.join("blast_results.tsv")).unwrap(),
        "q1\tr1\t100.000\t4\t0\t0\t1\t4\t1\t4\t1.2e-02\t8.1\n"
    );
    assert!(out.join("blast_db").join("query.nsq").exists());

    // Decompressed copies are not left behind
    let leftovers: Vec<_> = fs::read_dir(out.join("blast_db"))
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().ends_with(".fa"))
        .collect();
    assert!(leftovers.is_empty());
}

#[cfg(unix)]
#[test]
fn test_verbose_reports_engine_version() {
    let temp = TempDir::new().unwrap();
    let makeblastdb = create_script(temp.path(), "makeblastdb", FAKE_MAKEBLASTDB);
    let blastn = create_script(temp.path(), "blastn", FAKE_BLASTN);
    let query = create_test_fasta(temp.path(), "query.fa", ">q1\nAAAA\n");
    let subject = create_test_fasta(temp.path(), "subject.fa", ">r1\nAAAA\n");
    let log = temp.path().join("run.log");

    s_rna_tools_cmd()
        .arg("-v")
        .arg("--log-file")
        .arg(&log)
        .arg("find-match")
        .arg("-q")
        .arg(&query)
        .arg("-s")
        .arg(&subject)
        .arg("-o")
        .arg(temp.path().join("results"))
        .arg("--makeblastdb")
        .arg(&makeblastdb)
        .arg("--blastn")
        .arg(&blastn)
        .assert()
        .success()
        .stderr(predicate::str::contains("Using blastn: 2.15.0+"));

    assert!(fs::read_to_string(&log).unwrap().contains("Using blastn: 2.15.0+"));
}
