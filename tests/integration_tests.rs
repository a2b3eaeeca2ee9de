mod common;

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use common::{create_nested_directory_structure, create_test_image_files, sample_png};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use zip::ZipArchive;

fn cmd() -> Command {
    Command::cargo_bin("squeeze-pack").unwrap()
}

fn zip_member_names(path: &Path) -> Vec<String> {
    let bytes = fs::read(path).unwrap();
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

#[test]
fn test_cli_help() {
    cmd().arg("--help").assert().success();
}

#[test]
fn test_subcommand_help() {
    for sub in ["compress", "batch", "pack"] {
        cmd().args([sub, "--help"]).assert().success();
    }
}

#[test]
fn test_compress_missing_args() {
    cmd().arg("compress").assert().failure();
}

#[test]
fn test_compress_nonexistent_file() {
    cmd()
        .args(["compress", "nonexistent.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nonexistent.png"));
}

#[test]
fn test_compress_invalid_quality() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("a.png");
    input.write_binary(&sample_png()).unwrap();

    cmd()
        .args(["compress", input.path().to_str().unwrap(), "-q", "0"])
        .assert()
        .failure();
    cmd()
        .args(["compress", input.path().to_str().unwrap(), "-q", "101"])
        .assert()
        .failure();
}

#[test]
fn test_compress_keeps_original_format_by_default() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("a.png");
    input.write_binary(&sample_png()).unwrap();

    cmd()
        .args(["compress", input.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("PNG"));

    temp.child("compressed-a.png").assert(predicate::path::is_file());
}

#[test]
fn test_compress_to_webp_with_output() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("a.png");
    input.write_binary(&sample_png()).unwrap();
    let output = temp.child("out.webp");

    cmd()
        .args([
            "compress",
            input.path().to_str().unwrap(),
            "-f",
            "webp",
            "-q",
            "60",
            "-o",
            output.path().to_str().unwrap(),
        ])
        .assert()
        .success();

    let bytes = fs::read(output.path()).unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WEBP");
}

#[test]
fn test_compress_unrecognized_format_falls_back_to_jpeg() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("a.png");
    input.write_binary(&sample_png()).unwrap();

    cmd()
        .args(["compress", input.path().to_str().unwrap(), "-f", "gif"])
        .assert()
        .success();

    let bytes = fs::read(temp.child("compressed-a.jpg").path()).unwrap();
    assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
}

#[test]
fn test_compress_empty_format_keeps_original() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("a.png");
    input.write_binary(&sample_png()).unwrap();

    cmd()
        .args(["compress", input.path().to_str().unwrap(), "-f", ""])
        .assert()
        .success();

    temp.child("compressed-a.png").assert(predicate::path::is_file());
    temp.child("compressed-a.jpg").assert(predicate::path::missing());
}

#[test]
fn test_compress_json_response() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("a.png");
    input.write_binary(&sample_png()).unwrap();

    let output = cmd()
        .args(["compress", input.path().to_str().unwrap(), "-f", "jpeg", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let response: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["success"], true);
    let data = &response["data"];
    assert!(data["compressedUrl"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
    assert_eq!(data["originalSize"], sample_png().len() as u64);
    assert!(data["compressedSize"].as_u64().unwrap() > 0);
    assert!(data["compressionRatio"].is_number());
}

#[test]
fn test_compress_corrupt_image_fails() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("broken.png");
    input.write_binary(b"not really a png").unwrap();

    cmd()
        .args(["compress", input.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to compress"));
    temp.child("compressed-broken.png")
        .assert(predicate::path::missing());
}

#[test]
fn test_batch_missing_args() {
    cmd().arg("batch").assert().failure();
}

#[test]
fn test_batch_nonexistent_input() {
    let temp = TempDir::new().unwrap();
    cmd()
        .args([
            "batch",
            "nonexistent",
            temp.child("out").path().to_str().unwrap(),
        ])
        .assert()
        .success();
}

#[test]
fn test_batch_one_failure_does_not_stop_the_rest() {
    let temp = TempDir::new().unwrap();
    create_test_image_files(temp.path());
    let out = temp.child("out");

    cmd()
        .args([
            "batch",
            temp.path().to_str().unwrap(),
            out.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Compressed: 2/3"))
        .stdout(predicate::str::contains("c.png"));

    out.child("a.png").assert(predicate::path::is_file());
    out.child("b.jpg").assert(predicate::path::is_file());
    out.child("c.png").assert(predicate::path::missing());
    out.child("notes.txt").assert(predicate::path::missing());
}

#[test]
fn test_batch_sequential_webp() {
    let temp = TempDir::new().unwrap();
    create_test_image_files(temp.path());
    let out = temp.child("out");

    cmd()
        .args([
            "batch",
            temp.path().to_str().unwrap(),
            out.path().to_str().unwrap(),
            "-f",
            "webp",
            "--sequential",
        ])
        .assert()
        .success();

    out.child("a.webp").assert(predicate::path::is_file());
    out.child("b.webp").assert(predicate::path::is_file());
}

#[test]
fn test_batch_recursive() {
    let temp = TempDir::new().unwrap();
    create_nested_directory_structure(temp.path());
    let out = temp.child("out");

    cmd()
        .args([
            "batch",
            temp.path().to_str().unwrap(),
            out.path().to_str().unwrap(),
            "--recursive",
        ])
        .assert()
        .success();

    out.child("nested.png").assert(predicate::path::is_file());
}

#[test]
fn test_batch_zip_packs_compressed_items() {
    let temp = TempDir::new().unwrap();
    create_test_image_files(temp.path());
    let out = temp.child("out");

    cmd()
        .args([
            "batch",
            temp.path().to_str().unwrap(),
            out.path().to_str().unwrap(),
            "--zip",
        ])
        .assert()
        .success();

    let archives: Vec<_> = fs::read_dir(out.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(archives.len(), 1);
    let name = archives[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("compressed-images-"));
    assert!(name.ends_with(".zip"));

    let members = zip_member_names(&archives[0]);
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m.starts_with("compressed-")));
}

#[test]
fn test_batch_zip_with_single_item_writes_file_directly() {
    let temp = TempDir::new().unwrap();
    temp.child("only.png").write_binary(&sample_png()).unwrap();
    let out = temp.child("out");

    cmd()
        .args([
            "batch",
            temp.path().to_str().unwrap(),
            out.path().to_str().unwrap(),
            "--zip",
            "-f",
            "jpeg",
        ])
        .assert()
        .success();

    out.child("compressed-only.jpg")
        .assert(predicate::path::is_file());
}

#[test]
fn test_batch_json_report_feeds_pack() {
    let temp = TempDir::new().unwrap();
    create_test_image_files(temp.path());
    let out = temp.child("out");

    let output = cmd()
        .args([
            "batch",
            temp.path().to_str().unwrap(),
            out.path().to_str().unwrap(),
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["outcomes"].as_array().unwrap().len(), 3);
    assert_eq!(report["images"].as_array().unwrap().len(), 2);
    assert_eq!(report["stats"]["count"], 2);

    let manifest = temp.child("report.json");
    manifest.write_binary(&output.stdout).unwrap();
    let zip_path = temp.child("packed.zip");

    cmd()
        .args([
            "pack",
            manifest.path().to_str().unwrap(),
            "-o",
            zip_path.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Packed 2 image(s)"));

    assert_eq!(zip_member_names(zip_path.path()).len(), 2);
}

#[test]
fn test_pack_skips_undecodable_entries() {
    let temp = TempDir::new().unwrap();
    let manifest = temp.child("manifest.json");
    manifest
        .write_str(
            r#"{"images": [
                {"id": "good", "compressedUrl": "data:image/png;base64,iVBORw0KGgo="},
                {"id": "broken", "compressedUrl": "not a data url"},
                {"id": "empty"}
            ]}"#,
        )
        .unwrap();
    let zip_path = temp.child("packed.zip");

    cmd()
        .args([
            "pack",
            manifest.path().to_str().unwrap(),
            "-o",
            zip_path.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Packed 1 image(s)"))
        .stdout(predicate::str::contains("broken"));

    let members = zip_member_names(zip_path.path());
    assert_eq!(members.len(), 1);
    assert!(members[0].ends_with(".png"));
}

#[test]
fn test_pack_with_nothing_usable_fails() {
    let temp = TempDir::new().unwrap();
    let manifest = temp.child("manifest.json");
    manifest.write_str(r#"{"images": []}"#).unwrap();

    cmd()
        .args(["pack", manifest.path().to_str().unwrap()])
        .current_dir(temp.path())
        .assert()
        .failure();
}

#[test]
fn test_pack_invalid_manifest() {
    let temp = TempDir::new().unwrap();
    let manifest = temp.child("manifest.json");
    manifest.write_str("{ not json").unwrap();

    cmd()
        .args(["pack", manifest.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid manifest"));
}
