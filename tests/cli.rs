use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

fn write_source(dir: &Path, name: &str, text: &str) -> PathBuf {
  let path = dir.join(name);
  std::fs::write(&path, text).unwrap();
  path
}

#[test]
fn runs_with_presets() {
  let tmp_dir = tempfile::tempdir().unwrap();
  let source = write_source(tmp_dir.path(), "add.il", "LD %i0/0\nADD %i0/1\nST %q0/0\nRET\n");

  let mut cmd = Command::cargo_bin("plc-il").unwrap();
  cmd.arg("run").arg(&source).arg("--set").arg("%i0/0=1");
  cmd.assert()
      .success()
      .stdout(predicate::str::is_match(r"%q0/0 =\s+1").unwrap());
}

#[test]
fn assembles_and_disassembles() {
  let tmp_dir = tempfile::tempdir().unwrap();
  let source = write_source(tmp_dir.path(), "copy.il", "LD %i0/0\nST! %q0/1 ; inverted\nRET\n");
  let binary = tmp_dir.path().join("copy.bin");

  let mut cmd = Command::cargo_bin("plc-il").unwrap();
  cmd.arg("assemble").arg(&source).arg("-o").arg(&binary);
  cmd.assert()
      .success()
      .stdout(predicate::str::contains("3 instructions written"));
  assert_eq!(std::fs::read(&binary).unwrap().len(), 12);

  let mut cmd = Command::cargo_bin("plc-il").unwrap();
  cmd.arg("disassemble").arg(&binary);
  cmd.assert()
      .success()
      .stdout(predicate::str::contains("[0000] LD %i0/0"))
      .stdout(predicate::str::contains("[0001] ST! %q0/1"))
      .stdout(predicate::str::contains("[0002] RET"));
}

#[test]
fn listing_names_jump_targets() {
  let tmp_dir = tempfile::tempdir().unwrap();
  let source = write_source(tmp_dir.path(), "loop.il", "start:\nLD %i0/0\nJMP start\n");

  let mut cmd = Command::cargo_bin("plc-il").unwrap();
  cmd.arg("assemble").arg(&source).arg("--listing");
  cmd.assert()
      .success()
      .stdout(predicate::str::contains("[0002] JMP 1"))
      .stdout(predicate::str::contains("; start"));
  assert!(tmp_dir.path().join("loop.bin").exists());
}

#[test]
fn compile_error_is_nonzero() {
  let tmp_dir = tempfile::tempdir().unwrap();
  let source = write_source(tmp_dir.path(), "bad.il", "LD %i0/0\nFOO %q0/0\n");

  let mut cmd = Command::cargo_bin("plc-il").unwrap();
  cmd.arg("run").arg(&source);
  cmd.assert()
      .failure()
      .stderr(predicate::str::contains("line 2: unknown instruction `FOO`"));
}

#[test]
fn runtime_error_is_nonzero() {
  let tmp_dir = tempfile::tempdir().unwrap();
  let source = write_source(tmp_dir.path(), "div.il", "DIV %i0/0\nRET\n");

  let mut cmd = Command::cargo_bin("plc-il").unwrap();
  cmd.arg("run").arg(&source);
  cmd.assert()
      .failure()
      .stderr(predicate::str::contains("division by zero at 0"));
}

#[test]
fn step_limit_cancels() {
  let tmp_dir = tempfile::tempdir().unwrap();
  let source = write_source(tmp_dir.path(), "spin.il", "again:\nJMP again\n");

  let mut cmd = Command::cargo_bin("plc-il").unwrap();
  cmd.arg("run").arg(&source).arg("--limit").arg("5");
  cmd.assert()
      .code(2)
      .stderr(predicate::str::contains("cancelled after 5 instructions"));
}

#[test]
fn truncated_binary_is_rejected() {
  let tmp_dir = tempfile::tempdir().unwrap();
  let binary = tmp_dir.path().join("short.bin");
  std::fs::write(&binary, [0u8, 1, 2]).unwrap();

  let mut cmd = Command::cargo_bin("plc-il").unwrap();
  cmd.arg("disassemble").arg(&binary);
  cmd.assert()
      .failure()
      .stderr(predicate::str::contains("not a whole number"));
}

#[test]
fn bad_preset_is_rejected() {
  let tmp_dir = tempfile::tempdir().unwrap();
  let source = write_source(tmp_dir.path(), "nop.il", "RET\n");

  let mut cmd = Command::cargo_bin("plc-il").unwrap();
  cmd.arg("run").arg(&source).arg("--set").arg("%z0/0=1");
  cmd.assert()
      .failure()
      .stderr(predicate::str::contains("bad preset"));
}
