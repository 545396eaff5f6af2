use assert_cmd::Command;
use predicates::prelude::*;

fn binary() -> Command {
    let mut cmd = Command::cargo_bin("yadisk-transcriber").unwrap();
    cmd.env_remove("YADISK_TOKEN")
        .env_remove("YADISK_CLIENT_ID")
        .env_remove("YADISK_CLIENT_SECRET");
    cmd
}

#[test]
fn help_lists_commands() {
    binary()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transcribe"))
        .stdout(predicate::str::contains("token"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn version_is_printed() {
    binary()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn transcribe_requires_a_disk_token() {
    binary()
        .arg("transcribe")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--disk-token"));
}

#[test]
fn transcribe_help_mentions_prompt_and_upload_flags() {
    binary()
        .args(["transcribe", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--source"))
        .stdout(predicate::str::contains("--no-upload"))
        .stdout(predicate::str::contains("--upload-to"));
}
