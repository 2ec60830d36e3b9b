//! Runs of the `carwatch` binary as a scheduler would invoke it.

use std::path::Path;
use std::process::{Command, Output};

use encoding_rs::WINDOWS_1251;
use tempfile::TempDir;

fn carwatch(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_carwatch"))
        .current_dir(cwd)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .unwrap()
}

fn listing_page() -> Vec<u8> {
    let html = r#"<html><head><meta charset="windows-1251"></head><body>
        <div class="zaglavie"><a class="title" href="/obiava-1/skoda-superb">Шкода Суперб 2.0</a></div>
        <div class="zaglavie"><a class="title" href="/obiava-2/skoda-superb">Шкода Суперб 1.8</a></div>
        </body></html>"#;
    let (bytes, _, _) = WINDOWS_1251.encode(html);
    bytes.into_owned()
}

#[test]
fn unknown_flag_exits_with_failure() {
    let tmp = TempDir::new().unwrap();
    let output = carwatch(tmp.path(), &["--bogus-flag"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
}

#[test]
fn unknown_subcommand_exits_with_failure() {
    let tmp = TempDir::new().unwrap();
    let output = carwatch(tmp.path(), &["frobnicate"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn version_exits_cleanly() {
    let tmp = TempDir::new().unwrap();
    let output = carwatch(tmp.path(), &["--version"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("carwatch"));
}

#[test]
fn poll_prints_findings_and_keeps_state_where_asked() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/obiavi/skoda")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(listing_page())
        .create();

    let tmp = TempDir::new().unwrap();
    let url = format!("{}/obiavi/skoda", server.url());
    let output = carwatch(
        tmp.path(),
        &[
            "--config",
            "missing.toml",
            "poll",
            "--url",
            url.as_str(),
            "--state",
            "out/seen.json",
            "--new-report",
            "out/new.json",
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("New cars: 2"), "stdout: {stdout}");
    assert!(stdout.contains("Шкода Суперб 1.8 - "), "stdout: {stdout}");

    assert!(tmp.path().join("out/seen.json").exists());
    assert!(tmp.path().join("out/new.json").exists());
    assert!(!tmp.path().join("out/.lock").exists());
    assert!(!tmp.path().join("state").exists());

    mock.assert();
}

#[test]
fn poll_prints_nothing_new_on_second_run() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/obiavi/skoda")
        .with_status(200)
        .with_body(listing_page())
        .expect(2)
        .create();

    let tmp = TempDir::new().unwrap();
    let url = format!("{}/obiavi/skoda", server.url());
    let args = [
        "--config",
        "missing.toml",
        "poll",
        "--url",
        url.as_str(),
        "--state",
        "seen.json",
        "--new-report",
        "new.json",
    ];

    assert_eq!(carwatch(tmp.path(), &args).status.code(), Some(2));

    let second = carwatch(tmp.path(), &args);
    assert_eq!(second.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&second.stdout).contains("No new cars."));
}
