use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::{contains, is_match};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

/// Serve one HTTP-ish response on a local port, then close.
fn one_shot_server(body: &'static [u8]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 256];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        stream.write_all(body).unwrap();
    });
    port
}

#[test]
fn test_invalid_input_no_args() {
    let mut cmd = Command::cargo_bin("wiretime").unwrap();
    cmd.arg("--no-color")
        .assert()
        .failure()
        .stderr(contains("Usage"));
}

#[test]
fn test_handshake_requires_port() {
    let mut cmd = Command::cargo_bin("wiretime").unwrap();
    cmd.args(["--no-color", "handshake", "bad_input_no_colon"])
        .assert()
        .code(2)
        .stdout(contains("Error: invalid target"));
}

#[test]
fn test_refused_connection_exit_code() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut cmd = Command::cargo_bin("wiretime").unwrap();
    cmd.args(["--no-color", "--json", "handshake"])
        .arg(format!("127.0.0.1:{port}"))
        .assert()
        .code(3)
        .stdout(contains("Error: connect").and(contains("hs_time").not()));
}

#[test]
fn test_handshake_json() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let mut cmd = Command::cargo_bin("wiretime").unwrap();
    cmd.args(["--json", "handshake"])
        .arg(format!("127.0.0.1:{port}"))
        .assert()
        .success()
        .stdout(contains("\"hs_time\":").and(contains(format!("\"port\":{port}"))));
    drop(listener);
}

#[test]
fn test_download_json_counts_bytes() {
    let port = one_shot_server(b"hello");
    let mut cmd = Command::cargo_bin("wiretime").unwrap();
    cmd.args(["--json", "download", "--chunk", "2"])
        .arg(format!("http://127.0.0.1:{port}/file"))
        .assert()
        .success()
        .stdout(
            contains("\"total_bytes\":5")
                .and(contains("\"url\":\"127.0.0.1/file\""))
                .and(contains("\"download_time\":")),
        );
}

#[test]
fn test_ttfb_formatted_timestamps() {
    let port = one_shot_server(b"0123456789");
    let mut cmd = Command::cargo_bin("wiretime").unwrap();
    cmd.args(["--json", "--sf", "ttfb", "--byte", "4"])
        .arg(format!("127.0.0.1:{port}"))
        .assert()
        .success()
        .stdout(
            is_match(r#""start_time":"\d{2} [A-Z][a-z]{2} \d{4} \d{2}:\d{2}:\d{2}\.\d{3}""#)
                .unwrap()
                .and(contains("\"fb_time\":")),
        );
}

#[test]
fn test_text_output() {
    let port = one_shot_server(b"abc");
    let mut cmd = Command::cargo_bin("wiretime").unwrap();
    cmd.args(["--no-color", "download"])
        .arg(format!("127.0.0.1:{port}"))
        .assert()
        .success()
        .stdout(contains("Probe: download").and(contains("Received: 3")));
}

#[test]
fn test_out_of_range_timeouts_exit_cleanly() {
    for flag in ["--timeout", "--read-timeout", "--interval", "--max-time"] {
        let mut cmd = Command::cargo_bin("wiretime").unwrap();
        cmd.args(["--no-color", flag, "1e20", "handshake", "127.0.0.1:9"])
            .assert()
            .code(2)
            .stdout(contains(format!("Error: {flag} must be")));
    }
}

#[test]
fn test_negative_timeout_rejected() {
    let mut cmd = Command::cargo_bin("wiretime").unwrap();
    cmd.args(["--no-color", "--timeout=-1", "handshake", "127.0.0.1:9"])
        .assert()
        .code(2)
        .stdout(contains("Error: --timeout must be > 0"));
}

#[cfg(feature = "tls")]
#[test]
fn test_tls_handshake_failure_exit_code() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n");
    });

    let mut cmd = Command::cargo_bin("wiretime").unwrap();
    cmd.args(["--no-color", "--json", "handshake"])
        .arg(format!("https://127.0.0.1:{port}"))
        .assert()
        .code(4)
        .stdout(contains("Error: tls").and(contains("hs_time").not()));
}
