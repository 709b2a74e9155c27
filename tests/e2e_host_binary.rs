//! End-to-end tests for the `metasearch-host` binary.
//!
//! Each test spawns the binary with a temporary config (in-memory storage),
//! sends JSON commands over stdin and reads responses from stdout. Only
//! commands that never reach a search provider are used, so no network
//! access is needed.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

struct HostHarness {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    reader: Lines<BufReader<ChildStdout>>,
    _dir: tempfile::TempDir,
}

impl HostHarness {
    async fn spawn() -> Self {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let config_path = dir.path().join("config.toml");
        write_config(&config_path);

        let mut child = Command::new(env!("CARGO_BIN_EXE_metasearch-host"))
            .arg(&config_path)
            .env("METASEARCH_DATA_DIR", dir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn metasearch-host");

        let child_stdin = child.stdin.take().expect("no stdin on child process");
        let child_stdout = child.stdout.take().expect("no stdout on child process");

        Self {
            child,
            stdin: BufWriter::new(child_stdin),
            reader: BufReader::new(child_stdout).lines(),
            _dir: dir,
        }
    }

    async fn send_raw(&mut self, line: &str) -> Value {
        self.stdin
            .write_all(line.as_bytes())
            .await
            .expect("write stdin");
        self.stdin.write_all(b"\n").await.expect("write newline");
        self.stdin.flush().await.expect("flush stdin");
        self.read_line().await
    }

    async fn send(&mut self, cmd: Value) -> Value {
        self.send_raw(&cmd.to_string()).await
    }

    async fn read_line(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(10), self.reader.next_line())
            .await
            .expect("timeout reading from metasearch-host")
            .expect("IO error reading from metasearch-host")
            .expect("unexpected EOF from metasearch-host");
        serde_json::from_str(&line)
            .unwrap_or_else(|e| panic!("invalid JSON from metasearch-host: {e}\nraw line: {line}"))
    }

    /// Wait for exit while keeping stdin open.
    async fn wait_for_exit(mut self) {
        let status = tokio::time::timeout(Duration::from_secs(5), self.child.wait())
            .await
            .expect("timeout waiting for metasearch-host to exit")
            .expect("failed to wait for metasearch-host");
        assert!(status.success(), "metasearch-host exited with: {status}");
    }

    async fn shutdown(mut self) {
        drop(self.stdin);
        let status = tokio::time::timeout(Duration::from_secs(5), self.child.wait())
            .await
            .expect("timeout waiting for metasearch-host to exit")
            .expect("failed to wait for metasearch-host");
        assert!(status.success(), "metasearch-host exited with: {status}");
    }
}

fn write_config(path: &Path) {
    std::fs::write(
        path,
        r#"
[providers]
duckduckgo = true
bing = true

[storage]
backend = "memory"

[logging]
filter = "warn"
"#,
    )
    .expect("write config");
}

fn cmd(request_id: &str, command: &str, payload: Value) -> Value {
    json!({ "v": 1, "request_id": request_id, "command": command, "payload": payload })
}

#[tokio::test]
async fn e2e_host_ping() {
    let mut h = HostHarness::spawn().await;
    let resp = h.send(cmd("p1", "host.ping", json!({}))).await;
    assert_eq!(resp["ok"], true);
    assert_eq!(resp["request_id"], "p1");
    assert_eq!(resp["payload"]["pong"], true);
    h.shutdown().await;
}

#[tokio::test]
async fn e2e_engines_list_reflects_config() {
    let mut h = HostHarness::spawn().await;
    let resp = h.send(cmd("e1", "engines.list", Value::Null)).await;
    assert_eq!(resp["ok"], true);
    assert_eq!(
        resp["payload"]["engines"],
        json!([
            { "name": "bing", "reliability_rank": 1 },
            { "name": "duckduckgo", "reliability_rank": 4 },
        ])
    );
    h.shutdown().await;
}

#[tokio::test]
async fn e2e_preferences_roundtrip() {
    let mut h = HostHarness::spawn().await;
    let updated = h
        .send(cmd(
            "u1",
            "preferences.update",
            json!({ "client_id": "desk", "results_per_page": 25 }),
        ))
        .await;
    assert_eq!(updated["ok"], true, "{updated}");
    assert_eq!(updated["payload"]["preferences"]["results_per_page"], 25);

    let fetched = h
        .send(cmd("g1", "preferences.get", json!({ "client_id": "desk" })))
        .await;
    assert_eq!(fetched["payload"]["preferences"]["results_per_page"], 25);
    assert_eq!(fetched["payload"]["preferences"]["default_engine"], "default");
    h.shutdown().await;
}

#[tokio::test]
async fn e2e_invalid_input_keeps_running() {
    let mut h = HostHarness::spawn().await;
    let resp = h.send_raw("{ not json").await;
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["request_id"], "parse-error");

    let resp = h
        .send(cmd("s1", "search.run", json!({ "query": "rust", "page": 0 })))
        .await;
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["payload"]["kind"], "validation");

    let resp = h.send(cmd("p1", "host.ping", Value::Null)).await;
    assert_eq!(resp["ok"], true);
    h.shutdown().await;
}

#[tokio::test]
async fn e2e_runtime_stop_exits_cleanly() {
    let mut h = HostHarness::spawn().await;
    let resp = h.send(cmd("stop", "runtime.stop", Value::Null)).await;
    assert_eq!(resp["ok"], true);
    assert_eq!(resp["payload"]["stopping"], true);
    h.wait_for_exit().await;
}
