//! Common test utilities for integration tests.
//!
//! This module provides shared infrastructure for LSP integration tests,
//! including the `LspClient` for communicating with the server binary.

use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};

/// A captured server notification.
#[derive(Debug, Clone)]
pub(crate) struct CapturedNotification {
    /// The LSP method name (e.g., "textDocument/publishDiagnostics").
    pub method: String,
    /// The full notification parameters.
    pub params: Value,
}

/// LSP test client for communicating with the server binary.
pub(crate) struct LspClient {
    process: Child,
    /// Captured notifications in order received.
    notifications: Vec<CapturedNotification>,
    reader: BufReader<std::process::ChildStdout>,
}

impl LspClient {
    /// Spawn the docker-lsp binary.
    pub(crate) fn spawn() -> Self {
        let mut process = Command::new(env!("CARGO_BIN_EXE_docker-lsp"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn docker-lsp binary");

        let stdout = process.stdout.take().expect("Failed to capture stdout");

        Self {
            process,
            notifications: Vec::new(),
            reader: BufReader::new(stdout),
        }
    }

    /// Send a JSON-RPC message to the server.
    pub(crate) fn send(&mut self, message: &Value) {
        let body = serde_json::to_string(message).unwrap();
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        let stdin = self.process.stdin.as_mut().expect("stdin not captured");
        stdin.write_all(header.as_bytes()).unwrap();
        stdin.write_all(body.as_bytes()).unwrap();
        stdin.flush().unwrap();
    }

    fn read_message(&mut self) -> Value {
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            let bytes_read = self
                .reader
                .read_line(&mut line)
                .expect("Failed to read header");

            // EOF - server closed connection
            assert!(bytes_read != 0, "Server closed connection unexpectedly");

            if line == "\r\n" || line == "\n" {
                break;
            }

            if line.to_lowercase().starts_with("content-length:") {
                content_length = line
                    .split(':')
                    .nth(1)
                    .unwrap()
                    .trim()
                    .parse()
                    .expect("Invalid content length");
            }
        }

        let mut body = vec![0u8; content_length];
        self.reader
            .read_exact(&mut body)
            .expect("Failed to read body");

        serde_json::from_slice(&body).unwrap_or_else(|e| {
            panic!("Invalid JSON: {e} in: {:?}", String::from_utf8_lossy(&body))
        })
    }

    /// Reads one message, capturing notifications and answering server
    /// requests. Returns the message if it is a response.
    fn pump(&mut self) -> Option<Value> {
        let message = self.read_message();
        let method = message
            .get("method")
            .and_then(|m| m.as_str())
            .map(str::to_string);

        match (message.get("id").cloned(), method) {
            // Server-to-client request: accept with an empty result.
            (Some(id), Some(_)) => {
                self.send(&json!({ "jsonrpc": "2.0", "id": id, "result": null }));
                None
            }
            (None, Some(method)) => {
                let params = message.get("params").cloned().unwrap_or(Value::Null);
                self.notifications
                    .push(CapturedNotification { method, params });
                None
            }
            _ => Some(message),
        }
    }

    /// Read the JSON-RPC response with `expected_id`, capturing notifications
    /// received before it.
    pub(crate) fn read_response(&mut self, expected_id: i64) -> Value {
        loop {
            if let Some(response) = self.pump()
                && response.get("id") == Some(&json!(expected_id))
            {
                return response;
            }
        }
    }

    /// All notifications captured so far.
    #[allow(dead_code)]
    pub(crate) fn notifications(&self) -> &[CapturedNotification] {
        &self.notifications
    }

    /// Diagnostics publications for `uri` captured so far, oldest first.
    pub(crate) fn publications(&self, uri: &str) -> Vec<Value> {
        self.notifications
            .iter()
            .filter(|n| n.method == "textDocument/publishDiagnostics" && n.params["uri"] == uri)
            .map(|n| n.params.clone())
            .collect()
    }

    /// Blocks until a publication for `uri` matching `predicate` arrives.
    pub(crate) fn wait_for_publication(
        &mut self,
        uri: &str,
        predicate: impl Fn(&Value) -> bool,
    ) -> Value {
        loop {
            if let Some(found) = self.publications(uri).into_iter().find(|p| predicate(p)) {
                return found;
            }
            self.pump();
        }
    }

    /// Initialize the LSP session.
    pub(crate) fn initialize(&mut self, initialization_options: Value) -> Value {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "processId": null,
                "capabilities": {
                    "textDocument": {
                        "publishDiagnostics": { "versionSupport": true },
                        "codeAction": {}
                    }
                },
                "rootUri": "file:///tmp",
                "workspaceFolders": null,
                "initializationOptions": initialization_options
            }
        }));

        let response = self.read_response(1);

        // Send initialized notification
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "initialized",
            "params": {}
        }));

        response
    }

    /// Open a text document.
    pub(crate) fn did_open(&mut self, uri: &str, language_id: &str, version: i32, text: &str) {
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didOpen",
            "params": {
                "textDocument": {
                    "uri": uri,
                    "languageId": language_id,
                    "version": version,
                    "text": text
                }
            }
        }));
    }

    /// Replace the full content of a text document.
    #[allow(dead_code)]
    pub(crate) fn did_change(&mut self, uri: &str, version: i32, text: &str) {
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didChange",
            "params": {
                "textDocument": { "uri": uri, "version": version },
                "contentChanges": [{ "text": text }]
            }
        }));
    }

    /// Close a text document.
    #[allow(dead_code)]
    pub(crate) fn did_close(&mut self, uri: &str) {
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didClose",
            "params": { "textDocument": { "uri": uri } }
        }));
    }

    /// Request code actions for `range` with the given context diagnostics.
    #[allow(dead_code)]
    pub(crate) fn code_action(
        &mut self,
        id: i64,
        uri: &str,
        range: Value,
        diagnostics: Value,
    ) -> Value {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "textDocument/codeAction",
            "params": {
                "textDocument": { "uri": uri },
                "range": range,
                "context": { "diagnostics": diagnostics }
            }
        }));
        self.read_response(id)
    }

    /// Shutdown the server.
    pub(crate) fn shutdown(&mut self) -> Value {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": 999,
            "method": "shutdown"
        }));
        self.read_response(999)
    }
}

impl Drop for LspClient {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}
