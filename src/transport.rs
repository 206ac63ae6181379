//! JSON-RPC transport layer for LSP communication.
//!
//! Content-Length framed messages over the language server's stdio. The read
//! and write halves are separate so a background task can own the reader
//! while requests are written concurrently.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::warn;

/// Reading half of a Content-Length framed stream.
pub struct FramedReader<R> {
    reader: BufReader<R>,
}

/// Writing half of a Content-Length framed stream.
pub struct FramedWriter<W> {
    writer: W,
}

/// An incoming JSON-RPC message, classified by the fields it carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Reply to one of our requests.
    Response {
        id: Value,
        result: std::result::Result<Value, Value>,
    },
    /// Server-initiated request that expects a reply.
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    Notification { method: String, params: Value },
}

impl Incoming {
    pub fn classify(message: Value) -> Result<Self> {
        let mut obj = match message {
            Value::Object(obj) => obj,
            other => return Err(anyhow!("JSON-RPC message must be an object: {other}")),
        };
        let method = obj
            .remove("method")
            .and_then(|m| m.as_str().map(str::to_string));
        let params = obj.remove("params").unwrap_or(Value::Null);
        match (obj.remove("id"), method) {
            (Some(id), Some(method)) => Ok(Incoming::Request { id, method, params }),
            (None, Some(method)) => Ok(Incoming::Notification { method, params }),
            (Some(id), None) => {
                if let Some(error) = obj.remove("error") {
                    return Ok(Incoming::Response {
                        id,
                        result: Err(error),
                    });
                }
                // A missing result means a null result, e.g. for `shutdown`.
                let result = obj.remove("result").unwrap_or(Value::Null);
                Ok(Incoming::Response {
                    id,
                    result: Ok(result),
                })
            }
            (None, None) => Err(anyhow!("JSON-RPC message has neither id nor method")),
        }
    }
}

impl<R: AsyncRead + Unpin> FramedReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Reads the next JSON-RPC payload. Returns Ok(None) on EOF.
    pub async fn read(&mut self) -> Result<Option<Value>> {
        let headers = match self.read_headers().await? {
            Some(h) => h,
            None => return Ok(None),
        };

        let length = headers
            .get("content-length")
            .ok_or_else(|| anyhow!("missing Content-Length header"))?
            .parse::<usize>()
            .context("could not parse Content-Length header as usize")?;

        let mut buf = vec![0u8; length];
        self.reader
            .read_exact(&mut buf)
            .await
            .context("failed to read JSON payload body")?;

        let value = serde_json::from_slice(&buf).context("invalid JSON in framed payload")?;
        Ok(Some(value))
    }

    async fn read_headers(&mut self) -> Result<Option<HashMap<String, String>>> {
        let mut headers = HashMap::new();
        let mut line = String::new();
        loop {
            line.clear();
            let bytes = self
                .reader
                .read_line(&mut line)
                .await
                .context("failed to read header line")?;

            if bytes == 0 {
                if headers.is_empty() {
                    return Ok(None);
                }
                return Err(anyhow!("unexpected EOF while reading headers"));
            }

            let trimmed = line.trim_end_matches(['\r', '\n']);

            if trimmed.is_empty() {
                if headers.is_empty() {
                    continue;
                }
                break;
            }

            if let Some((name, value)) = trimmed.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            } else {
                warn!("Ignoring non-header line from LSP: {}", trimmed);
            }
        }
        Ok(Some(headers))
    }
}

impl<W: AsyncWrite + Unpin> FramedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a JSON-RPC payload with Content-Length header.
    pub async fn write(&mut self, value: &Value) -> Result<()> {
        let body = serde_json::to_vec(value).context("failed to serialize JSON payload")?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        self.writer
            .write_all(header.as_bytes())
            .await
            .context("failed to write framed header")?;
        self.writer
            .write_all(&body)
            .await
            .context("failed to write framed body")?;
        self.writer
            .flush()
            .await
            .context("failed to flush writer")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{self, DuplexStream};

    fn pipe() -> (FramedWriter<DuplexStream>, FramedReader<DuplexStream>) {
        let (writer, reader) = io::duplex(1024);
        (FramedWriter::new(writer), FramedReader::new(reader))
    }

    #[tokio::test]
    async fn writes_then_reads_payload() {
        let (mut writer, mut reader) = pipe();
        let payload = json!({"jsonrpc": "2.0", "id": 1, "method": "test"});
        writer.write(&payload).await.unwrap();
        let read_back = reader.read().await.unwrap().unwrap();
        assert_eq!(payload, read_back);
    }

    #[tokio::test]
    async fn tolerates_extra_headers() {
        let (mut raw, reader_end) = io::duplex(1024);
        let mut reader = FramedReader::new(reader_end);
        let body = r#"{"jsonrpc":"2.0","method":"window/logMessage"}"#;
        let frame = format!(
            "Content-Length: {}\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\n{body}",
            body.len()
        );
        raw.write_all(frame.as_bytes()).await.unwrap();
        let value = reader.read().await.unwrap().unwrap();
        assert_eq!(value["method"], "window/logMessage");
    }

    #[tokio::test]
    async fn eof_returns_none() {
        let (writer, mut reader) = pipe();
        drop(writer);
        let next = reader.read().await.unwrap();
        assert!(next.is_none());
    }

    #[test]
    fn classifies_messages() {
        let response =
            Incoming::classify(json!({"jsonrpc": "2.0", "id": 3, "result": [1]})).unwrap();
        assert_eq!(
            response,
            Incoming::Response {
                id: json!(3),
                result: Ok(json!([1]))
            }
        );

        let failure =
            Incoming::classify(json!({"id": "4", "error": {"code": -32601, "message": "nope"}}))
                .unwrap();
        assert!(matches!(failure, Incoming::Response { result: Err(_), .. }));

        let request = Incoming::classify(json!({
            "id": 0,
            "method": "workspace/configuration",
            "params": {"items": [{}]}
        }))
        .unwrap();
        assert!(matches!(
            request,
            Incoming::Request { ref method, .. } if method == "workspace/configuration"
        ));

        let note = Incoming::classify(json!({"method": "$/progress", "params": {}})).unwrap();
        assert!(matches!(note, Incoming::Notification { .. }));

        assert!(Incoming::classify(json!([1, 2])).is_err());
        assert!(Incoming::classify(json!({"jsonrpc": "2.0"})).is_err());
    }
}
