//! Newline-delimited stdio transport for [`HackerbotMcp`].
//!
//! rmcp handles the protocol. This layer owns the byte stream: every input line is screened
//! first, and lines that are not UTF-8 JSON-RPC messages, requests for methods the server
//! does not implement, and unknown notifications are answered (or dropped) here. Nothing
//! rmcp cannot decode reaches it, so one bad line never ends the session.

use crate::error::{HackerbotError, Result};
use crate::mcp::server::HackerbotMcp;
use rmcp::model::{ErrorCode, ErrorData};
use rmcp::ServiceExt;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const SERVED_REQUESTS: [&str; 4] = ["initialize", "ping", "tools/list", "tools/call"];

const SERVED_NOTIFICATIONS: [&str; 4] = [
    "notifications/initialized",
    "notifications/cancelled",
    "notifications/progress",
    "notifications/roots/list_changed",
];

const PIPE_CAPACITY: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq)]
enum Screened {
    Skip,
    Forward(String),
    Reply(String),
}

/// Serve `server` over `input`/`output` until the input closes.
pub async fn serve<R, W>(server: HackerbotMcp, input: R, output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (server_io, guard_io) = tokio::io::duplex(PIPE_CAPACITY);
    let (guard_read, guard_write) = tokio::io::split(guard_io);
    let (replies, outgoing) = mpsc::channel::<String>(32);

    let writer = tokio::spawn(write_replies(outgoing, output));
    let relay = tokio::spawn(relay_server_output(BufReader::new(guard_read), replies.clone()));
    let screen = tokio::spawn(screen_input(input, guard_write, replies));

    info!(server = crate::mcp::SERVER_NAME, "MCP server listening on stdio");
    let running = server
        .serve(tokio::io::split(server_io))
        .await
        .map_err(|e| HackerbotError::ProtocolError(format!("initialization failed: {}", e)))?;
    let reason = running
        .waiting()
        .await
        .map_err(|e| HackerbotError::ProtocolError(format!("server task failed: {}", e)))?;
    info!(reason = ?reason, "MCP session ended");

    join(screen).await?;
    join(relay).await?;
    join(writer).await
}

async fn join(task: JoinHandle<Result<()>>) -> Result<()> {
    task.await
        .map_err(|e| HackerbotError::ProtocolError(format!("stdio task failed: {}", e)))?
}

async fn screen_input<R, W>(
    mut input: R,
    mut server: W,
    replies: mpsc::Sender<String>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        match screen(&buf) {
            Screened::Skip => {}
            Screened::Forward(line) => {
                server.write_all(line.as_bytes()).await?;
                server.write_all(b"\n").await?;
                server.flush().await?;
            }
            Screened::Reply(reply) => {
                if replies.send(reply).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!("Input closed");
    server.shutdown().await?;
    Ok(())
}

async fn relay_server_output<R>(from_server: R, replies: mpsc::Sender<String>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = from_server.lines();
    while let Some(line) = lines.next_line().await? {
        if replies.send(line).await.is_err() {
            break;
        }
    }
    Ok(())
}

async fn write_replies<W>(mut outgoing: mpsc::Receiver<String>, mut output: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = outgoing.recv().await {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}

fn screen(raw: &[u8]) -> Screened {
    let Ok(text) = std::str::from_utf8(raw) else {
        warn!("Input line is not valid UTF-8");
        return error_reply(
            Value::Null,
            ErrorCode::PARSE_ERROR,
            "Parse error: input is not valid UTF-8",
        );
    };
    let text = text.trim();
    if text.is_empty() {
        return Screened::Skip;
    }

    let message: Value = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Unparseable input line");
            let message = format!("Parse error: {}", e);
            return error_reply(Value::Null, ErrorCode::PARSE_ERROR, message);
        }
    };

    let id = match message.get("id") {
        None => None,
        Some(id) if id.is_string() || id.is_i64() || id.is_u64() => Some(id.clone()),
        Some(_) => {
            return error_reply(Value::Null, ErrorCode::INVALID_REQUEST, "Invalid request: bad id")
        }
    };
    let reply_id = id.clone().unwrap_or(Value::Null);

    if message.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return error_reply(
            reply_id,
            ErrorCode::INVALID_REQUEST,
            "Invalid request: jsonrpc must be \"2.0\"",
        );
    }

    match (message.get("method"), id) {
        (Some(Value::String(method)), Some(id)) => {
            if SERVED_REQUESTS.contains(&method.as_str()) {
                Screened::Forward(text.to_string())
            } else {
                let message = format!("Method not found: {}", method);
                error_reply(id, ErrorCode::METHOD_NOT_FOUND, message)
            }
        }
        (Some(Value::String(method)), None) => {
            if SERVED_NOTIFICATIONS.contains(&method.as_str()) {
                Screened::Forward(text.to_string())
            } else {
                debug!(method = %method, "Dropping unknown notification");
                Screened::Skip
            }
        }
        (Some(_), _) => error_reply(
            reply_id,
            ErrorCode::INVALID_REQUEST,
            "Invalid request: method must be a string",
        ),
        (None, Some(_)) if message.get("result").is_some() || message.get("error").is_some() => {
            Screened::Forward(text.to_string())
        }
        (None, _) => {
            error_reply(reply_id, ErrorCode::INVALID_REQUEST, "Invalid request: no method")
        }
    }
}

fn error_reply(id: Value, code: ErrorCode, message: impl Into<String>) -> Screened {
    let error = ErrorData::new(code, message.into(), None);
    Screened::Reply(json!({ "jsonrpc": "2.0", "id": id, "error": error }).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::camera::SyntheticCamera;
    use crate::hardware::SharedHardware;
    use rmcp::model::ProtocolVersion;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{DuplexStream, Lines};

    fn reply_json(screened: Screened) -> Value {
        match screened {
            Screened::Reply(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("Expected a reply, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let reply = reply_json(screen(&[0xff, 0xfe, b'\n']));

        assert_eq!(reply["id"], Value::Null);
        assert_eq!(reply["error"]["code"], -32700);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let reply = reply_json(screen(b"{not json\n"));

        assert_eq!(reply["error"]["code"], -32700);
    }

    #[test]
    fn test_missing_version_is_invalid_request() {
        let reply = reply_json(screen(br#"{"id": 3, "method": "ping"}"#));

        assert_eq!(reply["id"], 3);
        assert_eq!(reply["error"]["code"], -32600);
    }

    #[test]
    fn test_unknown_method_is_answered_here() {
        let line = br#"{"jsonrpc": "2.0", "id": "r", "method": "resources/list"}"#;
        let reply = reply_json(screen(line));

        assert_eq!(reply["id"], "r");
        assert_eq!(reply["error"]["code"], -32601);
    }

    #[test]
    fn test_served_messages_are_forwarded() {
        let line = r#"{"jsonrpc": "2.0", "id": 1, "method": "tools/list"}"#;
        assert_eq!(screen(format!("{}\r\n", line).as_bytes()), Screened::Forward(line.to_string()));

        let note = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        assert_eq!(screen(note.as_bytes()), Screened::Forward(note.to_string()));
    }

    #[test]
    fn test_unknown_notification_and_blank_line_are_skipped() {
        let note = br#"{"jsonrpc": "2.0", "method": "notifications/weird"}"#;
        assert_eq!(screen(note), Screened::Skip);
        assert_eq!(screen(b"  \n"), Screened::Skip);
    }

    async fn send(client: &mut DuplexStream, message: &[u8]) {
        client.write_all(message).await.unwrap();
        client.write_all(b"\n").await.unwrap();
    }

    async fn next_reply(replies: &mut Lines<BufReader<DuplexStream>>) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(10), replies.next_line())
            .await
            .expect("reply within timeout")
            .unwrap()
            .expect("reply line");
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn test_session_survives_bad_line() {
        let hardware = Arc::new(SharedHardware::new(Arc::new(SyntheticCamera::new(32, 24)), None));
        let (mut client, server_in) = tokio::io::duplex(1 << 16);
        let (server_out, client_out) = tokio::io::duplex(1 << 16);
        let task = tokio::spawn(serve(
            HackerbotMcp::new(hardware),
            BufReader::new(server_in),
            server_out,
        ));
        let mut replies = BufReader::new(client_out).lines();

        send(&mut client, &[0xff, 0xfe]).await;
        let reply = next_reply(&mut replies).await;
        assert_eq!(reply["error"]["code"], -32700);

        let initialize = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "1999-01-01",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "0.0.1" }
            }
        });
        send(&mut client, initialize.to_string().as_bytes()).await;
        let reply = next_reply(&mut replies).await;
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["serverInfo"]["name"], "hackerbot");
        assert_ne!(reply["result"]["protocolVersion"], "1999-01-01");
        assert_eq!(
            reply["result"]["protocolVersion"],
            serde_json::to_value(ProtocolVersion::LATEST).unwrap()
        );

        send(&mut client, br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;

        send(&mut client, br#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
        let reply = next_reply(&mut replies).await;
        assert_eq!(reply["id"], 2);
        assert_eq!(reply["result"]["tools"][0]["name"], "get_camera_image");
        assert_eq!(
            reply["result"]["tools"][0]["description"],
            "Gets the image from the Hackerbot on-arm camera"
        );

        send(&mut client, &[0xc3, 0x28]).await;
        assert_eq!(next_reply(&mut replies).await["error"]["code"], -32700);

        let call = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": { "name": "get_camera_image", "arguments": {} }
        });
        send(&mut client, call.to_string().as_bytes()).await;
        let reply = next_reply(&mut replies).await;
        assert_eq!(reply["id"], 3);
        assert_eq!(reply["result"]["content"][0]["type"], "image");
        assert_eq!(reply["result"]["content"][0]["mimeType"], "image/jpeg");

        drop(client);
        task.await.unwrap().unwrap();
    }
}
