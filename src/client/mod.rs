//! One-shot protocol client.
//!
//! Sends a single request, half-closes the socket and reads the reply until
//! the server closes the connection.

use crate::core::error::{Error, Result};
use crate::core::types::CommandRequest;
use crate::server::codec::encode_request;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Send `request` to `addr` and return the raw response bytes.
///
/// `timeout` bounds the whole exchange. An empty reply means the server
/// closed the connection without answering (for example when at capacity).
pub async fn send_request(
    addr: SocketAddr,
    request: &CommandRequest,
    buffer_len: usize,
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    let payload = encode_request(request)?;

    match timeout {
        Some(limit) => tokio::time::timeout(limit, exchange(addr, &payload, buffer_len))
            .await
            .map_err(|_| Error::ReadTimeout {
                peer: addr.to_string(),
                timeout_secs: limit.as_secs(),
            })?,
        None => exchange(addr, &payload, buffer_len).await,
    }
}

async fn exchange(addr: SocketAddr, payload: &[u8], buffer_len: usize) -> Result<Vec<u8>> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| Error::connection(addr, format!("connect failed: {}", e)))?;
    log::debug!("Connected to {}", addr);

    stream
        .write_all(payload)
        .await
        .map_err(|e| Error::connection(addr, format!("send failed: {}", e)))?;
    stream
        .shutdown()
        .await
        .map_err(|e| Error::connection(addr, format!("shutdown failed: {}", e)))?;
    log::debug!("Bytes sent: {}", payload.len());

    let mut reply = Vec::new();
    let mut chunk = vec![0u8; buffer_len.max(1)];
    loop {
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|e| Error::connection(addr, format!("recv failed: {}", e)))?;
        if read == 0 {
            break;
        }
        log::debug!("Bytes received: {}", read);
        reply.extend_from_slice(&chunk[..read]);
    }

    Ok(reply)
}

/// Parse `key=value` arguments into request parameters.
///
/// The key is everything before the first `=`. A repeated key keeps its
/// last value.
pub fn parse_params<I, S>(args: I) -> Result<HashMap<String, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut params = HashMap::new();
    for arg in args {
        let arg = arg.as_ref();
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| Error::InvalidArgument(format!("expected key=value, got {:?}", arg)))?;
        params.insert(key.to_string(), value.to_string());
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_params() {
        let params = parse_params(["file_path=/tmp/a=b", "signature=4D5A"]).unwrap();
        assert_eq!(params["file_path"], "/tmp/a=b");
        assert_eq!(params["signature"], "4D5A");
    }

    #[test]
    fn test_parse_params_last_wins() {
        let params = parse_params(["file_path=a", "file_path=b"]).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params["file_path"], "b");
    }

    #[test]
    fn test_parse_params_rejects_bare_word() {
        let err = parse_params(["file_path"]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(parse_params(Vec::<String>::new()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_request_half_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            stream.read_to_end(&mut request).await.unwrap();
            stream.write_all(b"{\"success\":\"ok\"}").await.unwrap();
            request
        });

        let request = CommandRequest::new("QuarantineLocalFile").with_param("file_path", "/tmp/x");
        let reply = send_request(addr, &request, 3, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(reply, b"{\"success\":\"ok\"}");

        let sent: CommandRequest = serde_json::from_slice(&server.await.unwrap()).unwrap();
        assert_eq!(sent.command, "QuarantineLocalFile");
        assert_eq!(sent.param("file_path"), "/tmp/x");
    }

    #[tokio::test]
    async fn test_send_request_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = send_request(addr, &CommandRequest::new("X"), 16, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }
}
