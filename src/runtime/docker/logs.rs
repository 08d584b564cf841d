use bytes::Bytes;
use futures::StreamExt;
use http_body_util::{BodyExt, BodyStream, Empty};
use hyper::client::conn::http1;
use hyper::{header, Request, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;

use crate::runtime::error::RuntimeError;
use crate::runtime::runtime::ByteStream;

pub(super) fn logs_path(container_id: &str, tail: Option<u32>, follow: bool) -> String {
    let tail = tail.map(|t| t.to_string()).unwrap_or_else(|| "all".to_string());

    format!(
        "/containers/{}/logs?stdout=1&stderr=1&follow={}&tail={}",
        container_id,
        follow as u8,
        tail
    )
}

fn transient(e: hyper::Error) -> RuntimeError {
    RuntimeError::Transient(format!("Docker logs request failed: {}", e))
}

/// Opens the log endpoint on its own connection and hands back the body
/// untouched. Dropping the stream closes the connection.
pub(super) async fn raw_logs(socket: &str, container_id: &str, tail: Option<u32>, follow: bool) -> Result<ByteStream, RuntimeError> {
    let stream = UnixStream::connect(socket)
        .await
        .map_err(|e| RuntimeError::DaemonUnreachable(format!("Cannot connect to {}: {}", socket, e)))?;

    let (mut sender, connection) = http1::handshake(TokioIo::new(stream)).await.map_err(transient)?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("Docker logs connection closed: {}", e);
        }
    });

    let request = Request::builder()
        .uri(logs_path(container_id, tail, follow))
        .header(header::HOST, "docker")
        .body(Empty::<Bytes>::new())
        .map_err(|e| RuntimeError::Transient(format!("Invalid logs request: {}", e)))?;

    let response = sender.send_request(request).await.map_err(transient)?;
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(RuntimeError::NotFound(format!("No such container: {}", container_id)));
    }

    if !status.is_success() {
        let body = match response.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(_) => Bytes::new(),
        };

        return Err(RuntimeError::Transient(format!(
            "Docker logs for {} answered {}: {}",
            container_id,
            status,
            String::from_utf8_lossy(&body).trim()
        )));
    }

    let body = BodyStream::new(response.into_body()).filter_map(|frame| async move {
        match frame {
            Ok(frame) => frame.into_data().ok().map(Ok),
            Err(e) => Some(Err(RuntimeError::Transient(format!("Log stream interrupted: {}", e)))),
        }
    });

    Ok(Box::pin(body))
}
