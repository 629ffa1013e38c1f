use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
  /// Wait between launching the daemon and probing it.
  pub settle_delay: Duration,
  /// Upper bound on the single probe request.
  pub timeout: Duration,
}

impl Default for ProbeSettings {
  fn default() -> Self {
    Self {
      settle_delay: Duration::from_secs(3),
      timeout: Duration::from_secs(5),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
  Ready { version: Option<String> },
  Rejected { reason: String },
  Unreachable { error: String },
}

impl ProbeOutcome {
  pub fn is_ready(&self) -> bool {
    matches!(self, ProbeOutcome::Ready { .. })
  }
}

#[derive(Debug, Serialize)]
struct RpcRequest {
  jsonrpc: &'static str,
  id: String,
  method: &'static str,
  params: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
  #[serde(default)]
  result: Option<VersionInfo>,
  #[serde(default)]
  error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
  #[serde(default)]
  version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
  #[serde(default)]
  code: i64,
  #[serde(default)]
  message: String,
}

/// Issues exactly one `aria2.getVersion` call against `rpc_url`.
pub fn probe(rpc_url: &str, secret: &str, settings: &ProbeSettings) -> ProbeOutcome {
  match probe_inner(rpc_url, secret, settings.timeout) {
    Ok(outcome) => outcome,
    Err(e) => ProbeOutcome::Unreachable {
      error: format!("{e:#}"),
    },
  }
}

fn probe_inner(rpc_url: &str, secret: &str, timeout: Duration) -> anyhow::Result<ProbeOutcome> {
  let client = Client::builder()
    .timeout(timeout)
    .connect_timeout(timeout)
    .no_proxy()
    .build()
    .context("build HTTP client")?;

  let request = RpcRequest {
    jsonrpc: "2.0",
    id: uuid::Uuid::new_v4().to_string(),
    method: "aria2.getVersion",
    params: vec![format!("token:{secret}")],
  };
  let body = serde_json::to_vec(&request).context("encode RPC request")?;

  let response = client
    .post(rpc_url)
    .header(CONTENT_TYPE, "application/json")
    .header(USER_AGENT, format!("entrypoint/{}", env!("CARGO_PKG_VERSION")))
    .body(body)
    .send()
    .with_context(|| format!("POST {rpc_url}"))?;

  let status = response.status();
  let bytes = response.bytes().context("read RPC response body")?;

  let parsed: Option<RpcResponse> = serde_json::from_slice(&bytes).ok();
  Ok(classify(status.as_u16(), parsed))
}

fn classify(status: u16, parsed: Option<RpcResponse>) -> ProbeOutcome {
  match parsed {
    Some(RpcResponse { error: Some(err), .. }) => ProbeOutcome::Rejected {
      reason: format!("RPC error {}: {}", err.code, err.message),
    },
    Some(RpcResponse { result: Some(info), .. }) if status == 200 => ProbeOutcome::Ready {
      version: info.version,
    },
    _ => ProbeOutcome::Rejected {
      reason: format!("unexpected HTTP status {status}"),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::{Read, Write};
  use std::net::TcpListener;
  use std::thread;

  fn quick() -> ProbeSettings {
    ProbeSettings {
      settle_delay: Duration::ZERO,
      timeout: Duration::from_secs(2),
    }
  }

  /// Answers a single HTTP request with `status` and `body`, returning the
  /// raw request it received.
  fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/jsonrpc", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
      let (mut stream, _) = listener.accept().unwrap();
      let mut raw = Vec::new();
      let mut buf = [0u8; 1024];
      loop {
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
          break;
        }
        raw.extend_from_slice(&buf[..n]);
        if request_complete(&raw) {
          break;
        }
      }

      let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
      );
      stream.write_all(response.as_bytes()).unwrap();
      stream.flush().unwrap();
      String::from_utf8_lossy(&raw).into_owned()
    });

    (url, handle)
  }

  fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(header_end) = text.find("\r\n\r\n") else {
      return false;
    };
    let content_length = text[..header_end]
      .lines()
      .find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.eq_ignore_ascii_case("content-length") {
          value.trim().parse::<usize>().ok()
        } else {
          None
        }
      })
      .unwrap_or(0);
    raw.len() >= header_end + 4 + content_length
  }

  #[test]
  fn version_response_means_ready() {
    let (url, server) = serve_once(
      "200 OK",
      r#"{"id":"x","jsonrpc":"2.0","result":{"version":"1.37.0","enabledFeatures":[]}}"#,
    );

    let outcome = probe(&url, "s3cret", &quick());
    let request = server.join().unwrap();

    assert_eq!(
      outcome,
      ProbeOutcome::Ready {
        version: Some("1.37.0".to_string())
      }
    );
    assert!(outcome.is_ready());
    assert!(request.contains("aria2.getVersion"));
    assert!(request.contains("token:s3cret"));
  }

  #[test]
  fn rpc_error_is_rejected() {
    let (url, server) = serve_once(
      "400 Bad Request",
      r#"{"id":"x","jsonrpc":"2.0","error":{"code":1,"message":"Unauthorized"}}"#,
    );

    let outcome = probe(&url, "wrong", &quick());
    server.join().unwrap();

    match outcome {
      ProbeOutcome::Rejected { reason } => assert!(reason.contains("Unauthorized")),
      other => panic!("unexpected outcome: {other:?}"),
    }
  }

  #[test]
  fn non_json_answer_is_rejected() {
    let (url, server) = serve_once("503 Service Unavailable", "busy");

    let outcome = probe(&url, "s3cret", &quick());
    server.join().unwrap();

    assert_eq!(
      outcome,
      ProbeOutcome::Rejected {
        reason: "unexpected HTTP status 503".to_string()
      }
    );
  }

  #[test]
  fn closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/jsonrpc", listener.local_addr().unwrap());
    drop(listener);

    let outcome = probe(&url, "s3cret", &quick());
    assert!(matches!(outcome, ProbeOutcome::Unreachable { .. }));
    assert!(!outcome.is_ready());
  }
}
