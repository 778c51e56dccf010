//! End-to-end execution against a loopback server

use std::net::SocketAddr;
use std::time::Duration;

use freeman_core::{
    Body, EngineConfig, Environment, ExecutionError, HttpEngine, HttpMethod, KeyValue, NetworkActor,
    NetworkCommand, NetworkResponse, RequestDefinition, TransportKind, Variable,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A request as the server saw it
#[derive(Debug)]
struct Captured {
    head: String,
    body: Vec<u8>,
}

impl Captured {
    fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }
}

/// Serve every connection with one canned response and report what arrived
async fn serve(
    status: u16,
    reason: &'static str,
    body: &'static str,
) -> (SocketAddr, mpsc::UnboundedReceiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let Some(captured) = read_request(&mut stream).await else {
                    return;
                };
                let _ = tx.send(captured);
                let reply = format!(
                    "HTTP/1.1 {status} {reason}\r\n\
                     Content-Type: text/plain\r\n\
                     X-Served-By: loopback\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// Accept connections, read the request, never answer
async fn serve_silently() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_request(&mut stream).await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });
    addr
}

/// Answer with the head at once and the body only after `delay`
async fn serve_slow_body(delay: Duration, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_request(&mut stream).await.is_none() {
                    return;
                }
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.flush().await;
                tokio::time::sleep(delay).await;
                let _ = stream.write_all(body.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

async fn read_request(stream: &mut TcpStream) -> Option<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(Captured { head, body })
}

fn engine() -> HttpEngine {
    HttpEngine::new(&EngineConfig {
        timeout_secs: 5,
        connect_timeout_secs: 2,
        no_proxy: true,
        ..EngineConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_only_enabled_headers_reach_the_server() {
    let (addr, mut seen) = serve(200, "OK", "hello").await;

    let request = RequestDefinition::new("headers", HttpMethod::GET, format!("http://{addr}/x"))
        .with_header(KeyValue::new("A", "1"))
        .with_header(KeyValue::disabled("B", "2"));

    let response = engine().execute(request).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), Some("hello"));

    let captured = seen.recv().await.unwrap();
    assert_eq!(captured.request_line(), "GET /x HTTP/1.1");
    assert_eq!(captured.header("a"), Some("1"));
    assert_eq!(captured.header("b"), None);
}

#[tokio::test]
async fn test_error_status_is_a_response() {
    let (addr, _seen) = serve(404, "Not Found", "missing").await;

    let request = RequestDefinition::new("missing", HttpMethod::GET, format!("http://{addr}/nope"));
    let response = engine().execute(request).await.unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(response.status_text, "Not Found");
    assert!(!response.is_success());
    assert_eq!(response.text(), Some("missing"));
}

#[tokio::test]
async fn test_response_metadata_is_captured() {
    let (addr, _seen) = serve(201, "Created", "{\"ok\":true}").await;

    let request = RequestDefinition::new("meta", HttpMethod::GET, format!("http://{addr}/items"));
    let response = engine().execute(request).await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.header("X-SERVED-BY"), Some("loopback"));
    assert_eq!(response.content_type(), Some("text/plain"));
    assert_eq!(response.content_length, 11);
    assert!(response.elapsed > Duration::ZERO);
}

#[tokio::test]
async fn test_elapsed_covers_body_download() {
    let addr = serve_slow_body(Duration::from_millis(300), "late body").await;

    let request = RequestDefinition::new("slow", HttpMethod::GET, format!("http://{addr}/slow"));
    let response = engine().execute(request).await.unwrap();

    assert_eq!(response.text(), Some("late body"));
    assert!(
        response.elapsed >= Duration::from_millis(300),
        "elapsed {:?}",
        response.elapsed
    );
}

#[tokio::test]
async fn test_unanswered_request_times_out() {
    let addr = serve_silently().await;
    let engine = HttpEngine::new(&EngineConfig {
        timeout_secs: 1,
        no_proxy: true,
        ..EngineConfig::default()
    })
    .unwrap();

    let request = RequestDefinition::new("hang", HttpMethod::GET, format!("http://{addr}/hang"));
    let err = engine.execute(request).await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(err.transport_kind(), Some(TransportKind::Timeout));
}

#[tokio::test]
async fn test_closed_port_is_a_connect_failure() {
    // bind then drop so the port is known to be free
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let request = RequestDefinition::new("down", HttpMethod::GET, format!("http://{addr}/"));
    let err = engine().execute(request).await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(err.transport_kind(), Some(TransportKind::Connect));
}

#[tokio::test]
async fn test_invalid_url_fails_before_sending() {
    let request = RequestDefinition::new("bad", HttpMethod::GET, "{{base}}/users");
    let err = engine().execute(request).await.unwrap_err();

    assert!(matches!(err, ExecutionError::InvalidUrl { .. }));
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_raw_body_and_query_arrive() {
    let (addr, mut seen) = serve(200, "OK", "").await;

    let request = RequestDefinition::new("create", HttpMethod::POST, format!("http://{addr}/users"))
        .with_query_param(KeyValue::new("page", "2"))
        .with_query_param(KeyValue::disabled("debug", "1"))
        .with_body(Body::json("{\"name\":\"ana\"}"));

    engine().execute(request).await.unwrap();

    let captured = seen.recv().await.unwrap();
    assert_eq!(captured.request_line(), "POST /users?page=2 HTTP/1.1");
    assert_eq!(captured.header("content-type"), Some("application/json"));
    assert_eq!(captured.body, b"{\"name\":\"ana\"}");
}

#[tokio::test]
async fn test_form_body_arrives_encoded() {
    let (addr, mut seen) = serve(200, "OK", "").await;

    let request = RequestDefinition::new("login", HttpMethod::POST, format!("http://{addr}/login"))
        .with_body(Body::form(vec![
            KeyValue::new("user", "ana maria"),
            KeyValue::disabled("remember", "yes"),
        ]));

    engine().execute(request).await.unwrap();

    let captured = seen.recv().await.unwrap();
    assert_eq!(
        captured.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(captured.body, b"user=ana+maria");
}

#[tokio::test]
async fn test_send_resolves_variables() {
    let (addr, mut seen) = serve(200, "OK", "").await;

    let env = Environment::new("local")
        .with_variable(Variable::new("base", format!("http://{addr}")))
        .with_variable(Variable::new("token", "abc"));
    let request = RequestDefinition::new("me", HttpMethod::GET, "{{base}}/me")
        .with_header(KeyValue::new("X-Token", "{{token}}"));

    engine().send(&request, &env.variable_map()).await.unwrap();

    let captured = seen.recv().await.unwrap();
    assert_eq!(captured.request_line(), "GET /me HTTP/1.1");
    assert_eq!(captured.header("x-token"), Some("abc"));
}

#[tokio::test]
async fn test_actor_completes_requests() {
    let (addr, _seen) = serve(200, "OK", "done").await;

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
    let actor = tokio::spawn(NetworkActor::new(engine(), resp_tx).run(cmd_rx));

    let env =
        Environment::new("local").with_variable(Variable::new("base", format!("http://{addr}")));
    cmd_tx
        .send(NetworkCommand::Execute {
            id: 7,
            request: RequestDefinition::new("ping", HttpMethod::GET, "{{base}}/ping"),
            variables: env.variable_map(),
        })
        .unwrap();

    match resp_rx.recv().await.unwrap() {
        NetworkResponse::Completed { id, result } => {
            assert_eq!(id, 7);
            assert_eq!(result.unwrap().text(), Some("done"));
        }
        other => panic!("unexpected response: {other:?}"),
    }

    cmd_tx.send(NetworkCommand::Shutdown).unwrap();
    actor.await.unwrap();
}

#[tokio::test]
async fn test_actor_cancels_in_flight_request() {
    let addr = serve_silently().await;

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
    let actor = tokio::spawn(NetworkActor::new(engine(), resp_tx).run(cmd_rx));

    cmd_tx
        .send(NetworkCommand::Execute {
            id: 1,
            request: RequestDefinition::new("slow", HttpMethod::GET, format!("http://{addr}/slow")),
            variables: Default::default(),
        })
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    cmd_tx.send(NetworkCommand::Cancel(1)).unwrap();

    let response = tokio::time::timeout(Duration::from_secs(3), resp_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(response, NetworkResponse::Cancelled { id: 1 }));

    cmd_tx.send(NetworkCommand::Shutdown).unwrap();
    actor.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_cancels_pending_requests() {
    let addr = serve_silently().await;

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
    let actor = tokio::spawn(NetworkActor::new(engine(), resp_tx).run(cmd_rx));

    for id in [1, 2] {
        cmd_tx
            .send(NetworkCommand::Execute {
                id,
                request: RequestDefinition::new(
                    "slow",
                    HttpMethod::GET,
                    format!("http://{addr}/{id}"),
                ),
                variables: Default::default(),
            })
            .unwrap();
    }
    cmd_tx.send(NetworkCommand::Shutdown).unwrap();
    tokio::time::timeout(Duration::from_secs(3), actor)
        .await
        .unwrap()
        .unwrap();

    let mut cancelled = Vec::new();
    while let Ok(response) = resp_rx.try_recv() {
        assert!(matches!(response, NetworkResponse::Cancelled { .. }));
        cancelled.push(response.id());
    }
    cancelled.sort();
    assert_eq!(cancelled, vec![1, 2]);
}
