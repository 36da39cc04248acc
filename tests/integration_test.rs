use oneshot_http::error::ServerError;
use oneshot_http::{Response, Router, Server, ServerConfig};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn test_config() -> ServerConfig {
    ServerConfig::new()
        .with_address("127.0.0.1", 0)
        .with_request_timeout(Duration::from_millis(200))
        .with_parallel_request_limit(16)
        .with_backlog_size(50)
}

fn test_router() -> Router {
    let mut router = Router::new();
    router
        .get("/test", |_| async {
            Ok(Response::ok().with_body("test-result"))
        })
        .get("/long-request", |_| async {
            tokio::time::sleep(Duration::from_millis(5000)).await;
            Ok(Response::ok())
        })
        .get("/fail", |_| async {
            Err(ServerError::Handler("boom".to_string()))
        })
        .post("/echo", |request| async move {
            let mut response = Response::ok();
            if let Some(body) = request.body {
                response = response.with_body(body);
            }
            Ok(response)
        });
    router
}

/// Bind on an ephemeral port, run the server in the background and return
/// the address clients should connect to.
fn start_server(config: ServerConfig, router: Router) -> SocketAddr {
    let server = Server::bind(config, router).unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

/// Send raw bytes and collect the full response until the server closes
async fn send_request(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

#[tokio::test]
async fn test_get_returns_handler_response() {
    let addr = start_server(test_config(), test_router());

    let response = send_request(addr, "GET /test HTTP/1.1\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{}", response);
    assert!(response.contains("Content-Length: 11\r\n"));
    assert!(response.contains("Connection: Close\r\n"));
    assert!(response.ends_with("test-result"));
}

#[tokio::test]
async fn test_path_matching_is_case_insensitive() {
    let addr = start_server(test_config(), test_router());

    for path in ["/test", "/Test", "/TEST", "/tEsT"] {
        let response = send_request(addr, &format!("GET {} HTTP/1.1\r\n\r\n", path)).await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{}", response);
        assert!(response.ends_with("test-result"));
    }
}

#[tokio::test]
async fn test_unknown_path_returns_404() {
    let addr = start_server(test_config(), test_router());

    let response = send_request(addr, "GET /not-found HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{}", response);
}

#[tokio::test]
async fn test_malformed_start_line_returns_400() {
    let addr = start_server(test_config(), test_router());

    let response = send_request(addr, "GET HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 400 "), "{}", response);
}

#[tokio::test]
async fn test_handler_failure_returns_500_with_message() {
    let addr = start_server(test_config(), test_router());

    let response = send_request(addr, "GET /fail HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 500 "), "{}", response);
    assert!(response.contains("boom"));
}

#[tokio::test]
async fn test_post_body_round_trip() {
    let addr = start_server(test_config(), test_router());

    let response =
        send_request(addr, "POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{}", response);
    assert!(response.contains("Content-Length: 5\r\n"));
    assert!(response.ends_with("hello"));
}

#[tokio::test]
async fn test_slow_handler_returns_408_at_deadline() {
    let addr = start_server(test_config(), test_router());

    let started = Instant::now();
    let response = send_request(addr, "GET /long-request HTTP/1.1\r\n\r\n").await;
    let elapsed = started.elapsed();

    assert!(
        response.starts_with("HTTP/1.1 408 Request Timeout\r\n"),
        "{}",
        response
    );
    // Deadline is 200ms; the handler itself would take 5000ms
    assert!(elapsed < Duration::from_millis(2500), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_missing_body_bytes_time_out() {
    let addr = start_server(test_config(), test_router());

    // content-length promises one byte that never arrives; the connection
    // stays open so the parser waits until the deadline fires
    let response = send_request(addr, "GET /test HTTP/1.1\r\ncontent-length: 1\r\n\r\n").await;
    assert!(
        response.starts_with("HTTP/1.1 408 Request Timeout\r\n"),
        "{}",
        response
    );
}

#[tokio::test]
async fn test_exactly_one_response_per_connection() {
    let addr = start_server(test_config(), test_router());

    let response = send_request(addr, "GET /test HTTP/1.1\r\n\r\n").await;
    assert_eq!(response.matches("HTTP/1.1").count(), 1);
}

#[tokio::test]
async fn test_parallel_request_limit_is_enforced() {
    let limit = 2;
    let config = test_config()
        .with_parallel_request_limit(limit)
        .with_request_timeout(Duration::from_secs(10));

    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut router = Router::new();
    {
        let in_flight = Arc::clone(&in_flight);
        let max_seen = Arc::clone(&max_seen);
        router.get("/busy", move |_| {
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(Response::ok().with_body("done"))
            }
        });
    }

    let addr = start_server(config, router);

    // A burst of 10x the permitted parallelism
    let mut clients = Vec::new();
    for _ in 0..limit * 10 {
        clients.push(tokio::spawn(async move {
            send_request(addr, "GET /busy HTTP/1.1\r\n\r\n").await
        }));
    }

    for client in clients {
        let response = client.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{}", response);
    }

    assert!(
        max_seen.load(Ordering::SeqCst) <= limit,
        "saw {} concurrent handlers",
        max_seen.load(Ordering::SeqCst)
    );
}
