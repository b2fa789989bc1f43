use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use dbatcher_client::{Client, DeliveryParams, Error, send_once};
use serde_json::json;
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};

/// A minimal HTTP/1.1 server answering every request with `200 OK`, counting the
/// connections it accepts
async fn counting_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(serve_connection(socket));
        }
    });
    (address, accepted)
}

async fn serve_connection(socket: TcpStream) {
    let mut reader = BufReader::new(socket);
    loop {
        let mut content_length = 0;
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
            if line == "\r\n" {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }
        let mut body = vec![0; content_length];
        if reader.read_exact(&mut body).await.is_err() {
            return;
        }
        let response = b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n";
        if reader.get_mut().write_all(response).await.is_err() {
            return;
        }
    }
}

#[tokio::test]
async fn client_reuses_its_connection() {
    let (address, accepted) = counting_server().await;
    let client = Client::new(address, Duration::from_secs(5)).unwrap();
    let params = DeliveryParams::buffered("events", "a,b", 100, 50);

    for i in 0..3 {
        let outcome = client
            .send(&params, &[json!({"a": i, "b": i})])
            .await
            .unwrap();
        assert!(outcome.is_success());
    }

    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn send_once_opens_a_connection_per_call() {
    let (address, accepted) = counting_server().await;
    let params = DeliveryParams::sync("events", "a");

    for _ in 0..2 {
        let outcome = send_once(address.as_str(), Duration::from_secs(5), &params, &[[1]])
            .await
            .unwrap();
        assert!(outcome.is_success());
    }

    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn connection_refused_is_reported() {
    // bind then drop a listener to get a local port nothing listens on
    let address = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };
    let client = Client::new(address, Duration::from_secs(5)).unwrap();

    let outcome = client
        .send(&DeliveryParams::sync("events", "a"), &[[1]])
        .await
        .unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.status(), None);
    assert!(!outcome.error().unwrap_or_default().is_empty());
    assert!(matches!(
        outcome.into_result(),
        Err(Error::Transport { .. })
    ));
}

#[tokio::test]
async fn slow_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    // accept connections and never answer
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = Client::new(address, Duration::from_millis(200)).unwrap();
    let outcome = client
        .send(&DeliveryParams::sync("events", "a"), &[[1]])
        .await
        .unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.status(), None);
    assert!(!outcome.error().unwrap_or_default().is_empty());
    server.abort();
}

#[tokio::test]
async fn invalid_address_is_a_transport_failure() {
    let client = Client::new("not a url", Duration::from_secs(1)).unwrap();

    let outcome = client
        .send(&DeliveryParams::sync("events", "a"), &[[1]])
        .await
        .unwrap();

    assert!(!outcome.is_success());
    assert!(outcome.error().is_some());
}
