//! Common test utilities for RoomSockets integration tests
//!
//! The hub double is built on tokio-tungstenite, an independent WebSocket
//! implementation, so the hand-written client is checked against a real
//! peer rather than against itself.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use roomsockets::{InboundMessage, RouteManager};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

enum HubCommand {
    Send(String),
    Ping,
    Close,
}

#[derive(Default)]
struct HubRecord {
    connections: Mutex<HashMap<String, usize>>,
    received: Mutex<HashMap<String, Vec<String>>>,
    pongs: Mutex<HashMap<String, usize>>,
    controls: Mutex<HashMap<String, mpsc::UnboundedSender<HubCommand>>>,
}

/// Mock hub: accepts one socket per route path, echoes text received on
/// `*Message` paths and records everything else.
pub struct MockHub {
    pub addr: SocketAddr,
    record: Arc<HubRecord>,
    shutdown: Arc<Notify>,
}

impl MockHub {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let record = Arc::new(HubRecord::default());
        let shutdown = Arc::new(Notify::new());

        let record_clone = Arc::clone(&record);
        let shutdown_clone = Arc::clone(&shutdown);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let record = Arc::clone(&record_clone);
                                let shutdown = Arc::clone(&shutdown_clone);
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, record, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => break,
                }
            }
        });

        Self {
            addr,
            record,
            shutdown,
        }
    }

    async fn handle_connection(stream: TcpStream, record: Arc<HubRecord>, shutdown: Arc<Notify>) {
        let mut path = String::new();
        let callback = |req: &Request, resp: Response| {
            path = req.uri().path().to_string();
            Ok::<Response, ErrorResponse>(resp)
        };

        let ws = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        *record.connections.lock().entry(path.clone()).or_insert(0) += 1;
        record.controls.lock().insert(path.clone(), tx);

        let echo = path.ends_with("Message");
        let (mut write, mut read) = ws.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            record.received.lock().entry(path.clone()).or_default().push(text.clone());
                            if echo && write.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            *record.pongs.lock().entry(path.clone()).or_insert(0) += 1;
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                cmd = rx.recv() => {
                    match cmd {
                        Some(HubCommand::Send(text)) => {
                            if write.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Some(HubCommand::Ping) => {
                            if write.send(Message::Ping(Vec::new())).await.is_err() {
                                break;
                            }
                        }
                        Some(HubCommand::Close) | None => {
                            let _ = write.close().await;
                            break;
                        }
                    }
                }
                _ = shutdown.notified() => break,
            }
        }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of sockets ever accepted on `path`
    pub fn connection_count(&self, path: &str) -> usize {
        self.record.connections.lock().get(path).copied().unwrap_or(0)
    }

    pub fn total_connections(&self) -> usize {
        self.record.connections.lock().values().sum()
    }

    pub fn received(&self, path: &str) -> Vec<String> {
        self.record.received.lock().get(path).cloned().unwrap_or_default()
    }

    pub fn pong_count(&self, path: &str) -> usize {
        self.record.pongs.lock().get(path).copied().unwrap_or(0)
    }

    /// Push a text frame to the latest socket on `path`
    pub fn send_to(&self, path: &str, text: &str) -> bool {
        self.command(path, HubCommand::Send(text.to_string()))
    }

    /// Send a protocol-level PING frame
    pub fn ping(&self, path: &str) -> bool {
        self.command(path, HubCommand::Ping)
    }

    /// Close the latest socket on `path` from the hub side
    pub fn close_route(&self, path: &str) -> bool {
        self.command(path, HubCommand::Close)
    }

    fn command(&self, path: &str, cmd: HubCommand) -> bool {
        self.record
            .controls
            .lock()
            .get(path)
            .is_some_and(|tx| tx.send(cmd).is_ok())
    }

    /// Wait until `condition` holds, giving the hub tasks time to run
    pub async fn wait_until<F>(&self, timeout: Duration, condition: F) -> bool
    where
        F: Fn(&MockHub) -> bool,
    {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        condition(self)
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockHub {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Hub that answers the upgrade by hand and then writes raw bytes
///
/// Lets a test put frames on the wire that a conforming WebSocket library
/// refuses to produce (bad UTF-8 in a text frame, binary frames).
pub struct RawHub {
    pub addr: SocketAddr,
    writers: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Vec<u8>>>>>,
    shutdown: Arc<Notify>,
}

impl RawHub {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let writers = Arc::new(Mutex::new(HashMap::new()));
        let shutdown = Arc::new(Notify::new());

        let writers_clone = Arc::clone(&writers);
        let shutdown_clone = Arc::clone(&shutdown);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        let writers = Arc::clone(&writers_clone);
                        let shutdown = Arc::clone(&shutdown_clone);
                        tokio::spawn(async move {
                            Self::handle_connection(stream, writers, shutdown).await;
                        });
                    }
                    _ = shutdown_clone.notified() => break,
                }
            }
        });

        Self {
            addr,
            writers,
            shutdown,
        }
    }

    async fn handle_connection(
        mut stream: TcpStream,
        writers: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Vec<u8>>>>>,
        shutdown: Arc<Notify>,
    ) {
        let mut request = Vec::new();
        let mut byte = [0u8; 1];
        while !request.ends_with(b"\r\n\r\n") {
            match stream.read(&mut byte).await {
                Ok(1) => request.push(byte[0]),
                _ => return,
            }
        }
        let request = String::from_utf8_lossy(&request).into_owned();
        let path = request
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or_default()
            .to_string();

        let response = "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n";
        if stream.write_all(response.as_bytes()).await.is_err() {
            return;
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        writers.lock().insert(path, tx);

        // Client frames (greetings) are read and ignored
        let (mut read, mut write) = stream.into_split();
        let mut sink = [0u8; 1024];
        loop {
            tokio::select! {
                n = read.read(&mut sink) => {
                    if !matches!(n, Ok(n) if n > 0) {
                        break;
                    }
                }
                bytes = rx.recv() => {
                    let Some(bytes) = bytes else { break };
                    if write.write_all(&bytes).await.is_err() {
                        break;
                    }
                }
                _ = shutdown.notified() => break,
            }
        }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn connection_count(&self) -> usize {
        self.writers.lock().len()
    }

    /// Write `bytes` verbatim to the socket on `path`
    pub fn send_raw(&self, path: &str, bytes: Vec<u8>) -> bool {
        self.writers
            .lock()
            .get(path)
            .is_some_and(|tx| tx.send(bytes).is_ok())
    }
}

impl Drop for RawHub {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

/// Unmasked server frame with the given first header byte
pub fn server_frame(b0: u8, payload: &[u8]) -> Vec<u8> {
    assert!(payload.len() < 126);
    let mut frame = vec![b0, payload.len() as u8];
    frame.extend_from_slice(payload);
    frame
}

/// Tick the manager until `done` holds or the timeout passes
///
/// Returns whether `done` held and every message surfaced meanwhile.
pub async fn drive<F>(manager: &mut RouteManager, timeout: Duration, mut done: F) -> (bool, Vec<InboundMessage>)
where
    F: FnMut(&RouteManager, &[InboundMessage]) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut messages = Vec::new();
    while Instant::now() < deadline {
        let report = manager.tick().await;
        messages.extend(report.messages);
        if done(manager, &messages) {
            return (true, messages);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    (done(manager, &messages), messages)
}
