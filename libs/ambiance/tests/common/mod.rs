//! Common test utilities for the device controller tests

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
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

#[derive(Default)]
struct Record {
    received: Mutex<HashMap<String, Vec<String>>>,
    senders: Mutex<HashMap<String, mpsc::UnboundedSender<String>>>,
}

/// Hub double: records text per path and lets the test push text down a path
pub struct Hub {
    pub addr: SocketAddr,
    record: Arc<Record>,
    shutdown: Arc<Notify>,
}

impl Hub {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let record = Arc::new(Record::default());
        let shutdown = Arc::new(Notify::new());

        let (record_task, shutdown_task) = (Arc::clone(&record), Arc::clone(&shutdown));
        tokio::spawn(async move {
            loop {
                let stream = tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, _)) => stream,
                        Err(_) => break,
                    },
                    _ = shutdown_task.notified() => break,
                };
                let record = Arc::clone(&record_task);
                let shutdown = Arc::clone(&shutdown_task);
                tokio::spawn(async move {
                    let mut path = String::new();
                    let callback = |req: &Request, resp: Response| {
                        path = req.uri().path().to_string();
                        Ok::<Response, ErrorResponse>(resp)
                    };
                    let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                        return;
                    };
                    let (tx, mut rx) = mpsc::unbounded_channel();
                    record.senders.lock().insert(path.clone(), tx);
                    let (mut write, mut read) = ws.split();
                    loop {
                        tokio::select! {
                            msg = read.next() => match msg {
                                Some(Ok(Message::Text(text))) => {
                                    record.received.lock().entry(path.clone()).or_default().push(text);
                                }
                                Some(Ok(_)) => {}
                                _ => break,
                            },
                            out = rx.recv() => match out {
                                Some(text) => {
                                    if write.send(Message::Text(text)).await.is_err() {
                                        break;
                                    }
                                }
                                None => break,
                            },
                            _ = shutdown.notified() => break,
                        }
                    }
                });
            }
        });

        Self { addr, record, shutdown }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn received(&self, path: &str) -> Vec<String> {
        self.record.received.lock().get(path).cloned().unwrap_or_default()
    }

    pub fn send_to(&self, path: &str, text: &str) -> bool {
        self.record
            .senders
            .lock()
            .get(path)
            .is_some_and(|tx| tx.send(text.to_string()).is_ok())
    }

    pub fn connected(&self, path: &str) -> bool {
        self.record.senders.lock().contains_key(path)
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

/// Poll `condition` every few milliseconds until it holds or time runs out
pub async fn eventually<F: FnMut() -> bool>(timeout: Duration, mut condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
