//! In-process WebSocket server for feed client tests.
//!
//! Accepts any number of connections, records every text frame a client
//! sends, and lets tests push frames or drop all connections to simulate a
//! remote close.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;

pub struct MockFeedServer {
    addr: SocketAddr,
    accept_task: JoinHandle<()>,
    accepted: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    conns: Arc<Mutex<Vec<mpsc::UnboundedSender<Message>>>>,
}

impl MockFeedServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let conns: Arc<Mutex<Vec<mpsc::UnboundedSender<Message>>>> =
            Arc::new(Mutex::new(Vec::new()));

        let accept_counter = Arc::clone(&accepted);
        let received_log = Arc::clone(&received);
        let conn_list = Arc::clone(&conns);
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let ws = match accept_async(stream).await {
                    Ok(ws) => ws,
                    Err(_) => continue,
                };
                accept_counter.fetch_add(1, Ordering::SeqCst);
                let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
                conn_list.lock().await.push(tx);
                let received = Arc::clone(&received_log);
                tokio::spawn(async move {
                    let (mut sink, mut source) = ws.split();
                    loop {
                        tokio::select! {
                            cmd = rx.recv() => match cmd {
                                Some(msg) => {
                                    if sink.send(msg).await.is_err() {
                                        break;
                                    }
                                }
                                // Sender dropped: simulate a server-side close.
                                None => {
                                    let _ = sink.send(Message::Close(None)).await;
                                    break;
                                }
                            },
                            frame = source.next() => match frame {
                                Some(Ok(Message::Text(text))) => {
                                    received.lock().await.push(text);
                                }
                                Some(Ok(Message::Close(_))) | None => break,
                                Some(Err(_)) => break,
                                Some(Ok(_)) => {}
                            },
                        }
                    }
                });
            }
        });

        Self {
            addr,
            accept_task,
            accepted,
            received,
            conns,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Completed WebSocket handshakes since start.
    pub fn accepted_count(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Every text frame received from clients, in arrival order.
    pub async fn received(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }

    /// Push a text frame to every live connection.
    pub async fn broadcast(&self, text: &str) {
        self.conns
            .lock()
            .await
            .retain(|tx| tx.send(Message::Text(text.to_string())).is_ok());
    }

    /// Close every live connection from the server side. The listener keeps
    /// accepting, so reconnecting clients get a fresh connection.
    pub async fn close_all(&self) {
        self.conns.lock().await.clear();
    }
}

impl Drop for MockFeedServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}
