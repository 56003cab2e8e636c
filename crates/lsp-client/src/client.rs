//
// client.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use lsp_types::InitializeParams;
use lsp_types::InitializeResult;
use lsp_types::InitializedParams;
use serde_json::Value;
use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

use crate::error::Error;
use crate::transport;
use crate::wire;
use crate::wire::Message;
use crate::wire::RequestId;
use crate::Result;

type PendingRequests = Arc<Mutex<HashMap<RequestId, oneshot::Sender<Result<Value>>>>>;

/// Handle to a language server connection.
///
/// The handle is cheap to clone; all clones share one pair of background
/// reader and writer tasks. Requests are routed back to their callers by id,
/// notifications are fire-and-forget writes. When the transport goes away all
/// in-flight requests resolve with [Error::Disconnected] and later calls fail
/// fast.
#[derive(Clone)]
pub struct Client {
    outgoing_tx: mpsc::UnboundedSender<Message>,
    pending: PendingRequests,
    next_id: Arc<AtomicI64>,
    closed: Arc<AtomicBool>,
}

impl Client {
    /// Connect over an arbitrary transport, spawning the io tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect<R, W>(read: R, write: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let client = Self {
            outgoing_tx: outgoing_tx.clone(),
            pending: pending.clone(),
            next_id: Arc::new(AtomicI64::new(0)),
            closed: closed.clone(),
        };

        tokio::spawn(write_loop(write, outgoing_rx));
        tokio::spawn(read_loop(read, outgoing_tx, pending, closed));

        client
    }

    /// Whether the connection is still believed to be live.
    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Send a typed request and await the server's reply.
    pub async fn request<R>(&self, params: R::Params) -> Result<R::Result>
    where
        R: lsp_types::request::Request,
    {
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }

        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));
        let params = serde_json::to_value(params).map_err(Error::CannotSerialize)?;

        let (response_tx, response_rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap()
            .insert(id.clone(), response_tx);

        // The reader task sets `closed` before draining `pending`, so an
        // entry inserted after the drain is seen by this re-check; without
        // it the sender would be stranded and the caller would wait forever
        if !self.is_connected() {
            self.pending.lock().unwrap().remove(&id);
            return Err(Error::Disconnected);
        }

        let message = Message::request(id.clone(), R::METHOD, wire::into_params(params));
        if self.outgoing_tx.send(message).is_err() {
            self.pending.lock().unwrap().remove(&id);
            return Err(Error::Disconnected);
        }

        let result = match response_rx.await {
            Ok(result) => result?,
            // Reader task dropped the sender, i.e. the connection died
            Err(_) => return Err(Error::Disconnected),
        };

        serde_json::from_value(result)
            .map_err(|err| Error::InvalidResponse(R::METHOD.to_string(), err))
    }

    /// Send a typed notification. Fire-and-forget: the write happens on the
    /// writer task and failures there are logged, not reported back.
    pub fn notify<N>(&self, params: N::Params) -> Result<()>
    where
        N: lsp_types::notification::Notification,
    {
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }

        let params = serde_json::to_value(params).map_err(Error::CannotSerialize)?;
        let message = Message::notification(N::METHOD, wire::into_params(params));

        self.outgoing_tx
            .send(message)
            .map_err(|_| Error::Disconnected)
    }

    /// Perform the `initialize`/`initialized` handshake.
    pub async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let result = self
            .request::<lsp_types::request::Initialize>(params)
            .await?;
        self.notify::<lsp_types::notification::Initialized>(InitializedParams {})?;
        Ok(result)
    }

    /// Request an orderly server shutdown (`shutdown` then `exit`).
    pub async fn shutdown(&self) -> Result<()> {
        self.request::<lsp_types::request::Shutdown>(()).await?;
        self.notify::<lsp_types::notification::Exit>(())?;
        Ok(())
    }
}

/// A language server running as a child process, plus the client connected
/// to its stdio.
pub struct ServerSession {
    pub client: Client,
    child: Child,
}

impl ServerSession {
    /// Spawn `program` and connect a client to its stdin/stdout. The caller
    /// is expected to run the handshake afterwards.
    ///
    /// When `program` is a bare name the OS-level PATH search applies, same
    /// as launching from a shell.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| Error::Spawn(program.to_string(), err))?;

        let stdout = child.stdout.take().ok_or(Error::MissingStdio("stdout"))?;
        let stdin = child.stdin.take().ok_or(Error::MissingStdio("stdin"))?;

        let client = Client::connect(stdout, stdin);
        Ok(Self { client, child })
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Shut the server down and reap the process.
    pub async fn close(mut self) -> Result<()> {
        self.client.shutdown().await?;
        self.child.wait().await?;
        Ok(())
    }
}

async fn write_loop<W>(mut write: W, mut outgoing_rx: mpsc::UnboundedReceiver<Message>)
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    while let Some(message) = outgoing_rx.recv().await {
        if let Err(err) = transport::write_message(&mut write, &message).await {
            log::error!("Giving up on writer task: {err}");
            break;
        }
    }
    // Either the client handle was dropped or the transport broke; both ways
    // the connection is over
}

async fn read_loop<R>(
    read: R,
    outgoing_tx: mpsc::UnboundedSender<Message>,
    pending: PendingRequests,
    closed: Arc<AtomicBool>,
) where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut reader = BufReader::new(read);

    loop {
        match transport::read_message(&mut reader).await {
            Ok(Some(Message::Response(response))) => {
                let entry = pending.lock().unwrap().remove(&response.id);
                let Some(response_tx) = entry else {
                    log::warn!("Dropping response to unknown request {}", response.id);
                    continue;
                };

                let result = match response.error {
                    Some(error) => Err(Error::Server {
                        code: error.code,
                        message: error.message,
                    }),
                    None => Ok(response.result.unwrap_or(Value::Null)),
                };

                // A closed channel means the caller gave up on the request
                let _ = response_tx.send(result);
            },

            Ok(Some(Message::Notification(notification))) => {
                // This layer registers no reverse handlers
                log::debug!("Ignoring server notification '{}'", notification.method);
            },

            Ok(Some(Message::Request(request))) => {
                log::warn!("Rejecting server-initiated request '{}'", request.method);
                let response = Message::error_response(
                    request.id,
                    wire::METHOD_NOT_FOUND,
                    format!("Client does not implement '{}'", request.method),
                );
                let _ = outgoing_tx.send(response);
            },

            Ok(None) => {
                log::info!("Language server closed the connection");
                break;
            },

            Err(err) => {
                log::error!("Giving up on reader task: {err}");
                break;
            },
        }
    }

    closed.store(true, Ordering::Release);

    // Fail any requests still in flight
    let mut pending = pending.lock().unwrap();
    for (_, response_tx) in pending.drain() {
        let _ = response_tx.send(Err(Error::Disconnected));
    }
}
