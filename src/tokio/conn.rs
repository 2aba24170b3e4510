//! Asynchronous PostgreSQL connection.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::client::{Client, RequestStream, ResponseStream};
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::backend::{BackendKeyData, BackendMessage, ParameterStatus};
use crate::protocol::frontend::{CopyFail, FrontendMessage};
use crate::protocol::types::TransactionStatus;
use crate::state::action::Action;
use crate::state::connection::ConnectionStateMachine;

use super::stream::{Io, Stream};

/// Requests are buffered up to this size before being written.
const WRITE_CHUNK: usize = 8 * 1024;

const ABANDONED_COPY: &str = "COPY abandoned by client";

/// Where the connection stands between and during exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// The server is waiting for a query.
    Ready,
    /// Requests are being written. Seen by a later exchange only if the
    /// write was cancelled part way through a frame.
    Writing,
    /// Requests were sent and responses are being read. Seen by a later
    /// exchange when the previous response stream was dropped early.
    Reading,
    /// The server is waiting for COPY data.
    CopyIn,
    /// The server is sending COPY data.
    CopyOut,
    Closed,
    Broken,
}

struct Transport {
    stream: Option<Stream>,
    phase: Phase,
    write_buffer: Vec<u8>,
}

#[derive(Default)]
struct Shared {
    parameters: HashMap<String, String>,
    transaction_status: TransactionStatus,
}

/// Asynchronous PostgreSQL connection.
///
/// Implements [`Client`]: exchanges are serialized on an async mutex that a
/// response stream holds from its first poll until it ends or is dropped.
/// A response stream ends after `ReadyForQuery` (which it does not yield) or
/// after a COPY response (which it does). [`Client::reserve`] holds the mutex
/// across several exchanges.
pub struct Conn {
    transport: Arc<AsyncMutex<Transport>>,
    shared: Arc<Mutex<Shared>>,
    backend_key: Option<BackendKeyData>,
}

impl Conn {
    /// Connect to a PostgreSQL server.
    pub async fn new<O: TryInto<Opts>>(opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        let opts = opts.try_into()?;

        #[cfg(unix)]
        if let Some(socket_path) = &opts.socket {
            let stream = Stream::unix(UnixStream::connect(socket_path).await?);
            return Self::new_with_stream(stream, opts).await;
        }

        if opts.host.is_empty() {
            return Err(Error::invalid_argument("host is empty"));
        }
        let addr = format!("{}:{}", opts.host, opts.port);
        let tcp = TcpStream::connect(&addr).await?;
        tcp.set_nodelay(true)?;
        Self::new_with_stream(Stream::tcp(tcp), opts).await
    }

    /// Run the startup handshake over an already connected transport.
    pub async fn with_io(io: impl Io + 'static, opts: Opts) -> Result<Self> {
        Self::new_with_stream(Stream::io(io), opts).await
    }

    async fn new_with_stream(mut stream: Stream, options: Opts) -> Result<Self> {
        let mut write_buffer = Vec::new();
        let mut state_machine = ConnectionStateMachine::new(options);

        let mut action = state_machine.start();
        loop {
            action = match action {
                Action::WriteAndReadMessage(message) => {
                    tracing::trace!(message = message.name(), "send");
                    write_buffer.clear();
                    message.encode(&mut write_buffer)?;
                    stream.write_all(&write_buffer).await?;
                    stream.flush().await?;
                    state_machine.step(read_message(&mut stream).await?)?
                }
                Action::ReadMessage => state_machine.step(read_message(&mut stream).await?)?,
                Action::Finished => break,
            };
        }
        tracing::debug!("connection ready");

        let shared = Shared {
            parameters: state_machine.server_params().iter().cloned().collect(),
            transaction_status: state_machine.transaction_status(),
        };

        Ok(Self {
            transport: Arc::new(AsyncMutex::new(Transport {
                stream: Some(stream),
                phase: Phase::Ready,
                write_buffer,
            })),
            shared: Arc::new(Mutex::new(shared)),
            backend_key: state_machine.backend_key().copied(),
        })
    }

    /// Get the backend key data for query cancellation.
    pub fn backend_key(&self) -> Option<&BackendKeyData> {
        self.backend_key.as_ref()
    }

    /// Transaction status reported by the latest `ReadyForQuery`.
    pub fn transaction_status(&self) -> TransactionStatus {
        lock(&self.shared).transaction_status
    }
}

impl Client for Conn {
    fn exchange(&self, requests: RequestStream) -> ResponseStream {
        exchange(
            Access::Shared(Arc::clone(&self.transport)),
            Arc::clone(&self.shared),
            requests,
        )
    }

    fn parameter_status(&self) -> HashMap<String, String> {
        lock(&self.shared).parameters.clone()
    }

    fn close(&self) -> BoxFuture<'static, Result<()>> {
        close(Access::Shared(Arc::clone(&self.transport)))
    }

    fn reserve(self: Arc<Self>) -> BoxFuture<'static, Result<Arc<dyn Client>>> {
        let transport = Arc::clone(&self.transport);
        let shared = Arc::clone(&self.shared);
        async move {
            let held = transport.lock_owned().await;
            tracing::trace!("connection reserved");
            let reserved: Arc<dyn Client> = Arc::new(Reserved {
                transport: Arc::new(AsyncMutex::new(held)),
                shared,
            });
            Ok(reserved)
        }
        .boxed()
    }
}

/// A [`Conn`] held for one caller until the last clone is dropped.
struct Reserved {
    transport: Arc<AsyncMutex<OwnedMutexGuard<Transport>>>,
    shared: Arc<Mutex<Shared>>,
}

impl Client for Reserved {
    fn exchange(&self, requests: RequestStream) -> ResponseStream {
        exchange(
            Access::Reserved(Arc::clone(&self.transport)),
            Arc::clone(&self.shared),
            requests,
        )
    }

    fn parameter_status(&self) -> HashMap<String, String> {
        lock(&self.shared).parameters.clone()
    }

    fn close(&self) -> BoxFuture<'static, Result<()>> {
        close(Access::Reserved(Arc::clone(&self.transport)))
    }

    fn reserve(self: Arc<Self>) -> BoxFuture<'static, Result<Arc<dyn Client>>> {
        let reserved: Arc<dyn Client> = self;
        future::ok(reserved).boxed()
    }
}

/// The route to the transport: the connection's own mutex, or the inner
/// mutex of a reservation.
enum Access {
    Shared(Arc<AsyncMutex<Transport>>),
    Reserved(Arc<AsyncMutex<OwnedMutexGuard<Transport>>>),
}

impl Access {
    async fn lock(self) -> Held {
        match self {
            Access::Shared(transport) => Held::Shared(transport.lock_owned().await),
            Access::Reserved(transport) => Held::Reserved(transport.lock_owned().await),
        }
    }
}

enum Held {
    Shared(OwnedMutexGuard<Transport>),
    Reserved(OwnedMutexGuard<OwnedMutexGuard<Transport>>),
}

impl Deref for Held {
    type Target = Transport;

    fn deref(&self) -> &Transport {
        match self {
            Held::Shared(guard) => guard,
            Held::Reserved(guard) => guard,
        }
    }
}

impl DerefMut for Held {
    fn deref_mut(&mut self) -> &mut Transport {
        match self {
            Held::Shared(guard) => guard,
            Held::Reserved(guard) => guard,
        }
    }
}

enum Exchange {
    Start {
        access: Access,
        shared: Arc<Mutex<Shared>>,
        requests: RequestStream,
    },
    Reading {
        transport: Held,
        shared: Arc<Mutex<Shared>>,
    },
    Done,
}

fn exchange(access: Access, shared: Arc<Mutex<Shared>>, requests: RequestStream) -> ResponseStream {
    let start = Exchange::Start {
        access,
        shared,
        requests,
    };

    stream::unfold(start, |exchange| async move {
        match exchange {
            Exchange::Start {
                access,
                shared,
                requests,
            } => {
                let mut transport = access.lock().await;
                match begin(&mut transport, &shared, requests).await {
                    Ok(true) => read_next(transport, shared).await,
                    Ok(false) => None,
                    Err(err) => Some((Err(err), Exchange::Done)),
                }
            }
            Exchange::Reading { transport, shared } => read_next(transport, shared).await,
            Exchange::Done => None,
        }
    })
    .boxed()
}

fn close(access: Access) -> BoxFuture<'static, Result<()>> {
    async move {
        let mut transport = access.lock().await;
        transport.phase = Phase::Closed;
        match transport.stream.take() {
            Some(mut stream) => Ok(stream.shutdown().await?),
            None => Ok(()),
        }
    }
    .boxed()
}

fn lock(shared: &Mutex<Shared>) -> std::sync::MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_copy_message(message: &FrontendMessage) -> bool {
    matches!(
        message,
        FrontendMessage::CopyData(_) | FrontendMessage::CopyDone | FrontendMessage::CopyFail(_)
    )
}

/// Bring the connection to a state where `requests` can be sent, then send
/// them. Returns whether responses should be read.
async fn begin(
    transport: &mut Transport,
    shared: &Mutex<Shared>,
    mut requests: RequestStream,
) -> Result<bool> {
    let first = requests.next().await;

    match (transport.phase, &first) {
        (Phase::Closed, Some(FrontendMessage::Terminate)) => return Ok(false),
        (Phase::Closed, _) => return Err(Error::ConnectionClosed),
        (Phase::Broken | Phase::Writing, _) => return Err(Error::ConnectionBroken),
        (_, Some(FrontendMessage::Terminate)) => {}
        (Phase::Ready, None) => return Ok(false),
        (Phase::Ready, _) => {}
        (Phase::CopyIn, Some(message)) if is_copy_message(message) => {}
        (Phase::CopyOut, None) => {}
        (Phase::CopyIn | Phase::CopyOut | Phase::Reading, _) => {
            resync(transport, shared).await?;
            if first.is_none() {
                return Ok(false);
            }
        }
    }

    let Some(first) = first else {
        // keep reading the COPY OUT data the server is still sending
        transport.phase = Phase::Reading;
        return Ok(true);
    };

    if transport.phase == Phase::Ready && is_copy_message(&first) {
        return Err(Error::invalid_argument(format!(
            "{} sent with no COPY FROM STDIN in progress",
            first.name()
        )));
    }

    let resume = transport.phase;
    transport.phase = Phase::Writing;
    transport.write_buffer.clear();
    let mut written = false;
    let mut terminate = false;
    let mut next = Some(first);
    while let Some(message) = next {
        tracing::trace!(message = message.name(), "send");
        terminate |= matches!(message, FrontendMessage::Terminate);
        if let Err(err) = message.encode(&mut transport.write_buffer) {
            abort_write(transport, resume, written).await?;
            return Err(err);
        }
        if transport.write_buffer.len() >= WRITE_CHUNK {
            write_buffered(transport).await?;
            written = true;
        }
        next = requests.next().await;
    }
    write_buffered(transport).await?;
    flush(transport).await?;

    if terminate {
        transport.phase = Phase::Closed;
        if let Some(mut stream) = transport.stream.take() {
            stream.shutdown().await?;
        }
        return Ok(false);
    }

    transport.phase = Phase::Reading;
    Ok(true)
}

/// Leave the connection consistent after a request could not be encoded.
///
/// If nothing reached the transport the unsent requests are dropped.
/// Otherwise the complete messages already buffered are sent, and a later
/// exchange resynchronizes.
async fn abort_write(transport: &mut Transport, resume: Phase, written: bool) -> Result<()> {
    if !written {
        transport.write_buffer.clear();
        transport.phase = resume;
        return Ok(());
    }
    write_buffered(transport).await?;
    flush(transport).await?;
    transport.phase = match resume {
        Phase::CopyIn => Phase::CopyIn,
        _ => Phase::Reading,
    };
    Ok(())
}

async fn flush(transport: &mut Transport) -> Result<()> {
    let stream = transport.stream.as_mut().ok_or(Error::ConnectionClosed)?;
    stream.flush().await.inspect_err(|_| transport.phase = Phase::Broken)?;
    Ok(())
}

async fn write_buffered(transport: &mut Transport) -> Result<()> {
    let stream = transport.stream.as_mut().ok_or(Error::ConnectionClosed)?;
    if let Err(err) = stream.write_all(&transport.write_buffer).await {
        transport.phase = Phase::Broken;
        return Err(err.into());
    }
    transport.write_buffer.clear();
    Ok(())
}

/// Discard whatever is left of an abandoned exchange, up to `ReadyForQuery`.
async fn resync(transport: &mut Transport, shared: &Mutex<Shared>) -> Result<()> {
    tracing::debug!(phase = ?transport.phase, "resynchronizing abandoned exchange");

    if transport.phase == Phase::CopyIn {
        send_copy_fail(transport).await?;
    }

    loop {
        match receive(transport, shared).await? {
            BackendMessage::ReadyForQuery(_) => return Ok(()),
            BackendMessage::CopyInResponse(_) | BackendMessage::CopyBothResponse(_) => {
                send_copy_fail(transport).await?;
            }
            BackendMessage::ErrorResponse(response) => {
                let err = response.into_error();
                tracing::debug!(error = %err, "discarded while resynchronizing");
                if err.is_connection_broken() {
                    transport.phase = Phase::Broken;
                    return Err(err);
                }
            }
            _ => {}
        }
    }
}

async fn send_copy_fail(transport: &mut Transport) -> Result<()> {
    transport.phase = Phase::Writing;
    transport.write_buffer.clear();
    FrontendMessage::CopyFail(CopyFail::new(ABANDONED_COPY)?).encode(&mut transport.write_buffer)?;
    write_buffered(transport).await?;
    flush(transport).await?;
    transport.phase = Phase::Reading;
    Ok(())
}

/// Read one message, handling the bookkeeping every message needs.
async fn receive(transport: &mut Transport, shared: &Mutex<Shared>) -> Result<BackendMessage> {
    let stream = transport.stream.as_mut().ok_or(Error::ConnectionClosed)?;
    let message = match read_message(stream).await {
        Ok(message) => message,
        Err(err) => {
            transport.phase = Phase::Broken;
            return Err(err);
        }
    };

    match &message {
        BackendMessage::ParameterStatus(ParameterStatus { name, value }) => {
            lock(shared).parameters.insert(name.clone(), value.clone());
        }
        BackendMessage::ReadyForQuery(ready) => {
            lock(shared).transaction_status = ready.status;
            transport.phase = Phase::Ready;
        }
        BackendMessage::CopyInResponse(_) | BackendMessage::CopyBothResponse(_) => {
            transport.phase = Phase::CopyIn;
        }
        BackendMessage::CopyOutResponse(_) => transport.phase = Phase::CopyOut,
        BackendMessage::ErrorResponse(response) if response.is_fatal() => {
            transport.phase = Phase::Broken;
        }
        _ => {}
    }
    Ok(message)
}

async fn read_next(
    mut transport: Held,
    shared: Arc<Mutex<Shared>>,
) -> Option<(Result<BackendMessage>, Exchange)> {
    match receive(&mut transport, &shared).await {
        Ok(BackendMessage::ReadyForQuery(_)) => None,
        Ok(message) => match transport.phase {
            Phase::Reading => Some((Ok(message), Exchange::Reading { transport, shared })),
            // a COPY response or a fatal error ends the exchange
            _ => Some((Ok(message), Exchange::Done)),
        },
        Err(err) => Some((Err(err), Exchange::Done)),
    }
}

async fn read_message(stream: &mut Stream) -> Result<BackendMessage> {
    let (tag, payload) = stream.read_frame().await?;
    let message = BackendMessage::decode(tag, payload)?;
    tracing::trace!(message = message.name(), "receive");
    Ok(message)
}
