//! Peer connection: preamble exchange, receive loop, serialized sends.
//!
//! One [`Peer`] drives one two-party connection. The listening side
//! initiates (generates and sends the first salt), the connecting side
//! responds (reads it); after the preamble the roles are symmetric.
//!
//! Inbound traffic is handled by a single background task that blocks on
//! the framed reader and forwards each frame's meaning as a [`PeerEvent`]
//! on the returned channel. Outbound traffic goes through [`Peer::send`]
//! and [`Peer::rekey`], which hold the writer lock across seal-and-write
//! so concurrent callers cannot interleave frames or reorder them around
//! an epoch change.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use saltline_core::{Session, SessionAction, SessionConfig, SessionError, SessionEvent};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf},
    net::{TcpListener, TcpStream, ToSocketAddrs},
    sync::mpsc,
    task::JoinHandle,
};

use crate::{
    error::NetError,
    framing::{FramedReader, FramedWriter, read_preamble, write_preamble},
};

type BoxStream = Box<dyn AsyncStream>;

/// Object-safe alias for anything usable as the underlying connection.
trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}
impl<S: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for S {}

/// Peer configuration.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Session-layer configuration (rekey threshold).
    pub session: SessionConfig,
    /// Capacity of the event channel handed to the application.
    pub event_buffer: usize,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self { session: SessionConfig::default(), event_buffer: 32 }
    }
}

/// What ended the receive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the stream; a clean end, not an error.
    EndOfStream,
    /// The peer violated the protocol; the connection is untrustworthy.
    Protocol(SessionError),
    /// The underlying stream failed.
    Transport(String),
}

/// Events delivered to the application, one per inbound frame (plus the
/// terminal [`Closed`](PeerEvent::Closed)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// A decrypted application message from the peer.
    Message(Vec<u8>),
    /// The peer rotated the session key; already installed locally.
    Rekeyed,
    /// One inbound message failed (bad tag or truncated envelope). The
    /// session continues; later messages may still decrypt.
    MessageFailed(SessionError),
    /// The receive loop has terminated. No further events will arrive.
    Closed(CloseReason),
}

/// Accepts the single connection of a listening peer.
///
/// Bound separately from [`Listener::accept`] so callers can learn the
/// local address (e.g. an ephemeral port) before the peer connects.
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind a TCP listener.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, NetError> {
        Ok(Self { inner: TcpListener::bind(addr).await? })
    }

    /// Local address the listener is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, NetError> {
        Ok(self.inner.local_addr()?)
    }

    /// Accept one connection and run a session over it as the initiator.
    ///
    /// The protocol is strictly two-party: the listener is consumed after
    /// a single accept.
    pub async fn accept(
        self,
        passphrase: &str,
        config: PeerConfig,
    ) -> Result<(Peer, mpsc::Receiver<PeerEvent>), NetError> {
        let (stream, remote) = self.inner.accept().await?;
        tracing::info!(%remote, "peer connected");
        Peer::initiate_on(stream, passphrase, config).await
    }
}

/// One side of a Saltline connection.
pub struct Peer {
    session: Arc<Mutex<Session>>,
    writer: Arc<tokio::sync::Mutex<FramedWriter<WriteHalf<BoxStream>>>>,
    recv_task: JoinHandle<()>,
}

impl Peer {
    /// Connect to a listening peer and run a session as the responder.
    pub async fn connect(
        addr: impl ToSocketAddrs,
        passphrase: &str,
        config: PeerConfig,
    ) -> Result<(Self, mpsc::Receiver<PeerEvent>), NetError> {
        let stream = TcpStream::connect(addr).await?;
        tracing::info!("connected to peer");
        Self::respond_on(stream, passphrase, config).await
    }

    /// Run the initiating role over an already-established stream.
    ///
    /// Writes the 16-byte salt preamble, then starts the receive loop.
    /// Generic over the stream so tests can drive in-memory pipes.
    pub async fn initiate_on<S>(
        stream: S,
        passphrase: &str,
        config: PeerConfig,
    ) -> Result<(Self, mpsc::Receiver<PeerEvent>), NetError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, mut writer) = tokio::io::split(Box::new(stream) as BoxStream);
        let (session, salt) = Session::initiate(passphrase, config.session.clone())?;
        write_preamble(&mut writer, &salt).await?;
        Ok(Self::spawn(reader, writer, session, &config))
    }

    /// Run the responding role over an already-established stream.
    ///
    /// Reads exactly the 16-byte salt preamble before anything else.
    pub async fn respond_on<S>(
        stream: S,
        passphrase: &str,
        config: PeerConfig,
    ) -> Result<(Self, mpsc::Receiver<PeerEvent>), NetError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (mut reader, writer) = tokio::io::split(Box::new(stream) as BoxStream);
        let salt = read_preamble(&mut reader).await?;
        let session = Session::respond(passphrase, salt, config.session.clone())?;
        Ok(Self::spawn(reader, writer, session, &config))
    }

    fn spawn(
        reader: ReadHalf<BoxStream>,
        writer: WriteHalf<BoxStream>,
        session: Session,
        config: &PeerConfig,
    ) -> (Self, mpsc::Receiver<PeerEvent>) {
        let session = Arc::new(Mutex::new(session));
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));

        let recv_task = tokio::spawn(receive_loop(
            FramedReader::new(reader),
            Arc::clone(&session),
            events_tx,
        ));

        let peer = Self {
            session,
            writer: Arc::new(tokio::sync::Mutex::new(FramedWriter::new(writer))),
            recv_task,
        };
        (peer, events_rx)
    }

    /// Encrypt and send one application message.
    ///
    /// May put more than one frame on the wire: reaching the rekey
    /// threshold appends a rekey frame after the ciphertext. The writer
    /// lock is held for the whole burst, so concurrent sends serialize
    /// cleanly and frames reach the wire in the order they were sealed.
    ///
    /// # Errors
    ///
    /// - `Session(MessageTooLarge)` if the message exceeds the frame limit
    /// - `Io` if the stream write fails
    pub async fn send(&self, plaintext: &[u8]) -> Result<(), NetError> {
        let mut writer = self.writer.lock().await;
        let actions = {
            let mut session = lock_session(&self.session);
            session.seal_message(plaintext)?
        };
        for action in actions {
            let SessionAction::SendFrame(payload) = action;
            writer.send(&payload).await?;
        }
        Ok(())
    }

    /// Rotate the session key now and announce it to the peer.
    pub async fn rekey(&self) -> Result<(), NetError> {
        let mut writer = self.writer.lock().await;
        let action = {
            let mut session = lock_session(&self.session);
            session.initiate_rekey()?
        };
        let SessionAction::SendFrame(payload) = action;
        writer.send(&payload).await
    }

    /// Number of epoch transitions this side has seen.
    pub fn epoch_index(&self) -> u64 {
        lock_session(&self.session).epoch_index()
    }

    /// Stop the receive loop.
    ///
    /// Sends already in flight complete; no further events are delivered.
    /// Dropping the `Peer` afterwards closes the stream.
    pub fn close(&self) {
        self.recv_task.abort();
    }
}

/// Lock the session, recovering from a poisoned mutex.
///
/// Session methods do not panic, but a poisoned lock must not take the
/// connection down with it.
fn lock_session(session: &Arc<Mutex<Session>>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The background receive loop: block on frames, dispatch events.
///
/// Terminates on end of stream, fatal protocol error, transport error,
/// or the application dropping the event receiver. Inbound rekeys are
/// installed here (the sole writer besides locally initiated rekeys) and
/// never answered — rekey is unilateral.
async fn receive_loop(
    mut reader: FramedReader<ReadHalf<BoxStream>>,
    session: Arc<Mutex<Session>>,
    events: mpsc::Sender<PeerEvent>,
) {
    loop {
        let event = match reader.recv().await {
            Ok(Some(payload)) => {
                let outcome = lock_session(&session).handle_frame(&payload);
                match outcome {
                    Ok(SessionEvent::Message(plaintext)) => PeerEvent::Message(plaintext),
                    Ok(SessionEvent::Rekeyed) => PeerEvent::Rekeyed,
                    Err(err) if err.is_fatal() => {
                        tracing::warn!(%err, "protocol violation, closing connection");
                        let _ = events.send(PeerEvent::Closed(CloseReason::Protocol(err))).await;
                        return;
                    },
                    Err(err) => {
                        tracing::warn!(%err, "dropping undecryptable message");
                        PeerEvent::MessageFailed(err)
                    },
                }
            },
            Ok(None) => {
                tracing::info!("peer closed the connection");
                let _ = events.send(PeerEvent::Closed(CloseReason::EndOfStream)).await;
                return;
            },
            Err(NetError::Protocol(err)) => {
                tracing::warn!(%err, "wire violation, closing connection");
                let _ = events
                    .send(PeerEvent::Closed(CloseReason::Protocol(err.into())))
                    .await;
                return;
            },
            Err(err) => {
                tracing::warn!(%err, "transport failure, closing connection");
                let _ = events
                    .send(PeerEvent::Closed(CloseReason::Transport(err.to_string())))
                    .await;
                return;
            },
        };

        if events.send(event).await.is_err() {
            // Application dropped the receiver; nobody is listening.
            return;
        }
    }
}
