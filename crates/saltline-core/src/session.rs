//! The per-connection session state machine.

use std::{num::NonZeroU32, sync::Arc};

use saltline_crypto::{
    ENVELOPE_OVERHEAD, SALT_SIZE, SessionKey, decrypt, derive_key, encrypt, generate_salt,
};
use saltline_proto::{Frame, FrameKind, MAX_FRAME_LEN};
use zeroize::Zeroizing;

use crate::error::SessionError;

/// Outbound messages after which a rekey is triggered automatically.
pub const DEFAULT_REKEY_AFTER: u32 = 20;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Rotate the key after this many outbound messages; `None` disables
    /// automatic rekeying (manual [`Session::initiate_rekey`] still works).
    pub rekey_after_messages: Option<NonZeroU32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { rekey_after_messages: NonZeroU32::new(DEFAULT_REKEY_AFTER) }
    }
}

/// Actions returned by the session state machine.
///
/// The driver (peer loop or test) executes these in order; for frame
/// ordering to hold, a `SendFrame` burst from one call must reach the
/// wire contiguously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Put this frame payload on the wire as one framed message.
    SendFrame(Vec<u8>),
}

/// What one inbound frame meant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A decrypted application message.
    Message(Vec<u8>),
    /// The peer rotated the key; the new epoch is already installed.
    Rekeyed,
}

/// One key epoch: the salt it was derived from and the derived key.
///
/// The key sits behind an `Arc` so encrypt/decrypt paths can take a
/// snapshot at the moment of use; installing a new epoch replaces the
/// whole value and drops (zeroizes) the old key once the last snapshot
/// is gone.
struct Epoch {
    salt: [u8; SALT_SIZE],
    key: Arc<SessionKey>,
}

impl Epoch {
    fn derive(passphrase: &str, salt: [u8; SALT_SIZE]) -> Result<Self, SessionError> {
        let key = derive_key(passphrase, &salt)?;
        Ok(Self { salt, key: Arc::new(key) })
    }
}

/// Session protocol state for one peer of one connection.
///
/// Construct with [`initiate`](Self::initiate) on the listening side
/// (generates the first salt, to be sent as the 16-byte preamble) or
/// [`respond`](Self::respond) on the connecting side (with the preamble
/// salt just read). The two roles are symmetric afterwards.
pub struct Session {
    passphrase: Zeroizing<String>,
    epoch: Epoch,
    epoch_index: u64,
    sent_since_rekey: u32,
    config: SessionConfig,
}

impl Session {
    /// Create the initiating session and the salt it must share.
    ///
    /// The returned salt is the connection preamble: 16 raw bytes sent
    /// before any framed message.
    pub fn initiate(
        passphrase: &str,
        config: SessionConfig,
    ) -> Result<(Self, [u8; SALT_SIZE]), SessionError> {
        let salt = generate_salt();
        let session = Self::with_salt(passphrase, salt, config)?;
        Ok((session, salt))
    }

    /// Create the responding session from the preamble salt.
    pub fn respond(
        passphrase: &str,
        salt: [u8; SALT_SIZE],
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        Self::with_salt(passphrase, salt, config)
    }

    fn with_salt(
        passphrase: &str,
        salt: [u8; SALT_SIZE],
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let epoch = Epoch::derive(passphrase, salt)?;
        Ok(Self {
            passphrase: Zeroizing::new(passphrase.to_owned()),
            epoch,
            epoch_index: 0,
            sent_since_rekey: 0,
            config,
        })
    }

    /// Snapshot of the current epoch's key.
    ///
    /// The snapshot stays valid (and stays the *same* key) for as long as
    /// the caller holds it, even if a rekey installs a new epoch
    /// meanwhile; a message is encrypted wholly under one key, never a
    /// torn mix of two.
    pub fn session_key(&self) -> Arc<SessionKey> {
        Arc::clone(&self.epoch.key)
    }

    /// Salt of the current epoch.
    pub fn current_salt(&self) -> &[u8; SALT_SIZE] {
        &self.epoch.salt
    }

    /// Number of epoch transitions this session has seen.
    pub fn epoch_index(&self) -> u64 {
        self.epoch_index
    }

    /// Seal an outgoing message into frame payload(s).
    ///
    /// Returns the ciphertext frame, followed by a rekey frame when the
    /// configured outbound-message threshold is reached. The driver must
    /// send the actions in order.
    ///
    /// # Errors
    ///
    /// - `MessageTooLarge` if the sealed frame would exceed the wire
    ///   limit; the session state is unchanged
    pub fn seal_message(&mut self, plaintext: &[u8]) -> Result<Vec<SessionAction>, SessionError> {
        let encoded_len = 1 + ENVELOPE_OVERHEAD + plaintext.len();
        if encoded_len > MAX_FRAME_LEN {
            return Err(SessionError::MessageTooLarge { len: encoded_len, max: MAX_FRAME_LEN });
        }

        let key = self.session_key();
        let envelope = encrypt(&key, plaintext);
        let payload = Frame::ciphertext(envelope).to_bytes()?;

        let mut actions = vec![SessionAction::SendFrame(payload)];

        self.sent_since_rekey = self.sent_since_rekey.saturating_add(1);
        if let Some(limit) = self.config.rekey_after_messages {
            if self.sent_since_rekey >= limit.get() {
                actions.push(self.initiate_rekey()?);
            }
        }

        Ok(actions)
    }

    /// Rotate the key now and announce it to the peer.
    ///
    /// Generates a fresh salt, installs the new epoch locally (every
    /// frame sealed after this call uses the new key), and returns the
    /// control frame to send. Rekey is unilateral: nothing is awaited
    /// from the peer.
    pub fn initiate_rekey(&mut self) -> Result<SessionAction, SessionError> {
        let salt = generate_salt();
        self.install_epoch(salt)?;
        self.sent_since_rekey = 0;

        let payload = Frame::rekey(&salt).to_bytes()?;
        Ok(SessionAction::SendFrame(payload))
    }

    /// Classify and process one inbound frame payload.
    ///
    /// Ciphertext frames decrypt under the current epoch's key; rekey
    /// frames install the announced epoch without replying.
    ///
    /// # Errors
    ///
    /// - `Authentication` / `MalformedFrame` — this message failed; the
    ///   session continues
    /// - `ProtocolViolation` — empty payload, unknown kind, or malformed
    ///   rekey body; the connection should be torn down
    pub fn handle_frame(&mut self, payload: &[u8]) -> Result<SessionEvent, SessionError> {
        let frame = Frame::decode(payload)?;

        match frame.kind() {
            FrameKind::Ciphertext => {
                let key = self.session_key();
                let plaintext = decrypt(&key, frame.body())?;
                Ok(SessionEvent::Message(plaintext))
            },
            FrameKind::Rekey => {
                let salt = frame.rekey_salt()?;
                self.install_epoch(salt)?;
                Ok(SessionEvent::Rekeyed)
            },
        }
    }

    /// Derive the key for `salt` and make it the current epoch.
    ///
    /// Derive-then-swap: the new key is fully derived before the epoch is
    /// replaced, so no caller can observe a half-installed state. The old
    /// key is dropped here, not shadowed.
    fn install_epoch(&mut self, salt: [u8; SALT_SIZE]) -> Result<(), SessionError> {
        self.epoch = Epoch::derive(&self.passphrase, salt)?;
        self.epoch_index += 1;
        tracing::debug!(epoch = self.epoch_index, "installed new key epoch");
        Ok(())
    }
}
