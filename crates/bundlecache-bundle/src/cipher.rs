//! Seekable counter-mode cipher stream for at-rest bundle encryption.
//!
//! Every byte at absolute stream offset `p` is XORed with byte `p % 16` of the
//! keystream block for block index `p / 16 + 1`. A keystream block is the
//! AES-256 encryption of a nonce holding the little-endian block index in its
//! first four bytes, XORed with the IV. Because the keystream depends only on
//! the absolute offset, reads and writes can start anywhere in the file and
//! the same transform both encrypts and decrypts.

use crate::{BundleError, BundleResult};
use aes::Aes256;
use aes::cipher::{BlockEncrypt, KeyInit};
use bundlecache_core::{EncryptionConfig, IV_LENGTH, KEY_LENGTH};
use sha2::Sha256;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Cipher block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Key material for one cipher stream.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherContext {
    key: [u8; KEY_LENGTH],
    iv: [u8; IV_LENGTH],
}

impl CipherContext {
    /// Create a context from raw key bytes.
    #[must_use]
    pub fn new(key: [u8; KEY_LENGTH], iv: [u8; IV_LENGTH]) -> Self {
        Self { key, iv }
    }

    /// Create a context from a 32-character ASCII key and 16-character ASCII IV.
    ///
    /// Lengths are checked exactly; nothing is padded or truncated.
    pub fn from_ascii(key: &str, iv: &str) -> BundleResult<Self> {
        if !key.is_ascii() || key.len() != KEY_LENGTH {
            return Err(BundleError::InvalidKey(format!(
                "key must be {KEY_LENGTH} ASCII characters"
            )));
        }
        if !iv.is_ascii() || iv.len() != IV_LENGTH {
            return Err(BundleError::InvalidKey(format!(
                "IV must be {IV_LENGTH} ASCII characters"
            )));
        }

        let mut key_bytes = [0u8; KEY_LENGTH];
        key_bytes.copy_from_slice(key.as_bytes());
        let mut iv_bytes = [0u8; IV_LENGTH];
        iv_bytes.copy_from_slice(iv.as_bytes());
        Ok(Self::new(key_bytes, iv_bytes))
    }

    /// Derive key and IV from a password with PBKDF2-HMAC-SHA256.
    pub fn from_password(password: &str, salt: &str, iterations: u32) -> BundleResult<Self> {
        if password.is_empty() || salt.is_empty() || iterations == 0 {
            return Err(BundleError::InvalidKey(
                "password, salt, and iterations are required".to_string(),
            ));
        }

        let mut derived = [0u8; KEY_LENGTH + IV_LENGTH];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            password.as_bytes(),
            salt.as_bytes(),
            iterations,
            &mut derived,
        );

        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&derived[..KEY_LENGTH]);
        let mut iv = [0u8; IV_LENGTH];
        iv.copy_from_slice(&derived[KEY_LENGTH..]);
        Ok(Self::new(key, iv))
    }

    /// Build the context described by an encryption config.
    ///
    /// Returns `None` when encryption is disabled.
    pub fn from_config(config: &EncryptionConfig) -> BundleResult<Option<Self>> {
        match config {
            EncryptionConfig::None => Ok(None),
            EncryptionConfig::Raw { key, iv } => Self::from_ascii(key, iv).map(Some),
            EncryptionConfig::Password {
                password,
                salt,
                iterations,
            } => Self::from_password(password, salt, *iterations).map(Some),
        }
    }

    /// Create the keystream generator for this key material.
    pub fn keystream(&self) -> BundleResult<Keystream> {
        let cipher = Aes256::new_from_slice(&self.key)
            .map_err(|e| BundleError::Crypto(format!("failed to initialise cipher: {e}")))?;
        Ok(Keystream {
            cipher,
            iv: self.iv,
        })
    }

    /// Transform `data` in place as if it started at `stream_pos`.
    pub fn apply_keystream(&self, data: &mut [u8], stream_pos: u64) -> BundleResult<()> {
        self.keystream()?.apply(data, stream_pos);
        Ok(())
    }
}

impl fmt::Debug for CipherContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherContext")
            .field("key", &"<redacted>")
            .field("iv", &"<redacted>")
            .field("block_size", &BLOCK_SIZE)
            .finish()
    }
}

/// Keystream generator bound to one key schedule.
#[derive(Clone)]
pub struct Keystream {
    cipher: Aes256,
    iv: [u8; IV_LENGTH],
}

impl Keystream {
    /// Keystream block for a 1-based block index.
    fn block(&self, block_index: u32) -> [u8; BLOCK_SIZE] {
        let mut nonce = [0u8; BLOCK_SIZE];
        nonce[..4].copy_from_slice(&block_index.to_le_bytes());
        for (n, v) in nonce.iter_mut().zip(self.iv.iter()) {
            *n ^= v;
        }

        let mut block = aes::Block::from(nonce);
        self.cipher.encrypt_block(&mut block);
        block.into()
    }

    /// Transform `buffer[offset..offset + count]` whose first byte sits at
    /// absolute stream offset `stream_pos`.
    ///
    /// The range is clamped to the buffer.
    pub fn transform_at(&self, buffer: &mut [u8], offset: usize, count: usize, stream_pos: u64) {
        let start = offset.min(buffer.len());
        let end = offset.saturating_add(count).min(buffer.len());
        if start >= end {
            return;
        }

        // Block indices wrap past 2^32 blocks (64 GiB).
        let mut block_index = ((stream_pos / BLOCK_SIZE as u64) as u32).wrapping_add(1);
        let mut key_pos = (stream_pos % BLOCK_SIZE as u64) as usize;
        let mut keystream = self.block(block_index);

        for byte in &mut buffer[start..end] {
            if key_pos == BLOCK_SIZE {
                block_index = block_index.wrapping_add(1);
                keystream = self.block(block_index);
                key_pos = 0;
            }
            *byte ^= keystream[key_pos];
            key_pos += 1;
        }
    }

    /// Transform all of `data` as if it started at `stream_pos`.
    pub fn apply(&self, data: &mut [u8], stream_pos: u64) {
        let len = data.len();
        self.transform_at(data, 0, len, stream_pos);
    }
}

impl fmt::Debug for Keystream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keystream").finish_non_exhaustive()
    }
}

/// Stream wrapper that encrypts on write and decrypts on read at any position.
///
/// The keystream offset is taken from the inner stream's position before each
/// call, so seeking and reading or writing slices of any length is safe.
/// Pass `&mut S` to keep ownership of the inner stream; otherwise it is
/// dropped with the wrapper.
///
/// # Example
///
/// ```
/// use bundlecache_bundle::{CipherContext, SeekableCipherStream};
/// use std::io::{Cursor, Read, Seek, SeekFrom, Write};
///
/// let ctx = CipherContext::from_ascii("0123456789abcdef0123456789abcdef", "fedcba9876543210")?;
/// let mut stream = SeekableCipherStream::new(Cursor::new(Vec::new()), &ctx)?;
/// stream.write_all(b"hello bundle")?;
///
/// stream.seek(SeekFrom::Start(6))?;
/// let mut tail = String::new();
/// stream.read_to_string(&mut tail)?;
/// assert_eq!(tail, "bundle");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SeekableCipherStream<S> {
    inner: S,
    keystream: Keystream,
}

impl<S> SeekableCipherStream<S> {
    /// Wrap `inner` with the keystream of `ctx`.
    pub fn new(inner: S, ctx: &CipherContext) -> BundleResult<Self> {
        Ok(Self {
            inner,
            keystream: ctx.keystream()?,
        })
    }

    /// Get a reference to the inner stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner stream.
    ///
    /// Writing through this reference bypasses the cipher.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Unwrap the inner stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Seek> SeekableCipherStream<S> {
    /// Current position of the inner stream.
    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    /// Length of the inner stream; the position is preserved.
    pub fn stream_len(&mut self) -> io::Result<u64> {
        let pos = self.inner.stream_position()?;
        let len = self.inner.seek(SeekFrom::End(0))?;
        if pos != len {
            self.inner.seek(SeekFrom::Start(pos))?;
        }
        Ok(len)
    }
}

impl<S: Read + Seek> SeekableCipherStream<S> {
    /// Read up to `count` bytes into `buffer[offset..]` and decrypt them.
    ///
    /// Returns the number of bytes read, or 0 after logging when the inner
    /// stream fails.
    pub fn read_into(&mut self, buffer: &mut [u8], offset: usize, count: usize) -> usize {
        let end = offset.saturating_add(count).min(buffer.len());
        if offset >= end {
            return 0;
        }
        match self.read(&mut buffer[offset..end]) {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, "cipher stream read failed");
                0
            }
        }
    }
}

impl<S: Read + Seek> Read for SeekableCipherStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pos = self.inner.stream_position()?;
        let n = self
            .inner
            .read(buf)
            .inspect_err(|e| tracing::warn!(error = %e, position = pos, "inner read failed"))?;
        self.keystream.transform_at(buf, 0, n, pos);
        Ok(n)
    }
}

impl<S: Write + Seek> Write for SeekableCipherStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let pos = self.inner.stream_position()?;
        let mut encrypted = buf.to_vec();
        self.keystream.apply(&mut encrypted, pos);
        self.inner
            .write(&encrypted)
            .inspect_err(|e| tracing::warn!(error = %e, position = pos, "inner write failed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<S: Seek> Seek for SeekableCipherStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl<S> fmt::Debug for SeekableCipherStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeekableCipherStream").finish_non_exhaustive()
    }
}
