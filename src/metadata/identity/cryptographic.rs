//! Strong-name key material and public-key-token derivation.
//!
//! A strong-name key lives in a CAPI key blob file: either a full key pair
//! (`PRIVATEKEYBLOB`, magic `RSA2`) or a public-only blob (`PUBLICKEYBLOB`,
//! magic `RSA1`), optionally already wrapped in the strong-name header that
//! metadata stores (SigAlgID, HashAlgID, length). [`StrongNameKey`] accepts all
//! three forms and normalizes them to the wrapped public key, which is what
//! friend-access declarations embed and what the token is derived from.
//!
//! The token derivation is fixed by the platform: SHA-1 over the wrapped public
//! key blob, byte order reversed, first 8 bytes kept.

use std::path::Path;

use sha1::{Digest, Sha1};

use crate::{file::parser::Parser, Result};

/// `CALG_RSA_SIGN`: the only key algorithm valid for strong names.
const CALG_RSA_SIGN: u32 = 0x0000_2400;
/// `CALG_SHA1`: hash algorithm recorded in the strong-name header.
const CALG_SHA1: u32 = 0x0000_8004;
/// `RSA1` magic of a CAPI public key blob.
const MAGIC_RSA1: u32 = 0x3141_5352;
/// `RSA2` magic of a CAPI private key blob.
const MAGIC_RSA2: u32 = 0x3241_5352;
/// `bType` of a CAPI public key blob.
const BLOB_TYPE_PUBLIC: u8 = 0x06;
/// `bType` of a CAPI private key blob.
const BLOB_TYPE_PRIVATE: u8 = 0x07;
/// `bVersion` of CAPI key blobs.
const BLOB_VERSION: u8 = 0x02;

/// A strong-name signing key, normalized to its public key blob.
///
/// The blob held here is the full strong-name public key as it appears in
/// metadata: a 12-byte header (signature algorithm, hash algorithm, byte count)
/// followed by the CAPI `RSA1` public key structure.
#[derive(Debug, Clone)]
pub struct StrongNameKey {
    public_key: Vec<u8>,
    has_private: bool,
}

impl StrongNameKey {
    /// Load a key blob from a file.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read and
    /// [`crate::Error::Malformed`] if the blob is not a recognized key format.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_blob(&data)
    }

    /// Parse a key blob from raw bytes.
    ///
    /// Accepts a CAPI `PRIVATEKEYBLOB` key pair, a bare CAPI `PUBLICKEYBLOB`,
    /// or a strong-name public key that already carries the 12-byte header.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for empty input and
    /// [`crate::Error::Malformed`] for anything that is not one of the three
    /// recognized blob forms.
    pub fn from_blob(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(crate::Error::Empty);
        }

        match data[0] {
            BLOB_TYPE_PRIVATE => Self::from_private_blob(data),
            BLOB_TYPE_PUBLIC => Ok(Self {
                public_key: Self::wrap_public_blob(data)?,
                has_private: false,
            }),
            _ => {
                // Possibly already wrapped: the header starts with the
                // little-endian signature algorithm id.
                let mut parser = Parser::new(data);
                let sig_alg = parser.read_u32()?;
                let hash_alg = parser.read_u32()?;
                let length = parser.read_u32()? as usize;
                if sig_alg != CALG_RSA_SIGN || hash_alg != CALG_SHA1 || length != parser.remaining()
                {
                    return Err(malformed_error!(
                        "Unrecognized key blob (type 0x{:02x}, {} bytes)",
                        data[0],
                        data.len()
                    ));
                }
                Self::validate_public_blob(parser.read_bytes(length)?)?;
                Ok(Self {
                    public_key: data.to_vec(),
                    has_private: false,
                })
            }
        }
    }

    /// The full strong-name public key blob, header included.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Hex rendering of the full public key, as friend declarations embed it.
    #[must_use]
    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }

    /// `true` if the source blob contained the private half of the key pair.
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        self.has_private
    }

    /// Derive the 8-byte public-key-token.
    ///
    /// SHA-1 digest of the public key blob, reversed, truncated to 8 bytes.
    #[must_use]
    pub fn token(&self) -> [u8; 8] {
        let mut hasher = Sha1::new();
        Digest::update(&mut hasher, &self.public_key);
        let mut digest = hasher.finalize().to_vec();
        digest.reverse();

        let mut token = [0u8; 8];
        token.copy_from_slice(&digest[..8]);
        token
    }

    /// Hex rendering of the token, as it appears in canonical identity strings.
    #[must_use]
    pub fn token_hex(&self) -> String {
        hex::encode(self.token())
    }

    /// Extract the public half from a `PRIVATEKEYBLOB` key pair.
    fn from_private_blob(data: &[u8]) -> Result<Self> {
        let mut parser = Parser::new(data);

        let blob_type = parser.read_u8()?;
        let version = parser.read_u8()?;
        parser.read_u16()?; // reserved
        let key_alg = parser.read_u32()?;
        if blob_type != BLOB_TYPE_PRIVATE || version != BLOB_VERSION || key_alg != CALG_RSA_SIGN {
            return Err(malformed_error!(
                "Not an RSA signing key pair (type 0x{:02x}, alg 0x{:08x})",
                blob_type,
                key_alg
            ));
        }

        let magic = parser.read_u32()?;
        if magic != MAGIC_RSA2 {
            return Err(malformed_error!(
                "Key pair blob has wrong magic 0x{:08x}",
                magic
            ));
        }
        let bit_length = parser.read_u32()?;
        let public_exponent = parser.read_u32()?;
        if bit_length == 0 || bit_length % 8 != 0 {
            return Err(malformed_error!("Invalid RSA bit length {}", bit_length));
        }
        let modulus = parser.read_bytes(bit_length as usize / 8)?;

        // Rebuild the public-only blob: same header fields, RSA1 magic, modulus
        // only. The private primes that follow in the source blob are dropped.
        let mut blob = Vec::with_capacity(20 + modulus.len());
        blob.push(BLOB_TYPE_PUBLIC);
        blob.push(BLOB_VERSION);
        blob.extend_from_slice(&0u16.to_le_bytes());
        blob.extend_from_slice(&CALG_RSA_SIGN.to_le_bytes());
        blob.extend_from_slice(&MAGIC_RSA1.to_le_bytes());
        blob.extend_from_slice(&bit_length.to_le_bytes());
        blob.extend_from_slice(&public_exponent.to_le_bytes());
        blob.extend_from_slice(modulus);

        Ok(Self {
            public_key: Self::wrap_public_blob(&blob)?,
            has_private: true,
        })
    }

    /// Prepend the strong-name header to a bare CAPI public key blob.
    fn wrap_public_blob(blob: &[u8]) -> Result<Vec<u8>> {
        Self::validate_public_blob(blob)?;

        let mut wrapped = Vec::with_capacity(12 + blob.len());
        wrapped.extend_from_slice(&CALG_RSA_SIGN.to_le_bytes());
        wrapped.extend_from_slice(&CALG_SHA1.to_le_bytes());
        wrapped.extend_from_slice(&u32::try_from(blob.len()).unwrap_or(u32::MAX).to_le_bytes());
        wrapped.extend_from_slice(blob);
        Ok(wrapped)
    }

    fn validate_public_blob(blob: &[u8]) -> Result<()> {
        let mut parser = Parser::new(blob);

        let blob_type = parser.read_u8()?;
        let version = parser.read_u8()?;
        parser.read_u16()?; // reserved
        let key_alg = parser.read_u32()?;
        let magic = parser.read_u32()?;
        let bit_length = parser.read_u32()?;
        parser.read_u32()?; // public exponent

        if blob_type != BLOB_TYPE_PUBLIC
            || version != BLOB_VERSION
            || key_alg != CALG_RSA_SIGN
            || magic != MAGIC_RSA1
        {
            return Err(malformed_error!(
                "Not an RSA public key blob (type 0x{:02x}, magic 0x{:08x})",
                blob_type,
                magic
            ));
        }
        if bit_length % 8 != 0 || parser.remaining() != bit_length as usize / 8 {
            return Err(malformed_error!(
                "Public key blob modulus length mismatch ({} bits, {} bytes remaining)",
                bit_length,
                parser.remaining()
            ));
        }
        Ok(())
    }
}
