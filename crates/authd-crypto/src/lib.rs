//! RSA-OAEP/SHA-512 secret transport.
//!
//! Each broker instance generates one RSA-2048 key pair at construction.
//! The private key never leaves this module; only its DER-encoded,
//! base64-encoded public key is exposed, via [`SecretBox::public_key_der_b64`].

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha512;

const RSA_KEY_BITS: usize = 2048;

// ---------------------------------------------------------------------------
// CryptoError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum CryptoError {
    KeyGen(String),
    Der(String),
    Base64Decode(String),
    Decrypt(String),
    Encrypt(String),
}

impl std::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CryptoError::KeyGen(msg) => write!(f, "RSA key generation failed: {msg}"),
            CryptoError::Der(msg) => write!(f, "DER encode/decode failed: {msg}"),
            CryptoError::Base64Decode(msg) => write!(f, "base64 decode failed: {msg}"),
            CryptoError::Decrypt(msg) => write!(f, "RSA-OAEP decrypt failed: {msg}"),
            CryptoError::Encrypt(msg) => write!(f, "RSA-OAEP encrypt failed: {msg}"),
        }
    }
}

impl std::error::Error for CryptoError {}

// ---------------------------------------------------------------------------
// SecretBox
// ---------------------------------------------------------------------------

/// Owns a broker's RSA-2048 key pair and performs the secret transport.
pub struct SecretBox {
    private_key: RsaPrivateKey,
    public_key_der_b64: String,
}

impl SecretBox {
    /// Generate a fresh RSA-2048 key pair. Never persisted or shared
    /// between broker instances.
    pub fn new() -> Result<Self, CryptoError> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
            .map_err(|e| CryptoError::KeyGen(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);
        let der = public_key
            .to_public_key_der()
            .map_err(|e| CryptoError::Der(e.to_string()))?;
        let public_key_der_b64 = STANDARD.encode(der.as_bytes());

        Ok(Self {
            private_key,
            public_key_der_b64,
        })
    }

    /// The DER-encoded (PKIX SubjectPublicKeyInfo), base64-encoded public
    /// key. This is the only thing that ever leaves the process.
    pub fn public_key_der_b64(&self) -> &str {
        &self.public_key_der_b64
    }

    /// Decrypt a base64(RSA-OAEP-SHA512(plaintext)) ciphertext as submitted
    /// in `authData.secret`.
    ///
    /// An empty string decrypts to the empty string and is not an error —
    /// there is no valid RSA block to decrypt, so this is short-circuited
    /// rather than attempted.
    pub fn decrypt_secret(&self, b64_ciphertext: &str) -> Result<String, CryptoError> {
        if b64_ciphertext.is_empty() {
            return Ok(String::new());
        }

        let ciphertext = STANDARD
            .decode(b64_ciphertext)
            .map_err(|e| CryptoError::Base64Decode(e.to_string()))?;

        let padding = Oaep::new::<Sha512>();
        let plaintext = self
            .private_key
            .decrypt(padding, &ciphertext)
            .map_err(|e| CryptoError::Decrypt(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::Decrypt(format!("decrypted plaintext is not utf-8: {e}")))
    }
}

/// Encrypt `plaintext` with a DER/base64-encoded RSA public key using the
/// same RSA-OAEP-SHA512 parameters the broker decrypts with. This is the
/// client-side half of the secret transport; it lives here (rather than in
/// a test-only module) because `authd-daemon`'s scenario tests and any real
/// client both need it to exercise the wire format.
pub fn encrypt_secret(pub_key_der_b64: &str, plaintext: &str) -> Result<String, CryptoError> {
    let der = STANDARD
        .decode(pub_key_der_b64)
        .map_err(|e| CryptoError::Base64Decode(e.to_string()))?;
    let public_key =
        RsaPublicKey::from_public_key_der(&der).map_err(|e| CryptoError::Der(e.to_string()))?;

    let mut rng = rand::thread_rng();
    let padding = Oaep::new::<Sha512>();
    let ciphertext = public_key
        .encrypt(&mut rng, padding, plaintext.as_bytes())
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

    Ok(STANDARD.encode(ciphertext))
}
