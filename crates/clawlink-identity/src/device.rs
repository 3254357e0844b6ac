//! Ed25519 device identity.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{IdentityError, Result};
use crate::store::KeyValueStore;

/// Store key the identity record is persisted under.
pub const IDENTITY_KEY: &str = "device-identity";

/// Current on-disk record version.
const RECORD_VERSION: u32 = 1;

/// Length of an Ed25519 public key and of its private seed.
const KEY_LEN: usize = 32;

/// On-disk form of the identity. All three fields are written as one value
/// so they can never be persisted out of step with each other.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
struct StoredIdentity {
    version: u32,
    device_id: String,
    public_key: String,
    private_key: String,
}

/// A device's long-lived signing identity.
///
/// The private seed never leaves this type; only the public key, the derived
/// device id and signatures are exported.
#[derive(Clone)]
pub struct DeviceIdentity {
    device_id: String,
    signing_key: SigningKey,
}

impl DeviceIdentity {
    /// Load the persisted identity from `store`, or generate and persist a new
    /// one if none exists or the stored record fails validation.
    pub fn ensure(store: &dyn KeyValueStore) -> Result<Self> {
        match store.load(IDENTITY_KEY)? {
            Some(bytes) => {
                let bytes = Zeroizing::new(bytes);
                match Self::from_record(&bytes) {
                    Ok(identity) => {
                        debug!(device_id = identity.short_id(), "loaded device identity");
                        return Ok(identity);
                    }
                    Err(reason) => {
                        warn!(%reason, "persisted device identity is invalid, regenerating");
                    }
                }
            }
            None => debug!("no persisted device identity"),
        }

        let identity = Self::generate()?;
        identity.persist(store)?;
        info!(device_id = identity.short_id(), "generated device identity");
        Ok(identity)
    }

    /// Generate a fresh identity from system randomness. Not persisted.
    pub fn generate() -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; KEY_LEN]);
        OsRng
            .try_fill_bytes(&mut seed[..])
            .map_err(|e| IdentityError::Randomness(e.to_string()))?;
        Ok(Self::from_seed(&seed))
    }

    /// Build the identity for a known 32-byte private seed.
    pub fn from_seed(seed: &[u8; KEY_LEN]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let device_id = derive_device_id(signing_key.verifying_key().as_bytes());
        Self {
            device_id,
            signing_key,
        }
    }

    /// Hex SHA-256 of the raw public key.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// First 16 characters of the device id, for log lines.
    pub fn short_id(&self) -> &str {
        &self.device_id[..16]
    }

    /// The public half of the keypair.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Raw public key bytes.
    pub fn public_key_bytes(&self) -> [u8; KEY_LEN] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Public key as unpadded URL-safe base64.
    pub fn public_key_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.public_key_bytes())
    }

    /// Sign exactly `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Sign exactly `message` and encode the signature as unpadded URL-safe base64.
    pub fn sign_base64url(&self, message: &[u8]) -> String {
        URL_SAFE_NO_PAD.encode(self.sign(message).to_bytes())
    }

    fn persist(&self, store: &dyn KeyValueStore) -> Result<()> {
        let record = StoredIdentity {
            version: RECORD_VERSION,
            device_id: self.device_id.clone(),
            public_key: self.public_key_base64url(),
            private_key: URL_SAFE_NO_PAD.encode(self.signing_key.to_bytes()),
        };
        let json = Zeroizing::new(serde_json::to_vec(&record)?);
        store.save(IDENTITY_KEY, &json)?;
        Ok(())
    }

    fn from_record(bytes: &[u8]) -> std::result::Result<Self, String> {
        let record: StoredIdentity =
            serde_json::from_slice(bytes).map_err(|e| format!("unreadable record: {e}"))?;
        if record.version != RECORD_VERSION {
            return Err(format!("unsupported record version {}", record.version));
        }

        let seed = Zeroizing::new(decode_key(&record.private_key, "private key")?);
        let public = decode_key(&record.public_key, "public key")?;

        let identity = Self::from_seed(&seed);
        if identity.public_key_bytes() != public {
            return Err("public key does not match private key".to_string());
        }
        if identity.device_id != record.device_id {
            return Err("device id does not match public key".to_string());
        }
        Ok(identity)
    }
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("device_id", &self.device_id)
            .field("public_key", &self.public_key_base64url())
            .finish_non_exhaustive()
    }
}

/// Derive the device id for a raw public key: lowercase hex SHA-256.
pub fn derive_device_id(public_key: &[u8]) -> String {
    hex::encode(Sha256::digest(public_key))
}

fn decode_key(encoded: &str, what: &str) -> std::result::Result<[u8; KEY_LEN], String> {
    let raw = Zeroizing::new(
        URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| format!("{what} is not base64url: {e}"))?,
    );
    <[u8; KEY_LEN]>::try_from(raw.as_slice())
        .map_err(|_| format!("{what} has length {}, expected {KEY_LEN}", raw.len()))
}
