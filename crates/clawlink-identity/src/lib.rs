//! Device identity for the clawlink gateway handshake.
//!
//! A device owns one long-lived Ed25519 keypair. Its id is the hex SHA-256
//! of the raw public key, and the gateway challenge is answered with a
//! signature over a canonical payload built by the caller.

pub mod device;
pub mod error;
pub mod store;

pub use device::{derive_device_id, DeviceIdentity, IDENTITY_KEY};
pub use error::{IdentityError, Result, StoreError};
pub use store::{FileKeyStore, KeyValueStore, MemoryKeyStore};
