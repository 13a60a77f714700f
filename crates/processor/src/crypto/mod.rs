//! Local AES-256-GCM-SIV key-wrap provider.
//!
//! This module is intentionally free of AWS and HTTP dependencies.
//!
//! # Ciphertext format
//!
//! ```text
//! nonce(12) || ciphertext || tag(16)
//! ```

pub mod cipher;
pub mod keyring;

pub use cipher::KEY_LEN;
pub use keyring::{DekError, DekRing, AES_256_GCM_SIV};
