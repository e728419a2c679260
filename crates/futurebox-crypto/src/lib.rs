//! FutureBox Crypto Library
//!
//! Capsule content is sealed with AES-256-GCM under a key derived per owner
//! from one process-wide master secret. Anyone holding the master secret
//! can derive every owner's key; there is no rotation and no recipient key.
//!
//! Passwords are hashed with Argon2id at a configurable cost.

pub mod encrypt;
pub mod keys;
pub mod password;
pub mod sealer;

pub use keys::MasterSecret;
pub use password::PasswordPolicy;
pub use sealer::ContentSealer;
