use anyhow::{Result, anyhow};
use hkdf::Hkdf;
use sha2::Sha256;
use uuid::Uuid;

/// Used only when no secret is configured. Anything sealed under it is
/// readable by anyone who has read this file.
pub const FALLBACK_SECRET: &str = "fallback-secret-for-dev";

const KDF_SALT: &[u8] = b"futurebox-content-v1";
const KDF_INFO_PREFIX: &[u8] = b"futurebox-capsule:";

/// The process-wide content secret.
#[derive(Clone)]
pub struct MasterSecret(Vec<u8>);

impl MasterSecret {
    pub fn new(secret: &str) -> Self {
        Self(secret.as_bytes().to_vec())
    }

    /// Build from configuration, falling back to [`FALLBACK_SECRET`] when
    /// nothing (or only whitespace) was supplied. Check [`Self::is_fallback`]
    /// to warn about it.
    pub fn from_config(configured: Option<&str>) -> Self {
        match configured.map(str::trim).filter(|s| !s.is_empty()) {
            Some(secret) => Self::new(secret),
            None => Self::new(FALLBACK_SECRET),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.0 == FALLBACK_SECRET.as_bytes()
    }

    /// HKDF-SHA256(secret, salt, info = prefix || owner_id) -> 32-byte key.
    pub fn derive_owner_key(&self, owner_id: Uuid) -> Result<[u8; 32]> {
        let hk = Hkdf::<Sha256>::new(Some(KDF_SALT), &self.0);

        let mut info = Vec::with_capacity(KDF_INFO_PREFIX.len() + 16);
        info.extend_from_slice(KDF_INFO_PREFIX);
        info.extend_from_slice(owner_id.as_bytes());

        let mut key = [0u8; 32];
        hk.expand(&info, &mut key)
            .map_err(|e| anyhow!("Key derivation failed: {}", e))?;
        Ok(key)
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterSecret(..)")
    }
}
