use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use uuid::Uuid;

use crate::encrypt::{open_bytes, seal_bytes};
use crate::keys::MasterSecret;

/// String-in, string-out sealing of capsule content for storage.
///
/// The stored form is base64(nonce || ciphertext || tag), sealed under the
/// owner's derived key. Unsealing must happen only on the owner's open path.
#[derive(Debug, Clone)]
pub struct ContentSealer {
    secret: MasterSecret,
}

impl ContentSealer {
    pub fn new(secret: MasterSecret) -> Self {
        Self { secret }
    }

    pub fn seal(&self, owner_id: Uuid, plaintext: &str) -> Result<String> {
        let mut key = self.secret.derive_owner_key(owner_id)?;
        let sealed = seal_bytes(&key, plaintext.as_bytes());
        key.fill(0);
        Ok(BASE64.encode(sealed?))
    }

    pub fn unseal(&self, owner_id: Uuid, stored: &str) -> Result<String> {
        let sealed = BASE64.decode(stored).context("Stored content is not valid base64")?;

        let mut key = self.secret.derive_owner_key(owner_id)?;
        let plaintext = open_bytes(&key, &sealed);
        key.fill(0);

        String::from_utf8(plaintext?).context("Unsealed content is not UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealer() -> ContentSealer {
        ContentSealer::new(MasterSecret::new("test-secret"))
    }

    #[test]
    fn roundtrip_preserves_text() {
        let sealer = sealer();
        let owner = Uuid::new_v4();

        for text in ["", "hello", "line one\nline two\n\n  indented", "미래의 나에게 ✉️"] {
            let stored = sealer.seal(owner, text).unwrap();
            assert_eq!(sealer.unseal(owner, &stored).unwrap(), text);
        }
    }

    #[test]
    fn stored_form_does_not_contain_plaintext() {
        let stored = sealer().seal(Uuid::new_v4(), "meet me at the old oak").unwrap();
        assert!(!stored.contains("oak"));
    }

    #[test]
    fn other_owner_cannot_unseal() {
        let sealer = sealer();
        let stored = sealer.seal(Uuid::new_v4(), "mine").unwrap();
        assert!(sealer.unseal(Uuid::new_v4(), &stored).is_err());
    }

    #[test]
    fn different_master_secret_cannot_unseal() {
        let owner = Uuid::new_v4();
        let stored = sealer().seal(owner, "mine").unwrap();
        let other = ContentSealer::new(MasterSecret::new("another-secret"));
        assert!(other.unseal(owner, &stored).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let sealer = sealer();
        let owner = Uuid::new_v4();
        assert!(sealer.unseal(owner, "not base64 !!").is_err());
        assert!(sealer.unseal(owner, "AAAA").is_err());
    }
}
