use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use futurebox_types::api::Claims;

use crate::identity::Identity;

/// Issues and checks the bearer tokens that stand in for a session store.
/// Tokens are stateless; logging out means the client drops its token.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn issue(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String> {
        let expires = now
            .checked_add_signed(self.lifetime)
            .context("Session expiry is out of range")?;
        let claims = Claims {
            sub: identity.user_id,
            email: identity.email.clone(),
            exp: usize::try_from(expires.timestamp())?,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Identity> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(Identity {
            user_id: data.claims.sub,
            email: data.claims.email,
        })
    }
}
