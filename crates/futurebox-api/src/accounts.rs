use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use futurebox_crypto::PasswordPolicy;
use futurebox_db::Database;

use crate::error::AppError;
use crate::identity::Identity;

const MIN_PASSWORD_CHARS: usize = 8;

/// Signup and login against the users table.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<Database>,
    passwords: PasswordPolicy,
    /// Checked against when the email is unknown, so both login failures
    /// cost one Argon2 run.
    decoy_hash: Arc<str>,
}

impl AccountService {
    pub fn new(db: Arc<Database>, passwords: PasswordPolicy) -> anyhow::Result<Self> {
        let decoy_hash = passwords.hash("futurebox-decoy-password")?.into();
        Ok(Self {
            db,
            passwords,
            decoy_hash,
        })
    }

    pub fn sign_up(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Identity, AppError> {
        let email = email.trim();
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }

        let password_hash = self.passwords.hash(password)?;
        let user_id = Uuid::new_v4();

        // The UNIQUE constraint decides; there is no separate existence check.
        if !self.db.create_user(user_id, email, &password_hash, now)? {
            return Err(AppError::DuplicateEmail);
        }

        info!(%user_id, "User registered");
        Ok(Identity {
            user_id,
            email: email.to_string(),
        })
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let Some(user) = self.db.get_user_by_email(email.trim())? else {
            self.passwords.verify(password, &self.decoy_hash)?;
            warn!("Login failed: unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !self.passwords.verify(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let user = user.into_user()?;
        Ok(Identity {
            user_id: user.id,
            email: user.email,
        })
    }
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::validation("Please enter a valid email address"))
    }
}
