use async_session::async_trait;
use axum_login::{AuthUser, AuthnBackend, UserId};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::convert::Infallible;

/// The only principal: whoever knows the shared admin password.
pub const ADMIN_ID: i32 = 1;

#[derive(Clone)]
pub struct AdminUser {
    id: i32,
    auth_hash: Vec<u8>,
}

// Keep the session hash out of logs.
impl std::fmt::Debug for AdminUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminUser").field("id", &self.id).finish()
    }
}

impl AuthUser for AdminUser {
    type Id = i32;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        &self.auth_hash
    }
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Backend {
    password_digest: Vec<u8>,
    admin: AdminUser,
}

impl Backend {
    /// The session hash mixes in the session secret, so rotating either the
    /// secret or the password signs every admin out.
    pub fn new(admin_password: &str, secret_key: &str) -> Self {
        let password_digest = Sha256::digest(admin_password.as_bytes()).to_vec();

        let mut hasher = Sha256::new();
        hasher.update(secret_key.as_bytes());
        hasher.update([0u8]);
        hasher.update(admin_password.as_bytes());
        let auth_hash = hasher.finalize().to_vec();

        Self {
            password_digest,
            admin: AdminUser {
                id: ADMIN_ID,
                auth_hash,
            },
        }
    }
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = AdminUser;
    type Credentials = Credentials;
    type Error = Infallible;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let digest = Sha256::digest(creds.password.as_bytes());
        if digest.as_slice() == self.password_digest.as_slice() {
            Ok(Some(self.admin.clone()))
        } else {
            Ok(None)
        }
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        Ok((*user_id == ADMIN_ID).then(|| self.admin.clone()))
    }
}

pub type AuthSession = axum_login::AuthSession<Backend>;
