use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::error::AuthError;
use super::forms::{SignInForm, SignUpForm};
use super::identity::{AuthUser, IdentityService, UserProfile};
use crate::storage::CredentialStore;

/// Credential-store key holding the signed-in user's uid.
pub const TOKEN_KEY: &str = "userToken";

/// The profile write at sign-up is best effort and bounded by this timeout.
pub const PROFILE_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Authentication state as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn { uid: String },
}

/// Which screen the app opens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Sign-in / sign-up flow
    Auth,
    /// Browse flow
    Home,
}

/// Signed-in session backed by a [`CredentialStore`].
///
/// The stored token is the source of truth across runs; the in-process
/// [`AuthState`] is broadcast to observers through a `watch` channel.
pub struct AuthSession<S> {
    store: S,
    identity: Option<Arc<dyn IdentityService>>,
    state: watch::Sender<AuthState>,
}

impl<S: CredentialStore> AuthSession<S> {
    /// Open a session over `store`, starting from whatever token it holds.
    pub async fn open(store: S) -> Result<Self, AuthError> {
        let initial = match store.get(TOKEN_KEY).await.map_err(storage_error)? {
            Some(uid) if !uid.is_empty() => AuthState::SignedIn { uid },
            _ => AuthState::SignedOut,
        };
        let (state, _) = watch::channel(initial);

        Ok(Self {
            store,
            identity: None,
            state,
        })
    }

    /// Attach the identity provider used by sign-in and sign-up.
    pub fn with_identity(mut self, identity: Arc<dyn IdentityService>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Subscribe to state changes. The receiver starts with the current state.
    pub fn observe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// `Home` when a token is stored, `Auth` otherwise.
    pub async fn initial_route(&self) -> Result<Route, AuthError> {
        let token = self.store.get(TOKEN_KEY).await.map_err(storage_error)?;
        Ok(match token {
            Some(uid) if !uid.is_empty() => Route::Home,
            _ => Route::Auth,
        })
    }

    pub async fn sign_in(&self, form: &SignInForm) -> Result<AuthUser, AuthError> {
        form.validate()?;
        let identity = self.identity()?;

        let user = identity.sign_in(form.email.trim(), &form.password).await?;
        tracing::info!(uid = %user.uid, "Signed in");

        self.persist(&user).await?;
        Ok(user)
    }

    /// Create an account, then store its profile.
    ///
    /// A failed or slow profile write (over [`PROFILE_WRITE_TIMEOUT`]) is
    /// logged and does not fail the sign-up.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<AuthUser, AuthError> {
        form.validate()?;
        let identity = self.identity()?;

        let email = form.email.trim();
        let user = identity.sign_up(email, &form.password).await?;
        tracing::info!(uid = %user.uid, "Account created");

        let profile = UserProfile {
            name: form.name.trim().to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        match tokio::time::timeout(PROFILE_WRITE_TIMEOUT, identity.store_profile(&user, &profile))
            .await
        {
            Ok(Ok(())) => tracing::debug!(uid = %user.uid, "Profile stored"),
            Ok(Err(e)) => tracing::warn!(uid = %user.uid, error = %e, "Profile write failed, continuing"),
            Err(_) => tracing::warn!(
                uid = %user.uid,
                timeout_secs = PROFILE_WRITE_TIMEOUT.as_secs(),
                "Profile write timed out, continuing"
            ),
        }

        self.persist(&user).await?;
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.store.remove(TOKEN_KEY).await.map_err(storage_error)?;
        self.state.send_replace(AuthState::SignedOut);
        tracing::info!("Signed out");
        Ok(())
    }

    fn identity(&self) -> Result<&Arc<dyn IdentityService>, AuthError> {
        self.identity.as_ref().ok_or(AuthError::NotConfigured)
    }

    async fn persist(&self, user: &AuthUser) -> Result<(), AuthError> {
        self.store
            .set(TOKEN_KEY, &user.uid)
            .await
            .map_err(storage_error)?;
        self.state.send_replace(AuthState::SignedIn {
            uid: user.uid.clone(),
        });
        Ok(())
    }
}

fn storage_error(e: anyhow::Error) -> AuthError {
    AuthError::Storage(e.to_string())
}
