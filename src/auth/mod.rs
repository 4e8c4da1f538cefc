//! Email/password accounts.
//!
//! Forms are validated locally first, then sent to the identity provider
//! ([`FirebaseIdentity`] in production). A successful sign-in or sign-up
//! stores the user's uid under [`TOKEN_KEY`] in a [`CredentialStore`], which
//! decides the [`Route`] the app opens on next time.
//!
//! [`CredentialStore`]: crate::storage::CredentialStore

mod error;
mod forms;
mod identity;
mod session;

pub use error::{AuthError, MIN_PASSWORD_LENGTH};
pub use forms::{SignInForm, SignUpForm};
pub use identity::{
    AuthUser, FirebaseIdentity, FirebaseSettings, IdentityService, UserProfile,
    DEFAULT_FIRESTORE_BASE_URL, DEFAULT_IDENTITY_BASE_URL,
};
pub use session::{AuthSession, AuthState, Route, PROFILE_WRITE_TIMEOUT, TOKEN_KEY};
