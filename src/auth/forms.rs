use secrecy::{ExposeSecret, SecretString};

use super::error::{AuthError, MIN_PASSWORD_LENGTH};

/// Credentials entered on the sign-in screen.
#[derive(Debug, Clone)]
pub struct SignInForm {
    pub email: String,
    pub password: SecretString,
}

impl SignInForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Both fields must be non-empty.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.email.trim().is_empty() || self.password.expose_secret().is_empty() {
            return Err(AuthError::MissingFields);
        }
        Ok(())
    }
}

/// Fields of the sign-up screen.
#[derive(Debug, Clone)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl SignUpForm {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: SecretString::from(password.into()),
            confirm_password: SecretString::from(confirm_password.into()),
        }
    }

    /// Checks, in order: every field filled in, passwords identical, password
    /// long enough. The first failing check is reported.
    pub fn validate(&self) -> Result<(), AuthError> {
        let password = self.password.expose_secret();
        let confirm = self.confirm_password.expose_secret();

        if self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || password.is_empty()
            || confirm.is_empty()
        {
            return Err(AuthError::MissingFields);
        }
        if password != confirm {
            return Err(AuthError::PasswordMismatch);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::PasswordTooShort);
        }
        Ok(())
    }
}
