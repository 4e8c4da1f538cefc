use thiserror::Error;

/// Errors surfaced by sign-in, sign-up and session handling.
///
/// `Display` is meant for logs; [`AuthError::user_message`] is what the user
/// sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    // Identity provider rejections
    #[error("invalid credential")]
    InvalidCredential,
    #[error("user not found")]
    UserNotFound,
    #[error("user disabled")]
    UserDisabled,
    #[error("too many requests")]
    TooManyRequests,
    #[error("email already in use")]
    EmailInUse,
    #[error("weak password")]
    WeakPassword,
    #[error("invalid email")]
    InvalidEmail,

    // Form validation, checked before any request
    #[error("missing required fields")]
    MissingFields,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password too short")]
    PasswordTooShort,

    // Transport
    #[error("identity request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    /// Any other provider error, carrying the provider's message.
    #[error("identity service error: {0}")]
    Service(String),

    // Local setup
    #[error("no Firebase API key configured (set FIREBASE_API_KEY or firebase_api_key in config.toml)")]
    NotConfigured,
    #[error("insecure identity endpoint: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("failed to access the session store: {0}")]
    Storage(String),
}

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

impl AuthError {
    /// Map a Firebase Identity Toolkit error message onto the error vocabulary.
    ///
    /// Firebase reports codes such as `EMAIL_EXISTS` or
    /// `WEAK_PASSWORD : Password should be at least 6 characters`; only the
    /// leading code is significant.
    pub fn from_firebase_code(message: &str) -> Self {
        let code = message
            .split(':')
            .next()
            .unwrap_or_default()
            .trim();

        match code {
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" => AuthError::InvalidCredential,
            "EMAIL_NOT_FOUND" => AuthError::UserNotFound,
            "USER_DISABLED" => AuthError::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyRequests,
            "EMAIL_EXISTS" => AuthError::EmailInUse,
            "WEAK_PASSWORD" => AuthError::WeakPassword,
            "INVALID_EMAIL" => AuthError::InvalidEmail,
            "" => AuthError::Service("unknown error".to_string()),
            _ => AuthError::Service(message.trim().to_string()),
        }
    }

    /// Text shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredential => "Incorrect email or password".to_string(),
            AuthError::UserNotFound => "No account found with this email".to_string(),
            AuthError::UserDisabled => "This account has been disabled".to_string(),
            AuthError::TooManyRequests => "Too many attempts. Try again later".to_string(),
            AuthError::EmailInUse => "An account already exists with this email".to_string(),
            AuthError::WeakPassword => "This password is too weak".to_string(),
            AuthError::InvalidEmail => "This email address is not valid".to_string(),
            AuthError::MissingFields => "Please fill in all fields".to_string(),
            AuthError::PasswordMismatch => "Passwords do not match".to_string(),
            AuthError::PasswordTooShort => {
                format!("Password must be at least {MIN_PASSWORD_LENGTH} characters long")
            }
            AuthError::Timeout => "The server took too long to respond".to_string(),
            AuthError::Network(_) => "Unable to reach the server".to_string(),
            AuthError::Service(message) => message.clone(),
            AuthError::NotConfigured | AuthError::InsecureBaseUrl | AuthError::Storage(_) => {
                self.to_string()
            }
        }
    }

    /// True for errors detected locally, before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AuthError::MissingFields | AuthError::PasswordMismatch | AuthError::PasswordTooShort
        )
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AuthError::Timeout
        } else {
            AuthError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firebase_codes_mapped() {
        let cases = [
            ("INVALID_LOGIN_CREDENTIALS", AuthError::InvalidCredential),
            ("INVALID_PASSWORD", AuthError::InvalidCredential),
            ("EMAIL_NOT_FOUND", AuthError::UserNotFound),
            ("USER_DISABLED", AuthError::UserDisabled),
            ("TOO_MANY_ATTEMPTS_TRY_LATER", AuthError::TooManyRequests),
            ("EMAIL_EXISTS", AuthError::EmailInUse),
            (
                "WEAK_PASSWORD : Password should be at least 6 characters",
                AuthError::WeakPassword,
            ),
            ("INVALID_EMAIL", AuthError::InvalidEmail),
        ];
        for (code, expected) in cases {
            assert_eq!(AuthError::from_firebase_code(code), expected, "code {code}");
        }
    }

    #[test]
    fn test_unknown_code_keeps_provider_message() {
        let err = AuthError::from_firebase_code("OPERATION_NOT_ALLOWED");
        assert_eq!(err, AuthError::Service("OPERATION_NOT_ALLOWED".to_string()));
        assert_eq!(err.user_message(), "OPERATION_NOT_ALLOWED");
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AuthError::InvalidCredential.user_message(),
            "Incorrect email or password"
        );
        assert_eq!(
            AuthError::PasswordTooShort.user_message(),
            "Password must be at least 6 characters long"
        );
        assert!(AuthError::MissingFields.is_validation());
        assert!(!AuthError::Timeout.is_validation());
    }
}
