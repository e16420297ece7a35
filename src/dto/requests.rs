//! Arguments of the mutating store operations, validated before touching the backend.

use validator::Validate;

/// Arguments of `create_account`.
#[derive(Debug, Clone, Validate)]
pub struct CreateAccountRequest {
    /// Case-sensitive login name.
    #[validate(length(min = 1, max = 64, message = "username must be 1 to 64 characters"))]
    pub username: String,
    /// Plaintext password; only its salted digest is stored.
    #[validate(length(min = 1, max = 256, message = "password must be 1 to 256 characters"))]
    pub password: String,
}

/// Arguments of `create_match`.
#[derive(Debug, Clone, Validate)]
pub struct CreateMatchRequest {
    /// Match title, also its primary key.
    #[validate(length(min = 1, max = 128, message = "match title must be 1 to 128 characters"))]
    pub title: String,
}

/// Arguments of `join_match`.
#[derive(Debug, Clone, Validate)]
pub struct JoinMatchRequest {
    /// Match title.
    #[validate(length(min = 1, max = 128, message = "match title must be 1 to 128 characters"))]
    pub title: String,
    /// Name added to the roster.
    #[validate(length(min = 1, max = 64, message = "player name must be 1 to 64 characters"))]
    pub player: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_fields() {
        let request = CreateAccountRequest {
            username: String::new(),
            password: "secret".into(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
    }

    #[test]
    fn length_counts_characters() {
        let request = JoinMatchRequest {
            title: "é".repeat(128),
            player: "alice".into(),
        };
        assert!(request.validate().is_ok());

        let request = CreateMatchRequest {
            title: "x".repeat(129),
        };
        assert!(request.validate().is_err());
    }
}
