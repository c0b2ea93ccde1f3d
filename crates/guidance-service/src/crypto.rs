//! Password hashing for mentor and owner credentials.
//!
//! Hashing and verification both run on the blocking pool.

use crate::error::ApiError;

/// bcrypt hasher with a fixed cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher with the given bcrypt cost.
    #[must_use]
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext password.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` for an empty password, `ApiError::Internal` if
    /// hashing fails.
    pub async fn hash(&self, password: &str) -> Result<String, ApiError> {
        if password.is_empty() {
            return Err(ApiError::Validation("password is required".into()));
        }

        let cost = self.cost;
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// # Errors
    ///
    /// `ApiError::Internal` if the stored hash is malformed or the task fails.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))?
            .map_err(|e| ApiError::Internal(format!("password verification failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = PasswordHasher::new(4);
        let hash = hasher.hash("hunter2").await.unwrap();

        assert_ne!(hash, "hunter2");
        assert!(hasher.verify("hunter2", &hash).await.unwrap());
        assert!(!hasher.verify("hunter3", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn empty_password_is_rejected() {
        let hasher = PasswordHasher::new(4);
        assert!(matches!(
            hasher.hash("").await,
            Err(ApiError::Validation(_))
        ));
    }
}
