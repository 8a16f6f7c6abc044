use jsonwebtoken::Algorithm;

/// JWT signing configuration.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: Vec<u8>,
    pub algorithm: Algorithm,
}

impl SecurityConfig {
    pub fn new(jwt_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            algorithm: Algorithm::HS256,
        }
    }

    /// Secret from the environment, or a random per-process secret so a dev
    /// server still starts (tokens then die with the process).
    pub fn from_env() -> Self {
        match std::env::var("APP_JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => Self::new(secret.into_bytes()),
            _ => {
                tracing::warn!("APP_JWT_SECRET not set; using a random per-process secret");
                let secret: [u8; 32] = rand::random();
                Self::new(secret.to_vec())
            }
        }
    }

    pub fn for_tests() -> Self {
        Self::new(b"test_secret_key_for_testing_purposes_only".to_vec())
    }
}
