use super::env_parse;
use anyhow::Result;
use std::env;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds. There are no refresh tokens; clients log in again.
    pub access_token_expiry: u64,
}

impl JwtConfig {
    pub fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable must be set"))?;
        Self::new(secret, env_parse("JWT_ACCESS_EXPIRATION", 86_400))
    }

    pub fn new(secret: String, access_token_expiry: u64) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} characters", MIN_SECRET_LEN);
        }
        if access_token_expiry == 0 {
            anyhow::bail!("JWT_ACCESS_EXPIRATION must be positive");
        }
        Ok(Self {
            secret,
            access_token_expiry,
        })
    }
}
