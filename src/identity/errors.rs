use std::io::Error as IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("anonymous sign-in failed: {0}")]
    SignIn(#[from] IoError),

    #[error("stored identity is empty")]
    Empty,
}
