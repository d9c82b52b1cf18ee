use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("user not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Kv(#[from] deskpet_core::error::PetError),
}

pub type Result<T> = std::result::Result<T, ProfileError>;
