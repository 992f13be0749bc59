use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Board shape does not match declared size")]
    InvalidBoardShape,
    #[error("Ascension level {0} is out of range")]
    InvalidAscension(u8),
}

pub type Result<T> = core::result::Result<T, GameError>;
