use std::fmt;

use errno::Errno;

pub type Result<T> = std::result::Result<T, MappingError>;

/// Any error thrown while mapping memory.
#[derive(Debug, Clone)]
pub enum MappingError {
    Internal(Errno),
}

impl From<Errno> for MappingError {
    fn from(e: Errno) -> Self {
        MappingError::Internal(e)
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MappingError::Internal(e) => write!(f, "could not map memory: {}", e),
        }
    }
}

impl std::error::Error for MappingError {}
