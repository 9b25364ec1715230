use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("restart I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a restart file (bad magic)")]
    BadMagic,
    #[error("unsupported restart version {0}")]
    UnsupportedVersion(u32),
    #[error("restart mismatch: {0}")]
    Mismatch(String),
    #[error("restart payload error: {0}")]
    Payload(String),
    #[error(transparent)]
    Core(#[from] rtfem_core::CoreError),
}
