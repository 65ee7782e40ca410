use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("malformed snapshot timestamp '{0}'")]
    MalformedTimestamp(String),

    #[error("retention of {0} days reaches before the earliest representable date")]
    CutoffOutOfRange(u32),

    #[error("could not start lease-break workers: {0}")]
    WorkerPool(String),
}
