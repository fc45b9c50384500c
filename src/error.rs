//! Error type for lifecycle misuse of the runtime.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BindingError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("update scheduler is already initialized")]
    AlreadyInitialized,

    #[error("update scheduler used before Scheduler::initialize")]
    NotInitialized,

    #[error("update for a live computed was run off its consumer thread")]
    OffConsumerThread,
}
