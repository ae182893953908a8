//! Poll operation errors

use crate::messages::MessageId;
use crate::transport::TransportError;

/// Result type for poll operations
pub type PollResult<T> = Result<T, PollError>;

/// Errors returned by poll operations.
///
/// Cache merges never fail; these arise from referencing something that does
/// not exist, or from the transport.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PollError {
    #[error("Answer index {index} out of range for a poll with {answers} answers")]
    IndexOutOfRange { index: usize, answers: usize },

    #[error("Message {0} not found")]
    MessageNotFound(MessageId),

    #[error("Message {0} does not contain a poll")]
    NoPoll(MessageId),

    #[error("Message {0} was abandoned before it was sent")]
    SendAborted(MessageId),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
