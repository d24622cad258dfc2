//! Registry error types
//!
//! The registry operations themselves cannot fail. The only rejection happens
//! at the boundary, when a raw channel name is turned into a [`ChannelId`].
//!
//! [`ChannelId`]: super::ChannelId

use thiserror::Error;

/// Error returned when a channel name is malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Channel name is empty
    #[error("channel name is empty")]
    Empty,
    /// Channel name exceeds the length limit
    #[error("channel name is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },
    /// Channel name contains a forbidden character
    #[error("channel name contains invalid character {0:?}")]
    InvalidChar(char),
}
