//! Handler error types.
//!
//! Every request failure maps to the same wire reply (an empty NACK); the
//! variants exist so logs say what actually went wrong.

use thiserror::Error;

use crate::game::GameError;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not logged in")]
    NotLoggedIn,
    #[error("already logged in")]
    AlreadyLoggedIn,
    #[error("username already taken")]
    NameInUse,
    #[error("malformed payload")]
    BadPayload,
    #[error("unexpected packet type")]
    UnexpectedType,
    #[error("no such user logged in")]
    UnknownUser,
    #[error("cannot invite yourself")]
    SelfInvite,
    #[error("invitation table full")]
    TableFull,
    #[error("no invitation in that slot")]
    BadSlot,
    #[error("invitation in wrong state")]
    WrongState,
    #[error("operation from the wrong side")]
    WrongSide,
    #[error("connection gone")]
    SessionGone,
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Convenient Result type for handlers.
pub type HandlerResult = Result<(), HandlerError>;
