//! `universe_pipe` — the line-delimited JSON command protocol over the
//! engine: request parsing, dispatch, and observation assembly.

mod observe;
mod protocol;
mod session;

pub use protocol::{
    InjectSpec, ProtocolError, Request, ScheduleSpec, MAX_REQUEST_BYTES, MAX_RESPONSE_BYTES,
};
pub use session::Session;
