//! Meeting-join session: state machine, live capture, shared status.

mod capture;
mod machine;
mod status;

pub use capture::capture_until_deadline;
pub use machine::{
    JoinOutcome, JoinRequest, JoinStatus, SessionConfig, SessionError, SessionMachine,
};
pub use status::{JoinPhase, SessionRegistry, SessionState, SessionStatusHandle};
