//! tank-services: the tank resource, per-tank leasing, the command
//! interpreter, and the client half of the session handshake.

pub mod client;
pub mod command;
pub mod parcel;
pub mod registry;
pub mod session;
pub mod tank;

pub use command::{CommandTable, Outcome};
pub use registry::{TankLease, TankRegistry};
pub use session::{new_session_table, AdmissionError, SessionGuard, SessionTable};
pub use tank::{PumpState, Tank, TankError, WorkingState};
