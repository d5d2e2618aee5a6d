pub mod code;
mod pairing;
mod protocol;
mod registry;
mod relay;
mod store;
mod supervisor;

pub use protocol::{ClientMessage, Role, ServerMessage};
pub use relay::{JoinOutcome, SignalingRelay};
pub use store::{RoomInfo, RoomStore};
