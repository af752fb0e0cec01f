pub mod computer;
pub mod peer;

pub use computer::{ComputerOpponent, COMPUTER_NAME};
pub use peer::{MockPeer, PeerContext, PeerEvent, PeerTransport, ScriptedPeer, PEER_NAME};
