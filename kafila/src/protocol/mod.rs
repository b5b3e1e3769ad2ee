//! Wire protocol: frame extraction, message decoding and encoders

mod broadcast;
mod cursor;
mod frame;
mod message;
mod status;

pub use broadcast::{PeerBatch, PeerEntry, decode_batch, encode_batch};
pub use cursor::Cursor;
pub use frame::{Channel, FRAME_MARKER, Frame, FrameScanner, MAX_FRAMES_PER_PASS, MAX_PAYLOAD_LEN};
pub use message::{ControlCommand, FormationCommand, InboundMessage, TopologyCommand, decode};
pub use status::encode_status;
