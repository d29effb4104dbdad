//! Conversational relay between the designated channel and the model.

mod channel;
mod chunker;
mod context;
mod cooldown;
mod handler;

pub use channel::{HistoryMessage, InboundMessage, RelayChannel, SerenityChannel};
pub use chunker::{MAX_MESSAGE_LEN, split_message};
pub use context::{CONTEXT_LIMIT, fetch_context};
pub use cooldown::{COOLDOWN, CooldownTracker, cooldown_notice};
pub use handler::Relay;
