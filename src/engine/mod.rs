//! The interactive engine channel: process lifecycle, line reassembly and
//! filtering of the engine's output stream, and event delivery to the
//! registered consumer.

mod events;
mod filter;
mod session;
mod state;

pub use events::{EngineError, EngineEvent};
pub use filter::{FilteredLine, LineFilter};
pub use session::{EngineCommand, EngineSession, SessionOptions};
pub use state::SessionState;
