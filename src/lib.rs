
// Configuration for a connection to one instrument, loadable from JSON
pub mod config;

// Errors shared by the session and the device drivers
pub mod error;

// A plain TCP socket carrying CRLF-terminated ASCII commands and text replies
pub mod session;

// Instrument drivers built on top of a session
pub mod devices;

pub use config::{ReadMode, SessionConfig};
pub use devices::tsl::{SweepMode, SweepSettings, TSL};
pub use error::{TslError, TslResult};
pub use session::{Session, SessionEvent};
