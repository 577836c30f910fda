pub extern crate serde;
pub extern crate serde_json;

mod message;
mod session_store;
mod types;
mod undo;

pub use message::*;
pub use session_store::*;
pub use types::*;
pub use undo::*;
