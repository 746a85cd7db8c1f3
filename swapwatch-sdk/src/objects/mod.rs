//! Wire-level object definitions shared by the server and its clients.

pub mod address;
pub mod room;
pub mod swap;
pub mod webhook;
pub mod ws;

pub use address::{Address, AddressError};
pub use swap::SwapEvent;
