//! slot_gate integration tests.

mod locks;
mod presence;

#[cfg(feature = "http")]
mod http;
