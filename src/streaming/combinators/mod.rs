//! Streams built from more than one upstream, or shared between consumers.

pub mod adder;
pub mod fork;

pub use adder::Adder;
pub use fork::{Fork, ForkCursor};
