// redline-common: shared types and wire formats for the redline workspace

pub mod crdt;
pub mod protocol;
pub mod types;
