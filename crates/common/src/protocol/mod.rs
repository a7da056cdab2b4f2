// Wire formats for the streamed AI transport.

pub mod envelope;
pub mod frame;
