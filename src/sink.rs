//! Destinations for converted frames.

use std::io;

use crate::encoder::EncoderInvocation;

/// Destination for raw BGR24 frames.
///
/// The production sink is the encoder's stdin pipe. Writes block when the
/// consumer falls behind; that backpressure throttles the simulation loop.
pub trait FrameSink {
    /// Write one full frame and flush it.
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Close the input channel and wait for the consumer to finish.
    /// Calling `close` on an already-closed sink is a no-op.
    fn close(&mut self) -> io::Result<()>;
}

/// Starts a sink for an encoder invocation.
pub trait SinkLauncher {
    fn launch(&mut self, invocation: &EncoderInvocation) -> io::Result<Box<dyn FrameSink>>;
}
