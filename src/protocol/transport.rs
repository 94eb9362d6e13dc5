use std::{
    io::{self, ErrorKind, Read, Write},
    net::{Shutdown, TcpStream},
};

use log::{debug, trace};
use thiserror::Error;

use crate::config::ClientConfig;

/// Byte terminating every request and reply on the wire.
pub const DELIMITER: u8 = 0x04;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("socket connection broken")]
    Broken,
    #[error("connection closed by peer before end of message")]
    Closed,
    #[error("reply exceeds maximum frame size of {limit} bytes")]
    FrameTooLarge { limit: usize },
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
}

/// A bidirectional byte stream the transport can own and shut down.
pub trait Connection: Read + Write {
    /// Half-closes both directions ahead of the stream being dropped.
    fn shutdown(&mut self) -> io::Result<()>;
}

impl Connection for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Delimiter-framed message exchange over one exclusively owned stream.
///
/// The stream is shut down exactly once, either through [`close`](Self::close)
/// or when the transport is dropped.
pub struct FramedTransport<C: Connection> {
    stream: C,
    buffer_size: usize,
    max_frame_size: Option<usize>,
    closed: bool,
}

impl FramedTransport<TcpStream> {
    pub fn open(config: &ClientConfig) -> Result<Self, TransportError> {
        let address = config.address();
        let stream = TcpStream::connect(&address)
            .map_err(|source| TransportError::Connect { address, source })?;
        debug!("connected to {}", config.address());

        Ok(Self::with_limits(
            stream,
            config.buffer_size,
            config.max_frame_size,
        ))
    }
}

impl<C: Connection> FramedTransport<C> {
    pub fn with_limits(stream: C, buffer_size: usize, max_frame_size: Option<usize>) -> Self {
        Self {
            stream,
            buffer_size: buffer_size.max(1),
            max_frame_size,
            closed: false,
        }
    }

    /// Writes the whole payload, retrying partial writes.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let mut sent = 0;
        while sent < payload.len() {
            match self.stream.write(&payload[sent..]) {
                Ok(0) => return Err(TransportError::Broken),
                Ok(n) => sent += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.stream.flush()?;
        trace!("sent {sent} bytes");
        Ok(())
    }

    /// Reads until the accumulated bytes end with `delimiter` and returns them
    /// with the trailing delimiter removed.
    pub fn receive(&mut self, delimiter: u8) -> Result<Vec<u8>, TransportError> {
        let mut message = Vec::new();
        let mut chunk = vec![0; self.buffer_size];

        while message.last() != Some(&delimiter) {
            let n = match self.stream.read(&mut chunk) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            message.extend_from_slice(&chunk[..n]);

            if let Some(limit) = self.max_frame_size {
                if message.len() > limit.saturating_add(1) {
                    return Err(TransportError::FrameTooLarge { limit });
                }
            }
        }

        while message.last() == Some(&delimiter) {
            message.pop();
        }
        trace!("received {} bytes", message.len());
        Ok(message)
    }

    /// Shuts the connection down, reporting any failure to do so.
    pub fn close(mut self) -> Result<(), TransportError> {
        self.closed = true;
        self.stream.shutdown()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn stream(&self) -> &C {
        &self.stream
    }
}

impl<C: Connection> Drop for FramedTransport<C> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.shutdown() {
            debug!("shutdown on drop failed: {e}");
        }
    }
}
