//! In-memory stand-ins for a server connection.
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    io::{self, Cursor, Read, Write},
    rc::Rc,
};

use super::{Connection, DELIMITER};

/// Replays a fixed byte sequence and records everything written to it.
pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    read_chunk: usize,
    written: Vec<u8>,
    write_chunk: usize,
    write_limit: Option<usize>,
    shutdowns: Rc<Cell<usize>>,
}

impl ScriptedStream {
    pub fn new(input: Vec<u8>) -> Self {
        Self {
            input: Cursor::new(input),
            read_chunk: usize::MAX,
            written: Vec::new(),
            write_chunk: usize::MAX,
            write_limit: None,
            shutdowns: Rc::new(Cell::new(0)),
        }
    }

    pub fn read_chunk(mut self, size: usize) -> Self {
        self.read_chunk = size;
        self
    }

    pub fn write_chunk(mut self, size: usize) -> Self {
        self.write_chunk = size;
        self
    }

    /// Accept this many bytes, then report zero-length writes.
    pub fn write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn shutdown_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.shutdowns)
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.read_chunk);
        self.input.read(&mut buf[..len])
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut len = buf.len().min(self.write_chunk);
        if let Some(limit) = self.write_limit {
            len = len.min(limit.saturating_sub(self.written.len()));
        }
        self.written.extend_from_slice(&buf[..len]);
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connection for ScriptedStream {
    fn shutdown(&mut self) -> io::Result<()> {
        self.shutdowns.set(self.shutdowns.get() + 1);
        Ok(())
    }
}

type Handler = Box<dyn FnMut(&str) -> String>;

/// A fake server answering each framed request through a handler closure.
///
/// Requests are recorded without their delimiter; replies are framed
/// automatically.
pub struct FakeServer {
    handler: Handler,
    pending: Vec<u8>,
    outgoing: VecDeque<u8>,
    read_chunk: usize,
    requests: Rc<RefCell<Vec<String>>>,
    shutdowns: Rc<Cell<usize>>,
}

impl FakeServer {
    pub fn new(handler: impl FnMut(&str) -> String + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            pending: Vec::new(),
            outgoing: VecDeque::new(),
            read_chunk: usize::MAX,
            requests: Rc::new(RefCell::new(Vec::new())),
            shutdowns: Rc::new(Cell::new(0)),
        }
    }

    /// Serves canned replies in order, whatever the request.
    pub fn replying(replies: Vec<String>) -> Self {
        let mut replies = VecDeque::from(replies);
        Self::new(move |_| replies.pop_front().unwrap_or_default())
    }

    pub fn read_chunk(mut self, size: usize) -> Self {
        self.read_chunk = size;
        self
    }

    pub fn requests(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.requests)
    }

    pub fn shutdown_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.shutdowns)
    }
}

impl Read for FakeServer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.read_chunk).min(self.outgoing.len());
        for (slot, byte) in buf.iter_mut().zip(self.outgoing.drain(..len)) {
            *slot = byte;
        }
        Ok(len)
    }
}

impl Write for FakeServer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);

        while let Some(end) = self.pending.iter().position(|b| *b == DELIMITER) {
            let frame: Vec<u8> = self.pending.drain(..=end).collect();
            let request = String::from_utf8_lossy(&frame[..end]).into_owned();

            let reply = (self.handler)(&request);
            self.requests.borrow_mut().push(request);
            self.outgoing.extend(reply.into_bytes());
            self.outgoing.push_back(DELIMITER);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connection for FakeServer {
    fn shutdown(&mut self) -> io::Result<()> {
        self.shutdowns.set(self.shutdowns.get() + 1);
        Ok(())
    }
}
