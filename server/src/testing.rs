//! In-memory transport for driving sessions without sockets.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;

#[derive(Default)]
struct Pipe {
    /// Each chunk is returned by exactly one `read`, like one segment arriving.
    incoming: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    closed: bool,
    read_error: Option<io::ErrorKind>,
    write_blocked: bool,
}

/// One end of a fake connection. Clones share the same pipe, so a test keeps a
/// handle after moving a clone into the server.
#[derive(Clone, Default)]
pub struct MockStream {
    pipe: Rc<RefCell<Pipe>>,
}

impl MockStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, bytes: &[u8]) {
        self.pipe.borrow_mut().incoming.push_back(bytes.to_vec());
    }

    /// Queues `bytes` one byte per read.
    pub fn push_bytewise(&self, bytes: &[u8]) {
        for &b in bytes {
            self.push(&[b]);
        }
    }

    pub fn close(&self) {
        self.pipe.borrow_mut().closed = true;
    }

    pub fn fail_reads(&self, kind: io::ErrorKind) {
        self.pipe.borrow_mut().read_error = Some(kind);
    }

    pub fn block_writes(&self, blocked: bool) {
        self.pipe.borrow_mut().write_blocked = blocked;
    }

    /// Drains everything the server has written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.pipe.borrow_mut().written)
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pipe = self.pipe.borrow_mut();
        if let Some(kind) = pipe.read_error {
            return Err(kind.into());
        }
        match pipe.incoming.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    chunk.drain(..n);
                    pipe.incoming.push_front(chunk);
                }
                Ok(n)
            }
            None if pipe.closed => Ok(0),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut pipe = self.pipe.borrow_mut();
        if pipe.write_blocked {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        pipe.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
