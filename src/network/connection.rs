//! Connection state machine
//!
//! Per-connection buffering and the request/response cycle.
//!
//! ```text
//!   REQ ──complete request──▶ RES ──buffer drained──▶ REQ
//!    │                         │
//!    EOF / framing error       write error
//!    ▼                         ▼
//!   END ◀──────────────────────┘
//! ```
//!
//! A connection owns fixed read and write buffers sized for one maximum
//! framed message. Requests pipelined into a single read are processed in
//! order, each response flushed as soon as it is built. The stream sits
//! behind a small trait so the same machine runs over real non-blocking
//! sockets and in-process test pipes.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use crate::engine::Engine;
use crate::protocol::{self, Response, HEADER_SIZE, MAX_MSG};

/// Buffer capacity: one frame header plus one maximum payload
pub const BUF_CAPACITY: usize = HEADER_SIZE + MAX_MSG;

/// Connection-level modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnMode {
    /// Draining input and parsing requests
    Req,
    /// Draining a pending response
    Res,
    /// Terminal; the event loop reaps the connection
    End,
}

/// Byte stream the state machine can drive without blocking
pub trait Stream {
    /// Read into `buf`; `Ok(0)` is EOF, `WouldBlock` means no data now
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write from `buf`; `WouldBlock` means the peer cannot take bytes now
    fn write_nonblocking(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl Stream for mio::net::TcpStream {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }

    fn write_nonblocking(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write(buf)
    }
}

/// Per-connection buffers and cursors.
///
/// Invariants: `read_pos <= read_len <= BUF_CAPACITY` and
/// `write_sent <= write_len <= BUF_CAPACITY`.
struct ConnState {
    mode: ConnMode,
    read_buf: [u8; BUF_CAPACITY],
    read_len: usize,
    read_pos: usize,
    write_buf: [u8; BUF_CAPACITY],
    write_len: usize,
    write_sent: usize,
}

impl ConnState {
    fn new() -> ConnState {
        ConnState {
            mode: ConnMode::Req,
            read_buf: [0u8; BUF_CAPACITY],
            read_len: 0,
            read_pos: 0,
            write_buf: [0u8; BUF_CAPACITY],
            write_len: 0,
            write_sent: 0,
        }
    }
}

/// One client connection: a stream plus its state machine
pub struct Connection<S: Stream> {
    stream: S,
    state: ConnState,
}

impl<S: Stream> Connection<S> {
    pub fn new(stream: S) -> Connection<S> {
        Connection {
            stream,
            state: ConnState::new(),
        }
    }

    pub fn mode(&self) -> ConnMode {
        self.state.mode
    }

    pub fn is_closed(&self) -> bool {
        self.state.mode == ConnMode::End
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Drive the state machine as far as readiness allows.
    ///
    /// Called once per readiness event; returns with the connection parked
    /// in Req (awaiting input), Res (awaiting writability) or End.
    pub fn drive(&mut self, engine: &mut Engine) {
        loop {
            let progressed = match self.state.mode {
                ConnMode::Req => self.fill_read_buffer(engine),
                ConnMode::Res => self.flush_write_buffer(),
                ConnMode::End => false,
            };
            if !progressed {
                break;
            }
        }
    }

    /// REQ step: pull bytes and process every complete framed request.
    ///
    /// Returns true only when the read stopped on a full buffer and requests
    /// were consumed, meaning the socket may still hold data worth another
    /// pass.
    fn fill_read_buffer(&mut self, engine: &mut Engine) -> bool {
        self.compact();
        let mut socket_drained = false;
        loop {
            if self.state.read_len == BUF_CAPACITY {
                break;
            }
            match self
                .stream
                .read_nonblocking(&mut self.state.read_buf[self.state.read_len..])
            {
                Ok(0) => {
                    self.state.mode = ConnMode::End;
                    return false;
                }
                Ok(n) => self.state.read_len += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    socket_drained = true;
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    tracing::debug!("read failed: {}", err);
                    self.state.mode = ConnMode::End;
                    return false;
                }
            }
        }

        let mut processed = false;
        while self.state.mode == ConnMode::Req && self.process_one_request(engine) {
            processed = true;
        }
        self.state.mode == ConnMode::Req && processed && !socket_drained
    }

    /// Parse and execute one framed request if a complete one is buffered.
    ///
    /// Returns whether a message was consumed. An oversized declared length
    /// is a protocol error that ends the connection without a reply.
    fn process_one_request(&mut self, engine: &mut Engine) -> bool {
        let pending = &self.state.read_buf[self.state.read_pos..self.state.read_len];
        if pending.len() < HEADER_SIZE {
            return false;
        }
        let declared =
            u32::from_le_bytes([pending[0], pending[1], pending[2], pending[3]]) as usize;
        if declared > MAX_MSG {
            tracing::debug!("oversized frame of {} bytes, closing", declared);
            self.state.mode = ConnMode::End;
            return false;
        }
        if pending.len() < HEADER_SIZE + declared {
            return false;
        }

        let payload = &pending[HEADER_SIZE..HEADER_SIZE + declared];
        let response = match protocol::decode_request(payload) {
            Ok(request) => engine.execute(request),
            // malformed body of a recognized command; connection stays open
            Err(_) => Response::invalid_request(),
        };

        self.state.read_pos += HEADER_SIZE + declared;
        self.enqueue_response(&response);
        self.state.mode = ConnMode::Res;
        self.flush_write_buffer();
        true
    }

    /// Frame a response into the write buffer, downgrading one that does
    /// not fit to a short failure reply
    fn enqueue_response(&mut self, response: &Response) {
        let len = match protocol::encode_response_framed(&mut self.state.write_buf, response) {
            Ok(len) => len,
            Err(_) => {
                match protocol::encode_response_framed(
                    &mut self.state.write_buf,
                    &Response::too_large(),
                ) {
                    Ok(len) => len,
                    Err(_) => 0,
                }
            }
        };
        self.state.write_len = len;
        self.state.write_sent = 0;
    }

    /// RES step: push pending bytes.
    ///
    /// Returns true when the buffer drained and the connection flipped back
    /// to Req for the next request.
    fn flush_write_buffer(&mut self) -> bool {
        while self.state.write_sent < self.state.write_len {
            let pending = &self.state.write_buf[self.state.write_sent..self.state.write_len];
            match self.stream.write_nonblocking(pending) {
                Ok(0) => {
                    self.state.mode = ConnMode::End;
                    return false;
                }
                Ok(n) => self.state.write_sent += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return false,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    tracing::debug!("write failed: {}", err);
                    self.state.mode = ConnMode::End;
                    return false;
                }
            }
        }
        self.state.write_len = 0;
        self.state.write_sent = 0;
        self.state.mode = ConnMode::Req;
        true
    }

    /// Shift unread bytes to the front so the tail is free for reads
    fn compact(&mut self) {
        debug_assert!(self.state.read_pos <= self.state.read_len);
        if self.state.read_pos == 0 {
            return;
        }
        self.state
            .read_buf
            .copy_within(self.state.read_pos..self.state.read_len, 0);
        self.state.read_len -= self.state.read_pos;
        self.state.read_pos = 0;
    }
}

// =============================================================================
// In-process test pipe
// =============================================================================

/// Stream backed by byte queues, for driving the state machine without a
/// socket. Reads drain `input`; writes append to `output`, at most
/// `write_limit` bytes per call to exercise partial flushes.
pub struct PipeStream {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
    /// When set, reads past the queued input report EOF instead of WouldBlock
    pub eof: bool,
    pub write_limit: usize,
}

impl PipeStream {
    pub fn new() -> PipeStream {
        PipeStream {
            input: VecDeque::new(),
            output: Vec::new(),
            eof: false,
            write_limit: usize::MAX,
        }
    }

    /// Queue bytes for the connection to read
    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }
}

impl Default for PipeStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Stream for PipeStream {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.input.is_empty() {
            if self.eof {
                return Ok(0);
            }
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let mut n = 0;
        while n < buf.len() {
            match self.input.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn write_nonblocking(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.write_limit);
        if n == 0 && !buf.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        self.output.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}
