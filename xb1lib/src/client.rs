use std::io::{Read, Write};
use std::time::Duration;

use crate::protocol;
use crate::protocol::messages::{
    Address, AtCommand, AtQueueParameter, RemoteAtCommand, Response, Transmit,
};
use crate::protocol::parse::{self, ParseFrameError, RecvBuffer};
use crate::protocol::serialize::{write_frame, MessageSerialize, SerializerWrap};

/// Silent period enforced before and after the `+++` escape sequence.
pub const GUARD_TIME: Duration = Duration::from_secs(1);

/// Default receive ring capacity. Must hold the largest raw frame
/// expected on the wire, escapes included.
pub const DEFAULT_RECV_CAPACITY: usize = protocol::MAX_FRAME_SIZE;

/// Consecutive empty reads tolerated while waiting for expected bytes.
const IDLE_READ_LIMIT: usize = 8;

/// A read that treats "nothing available yet" as zero bytes rather
/// than failure, matching how serial ports signal an empty line.
fn read_available<R>(port: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: Read,
{
    use std::io::ErrorKind;

    if buf.is_empty() {
        return Ok(0);
    }

    match port.read(buf) {
        Ok(n) => Ok(n),
        Err(e) => match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted => Ok(0),
            _ => Err(e),
        },
    }
}

/// Fill `buf` completely, tolerating short reads. Returns false if the
/// line stays idle too long.
fn read_exactly<R>(port: &mut R, buf: &mut [u8]) -> std::io::Result<bool>
where
    R: Read,
{
    let mut got = 0;
    let mut idle = 0;
    while got < buf.len() {
        let n = read_available(port, &mut buf[got..])?;
        got += n;
        if n == 0 {
            idle += 1;
            if idle >= IDLE_READ_LIMIT {
                return Ok(false);
            }
        } else {
            idle = 0;
        }
    }
    Ok(true)
}

/// Fixed-capacity circular buffer of raw wire bytes.
///
/// Storage is supplied by the caller, so the capacity (and whether the
/// bytes live on the stack, in a static, or on the heap) is the
/// caller's choice. Logical byte `i` lives at physical offset
/// `(head + i) mod capacity`.
pub struct RingBuffer<B> {
    storage: B,
    head: usize,
    len: usize,
}

impl<B> RingBuffer<B>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    pub fn new(storage: B) -> Self {
        Self {
            storage,
            head: 0,
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Refill from the port in up to two reads: tail to the end of
    /// storage first, then the freed space before the head if the
    /// first read came back complete.
    ///
    /// Returns the number of bytes added. An idle line adds nothing
    /// and is not an error.
    pub fn fill<R>(&mut self, port: &mut R) -> std::io::Result<usize>
    where
        R: Read,
    {
        let cap = self.storage.as_ref().len();
        if self.len == cap {
            return Ok(0);
        }

        let tail = self.head + self.len;
        let (start, end) = if tail < cap {
            (tail, cap)
        } else {
            (tail - cap, self.head)
        };

        let n = read_available(port, &mut self.storage.as_mut()[start..end])?;
        self.len += n;
        let mut total = n;

        // the first read stopped at the physical end of storage with
        // room still free before the head, go around
        if n == end - start && end != self.head && self.len < cap {
            let head = self.head;
            let n = read_available(port, &mut self.storage.as_mut()[0..head])?;
            self.len += n;
            total += n;
        }

        Ok(total)
    }
}

impl<B> RecvBuffer for RingBuffer<B>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.storage.as_ref().len()
    }

    fn get(&self, i: usize) -> u8 {
        debug_assert!(i < self.len);

        let mut idx = self.head + i;
        let cap = self.storage.as_ref().len();
        if idx >= cap {
            idx -= cap;
        }
        self.storage.as_ref()[idx]
    }

    fn skip(&mut self, n: usize) {
        debug_assert!(n <= self.len);

        let cap = self.storage.as_ref().len();
        self.head += n;
        if self.head >= cap {
            self.head -= cap;
        }
        self.len -= n;
    }
}

/// Error from a send or receive operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseFrameError),
}

/// Error from the configuration handshake at open.
///
/// Each variant identifies the handshake step that failed, so a wiring
/// or baud-rate problem can be told apart from a module that rejected
/// the configuration.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseFrameError),
    #[error("module did not acknowledge command mode (got {got:?})")]
    NoCommandModeAck { got: [u8; 3] },
    #[error("no acknowledgement for configuration command {index}")]
    MissingConfigAck { index: usize },
    #[error("bad acknowledgement for configuration command {index} (got {got:?})")]
    BadConfigAck { index: usize, got: [u8; 3] },
    #[error("no response to the AT {} query", .at_command.escape_ascii())]
    MissingAtResponse { at_command: [u8; 2] },
    #[error("unexpected response to the AT {} query", .at_command.escape_ascii())]
    UnexpectedAtResponse { at_command: [u8; 2] },
    #[error("AT {} readback does not match the configured value", .at_command.escape_ascii())]
    BadParameterValue { at_command: [u8; 2] },
}

/// A blocking driver handle for one XBee module.
///
/// The handle owns the serial port and the receive ring for its whole
/// lifetime and is not synchronized; a single task must own it.
pub struct Client<F, B = [u8; DEFAULT_RECV_CAPACITY]> {
    port: F,
    ring: RingBuffer<B>,
}

impl<F> Client<F> {
    /// Client with an internal receive ring of the default capacity.
    /// No configuration traffic is exchanged.
    pub fn new(port: F) -> Self {
        Self::new_with(port, [0u8; DEFAULT_RECV_CAPACITY])
    }

    /// Like [Client::open_with], with the default receive ring.
    pub fn open(port: F) -> Result<Self, OpenError>
    where
        F: Read + Write,
    {
        Self::open_with(port, [0u8; DEFAULT_RECV_CAPACITY])
    }
}

impl<F, B> Client<F, B>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    /// Client over caller-provided ring storage.
    pub fn new_with(port: F, storage: B) -> Self {
        Self {
            port,
            ring: RingBuffer::new(storage),
        }
    }

    /// Create a client and run the configuration handshake, leaving
    /// the module in API mode 2 with hardware flow control.
    ///
    /// The serial line must already run at the module's baud rate;
    /// there is no in-band way to discover it.
    pub fn open_with(port: F, storage: B) -> Result<Self, OpenError>
    where
        F: Read + Write,
    {
        let mut client = Self::new_with(port, storage);
        client.initialize()?;
        Ok(client)
    }

    /// Force the module out of transparent mode and into API mode 2
    /// with RTS/CTS flow control, then verify the settings through the
    /// framed interface.
    ///
    /// On error the module's state is unspecified and the handle
    /// should be dropped.
    pub fn initialize(&mut self) -> Result<(), OpenError>
    where
        F: Read + Write,
    {
        self.ring.clear();

        // throw away anything the module sent before we took over
        let mut scratch = [0u8; 32];
        while read_available(&mut self.port, &mut scratch)? > 0 {}

        // guard silence, "+++", guard silence forces command mode
        std::thread::sleep(GUARD_TIME);
        for _ in 0..3 {
            self.port.write_all(b"+")?;
        }
        std::thread::sleep(GUARD_TIME);

        let mut ack = [0u8; 3];
        if !read_exactly(&mut self.port, &mut ack)? || &ack != b"OK\r" {
            return Err(OpenError::NoCommandModeAck { got: ack });
        }

        // API mode 2, RTS on D7, CTS on D6, then apply and exit
        self.port.write_all(b"ATAP 2\rATD7 1\rATD6 1\rATCN\r")?;

        // read the three values back through the framed interface
        self.at_command(1, *b"AP", &[])?;
        self.at_command(2, *b"D7", &[])?;
        self.at_command(3, *b"D6", &[])?;

        // ample time for every response above to arrive
        std::thread::sleep(Duration::from_secs(1));

        for index in 0..4 {
            let mut ok = [0u8; 3];
            if !read_exactly(&mut self.port, &mut ok)? {
                return Err(OpenError::MissingConfigAck { index });
            }
            if &ok != b"OK\r" {
                return Err(OpenError::BadConfigAck { index, got: ok });
            }
        }

        let expected: [(u8, [u8; 2], u8); 3] =
            [(1, *b"AP", 0x02), (2, *b"D7", 0x01), (3, *b"D6", 0x01)];
        for (frame_id, at_command, value) in expected {
            let mut frame = [0u8; 16];
            let mut length = 0;
            for _ in 0..IDLE_READ_LIMIT {
                length = self.recv_frame(&mut frame)?;
                if length > 0 {
                    break;
                }
            }
            if length == 0 {
                return Err(OpenError::MissingAtResponse { at_command });
            }

            match protocol::parse_frame(&frame[..length])? {
                Response::AtResponse(r)
                    if r.frame_id == frame_id && r.at_command == at_command =>
                {
                    if r.data != &[value][..] {
                        return Err(OpenError::BadParameterValue { at_command });
                    }
                }
                _ => return Err(OpenError::UnexpectedAtResponse { at_command }),
            }
        }

        Ok(())
    }

    /// Emit one frame around a prebuilt payload (API id included).
    pub fn send_frame(&mut self, payload: &[u8]) -> std::io::Result<()>
    where
        F: Write,
    {
        let mut ser = SerializerWrap::new(&mut self.port);
        write_frame(&mut ser, payload)
    }

    /// Emit one typed frame.
    pub fn write<M>(&mut self, msg: &M) -> std::io::Result<()>
    where
        F: Write,
        M: MessageSerialize,
    {
        let mut ser = SerializerWrap::new(&mut self.port);
        msg.frame(&mut ser)
    }

    /// Send an AT command that applies immediately.
    pub fn at_command(
        &mut self,
        frame_id: u8,
        at_command: [u8; 2],
        parameter: &[u8],
    ) -> std::io::Result<()>
    where
        F: Write,
    {
        self.write(&AtCommand {
            frame_id,
            at_command,
            parameter,
        })
    }

    /// Send an AT parameter change that stays pending until applied.
    pub fn at_queue_parameter(
        &mut self,
        frame_id: u8,
        at_command: [u8; 2],
        parameter: &[u8],
    ) -> std::io::Result<()>
    where
        F: Write,
    {
        self.write(&AtQueueParameter {
            frame_id,
            at_command,
            parameter,
        })
    }

    /// Send an AT command to another node over the air.
    pub fn remote_at_command(
        &mut self,
        frame_id: u8,
        destination: Address,
        options: u8,
        at_command: [u8; 2],
        parameter: &[u8],
    ) -> std::io::Result<()>
    where
        F: Write,
    {
        self.write(&RemoteAtCommand {
            frame_id,
            destination,
            options,
            at_command,
            parameter,
        })
    }

    /// Send a data payload to another module.
    pub fn transmit(
        &mut self,
        frame_id: u8,
        destination: Address,
        options: u8,
        data: &[u8],
    ) -> std::io::Result<()>
    where
        F: Write,
    {
        self.write(&Transmit {
            frame_id,
            destination,
            options,
            data,
        })
    }

    /// Pull whatever the port has ready into the receive ring.
    pub fn fill_buffer(&mut self) -> std::io::Result<usize>
    where
        F: Read,
    {
        self.ring.fill(&mut self.port)
    }

    /// Extract one already-buffered frame; 0 if none is complete yet.
    pub fn decode_frame(&mut self, out: &mut [u8]) -> usize {
        parse::decode_frame(&mut self.ring, out)
    }

    /// The still-escaped bytes waiting in the receive ring, oldest
    /// first. Diagnostic; decoding is unaffected.
    pub fn recv_window(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.ring.len()).map(move |i| self.ring.get(i))
    }

    /// Receive one frame: decode from the ring, refilling from the
    /// port once if needed.
    ///
    /// Returns the payload length, or 0 if no complete frame has
    /// arrived yet; the caller is expected to call again later.
    pub fn recv_frame(&mut self, out: &mut [u8]) -> std::io::Result<usize>
    where
        F: Read,
    {
        let length = parse::decode_frame(&mut self.ring, out);
        if length > 0 {
            return Ok(length);
        }

        self.fill_buffer()?;
        Ok(parse::decode_frame(&mut self.ring, out))
    }

    /// Receive and parse one response frame.
    ///
    /// `out` holds the decoded payload and must outlive the response,
    /// which borrows its variable-length fields from it.
    pub fn read_response<'a>(
        &mut self,
        out: &'a mut [u8],
    ) -> Result<Option<Response<&'a [u8]>>, Error>
    where
        F: Read,
    {
        let length = self.recv_frame(out)?;
        if length == 0 {
            return Ok(None);
        }
        Ok(Some(protocol::parse_frame(&out[..length])?))
    }
}
