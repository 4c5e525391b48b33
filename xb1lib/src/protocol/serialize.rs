use super::checksum::Checksum;
use super::escape;
use super::parse::Parse;
use super::FRAME_DELIM;

/// A trait for emitting wire bytes.
pub trait Serializer {
    type Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error>;

    // everything else can be written in terms of write_u8

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        for b in val.iter() {
            self.write_u8(*b)?;
        }
        Ok(())
    }

    fn write_slice<I>(&mut self, val: &I) -> Result<(), Self::Error>
    where
        I: Parse,
    {
        use nom::InputIter;

        for b in val.iter_elements() {
            self.write_u8(b)?;
        }
        Ok(())
    }

    fn write_be_u16(&mut self, val: u16) -> Result<(), Self::Error> {
        self.write_bytes(&[(val >> 8) as u8, (val & 0xff) as u8])
    }

    fn write_be_u64(&mut self, val: u64) -> Result<(), Self::Error> {
        let mut buf = [0u8; 8];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = (val >> (56 - 8 * i)) as u8;
        }
        self.write_bytes(&buf)
    }
}

impl<S> Serializer for &mut S
where
    S: Serializer,
{
    type Error = S::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        (*self).write_u8(val)
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        (*self).write_bytes(val)
    }

    fn write_be_u16(&mut self, val: u16) -> Result<(), Self::Error> {
        (*self).write_be_u16(val)
    }

    fn write_be_u64(&mut self, val: u64) -> Result<(), Self::Error> {
        (*self).write_be_u64(val)
    }
}

/// Wrap a [std::io::Write] to become a Serializer.
#[cfg(feature = "std")]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializerWrap<T> {
    inner: T,
}

#[cfg(feature = "std")]
impl<T> SerializerWrap<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn done(self) -> T {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<T> Serializer for SerializerWrap<T>
where
    T: std::io::Write,
{
    type Error = std::io::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        self.inner.write_all(&[val])
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(val)
    }
}

/// A serializer that only counts bytes written.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializerLength {
    len: usize,
}

impl SerializerLength {
    pub fn new() -> Self {
        SerializerLength { len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

impl Default for SerializerLength {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer for SerializerLength {
    type Error = void::Void;

    fn write_u8(&mut self, _val: u8) -> Result<(), Self::Error> {
        self.len += 1;
        Ok(())
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        self.len += val.len();
        Ok(())
    }

    fn write_be_u16(&mut self, _val: u16) -> Result<(), Self::Error> {
        self.len += 2;
        Ok(())
    }

    fn write_be_u64(&mut self, _val: u64) -> Result<(), Self::Error> {
        self.len += 8;
        Ok(())
    }
}

/// A serializer that also accumulates the frame checksum on the side.
///
/// The checksum covers bytes as written here, before any escaping, so
/// this layer sits above [SerializerEscaped].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerializerChecksum<T> {
    sum: Checksum,
    inner: T,
}

impl<T> SerializerChecksum<T> {
    pub fn new(inner: T) -> Self {
        Self {
            sum: Checksum::new(),
            inner,
        }
    }

    /// Finish, returning the trailer byte and the inner serializer.
    pub fn finalize(self) -> (u8, T) {
        (self.sum.finalize(), self.inner)
    }
}

impl<T> Serializer for SerializerChecksum<T>
where
    T: Serializer,
{
    type Error = T::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        self.sum.push(val);
        self.inner.write_u8(val)
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        self.sum.update(val);
        self.inner.write_bytes(val)
    }
}

/// A serializer that applies API mode 2 escaping to every byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerializerEscaped<T> {
    inner: T,
}

impl<T> SerializerEscaped<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn done(self) -> T {
        self.inner
    }
}

impl<T> Serializer for SerializerEscaped<T>
where
    T: Serializer,
{
    type Error = T::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        if escape::needs_escape(val) {
            self.inner.write_u8(escape::ESCAPE)?;
            self.inner.write_u8(escape::apply(val))
        } else {
            self.inner.write_u8(val)
        }
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        for b in val.iter() {
            self.write_u8(*b)?;
        }
        Ok(())
    }
}

/// Emit one complete frame around a prebuilt payload.
///
/// Layout on the wire: raw delimiter, escaped big-endian length,
/// escaped payload, escaped checksum trailer.
pub fn write_frame<S>(ser: &mut S, payload: &[u8]) -> Result<(), S::Error>
where
    S: Serializer,
{
    ser.write_u8(FRAME_DELIM)?;

    let mut escaped = SerializerEscaped::new(ser);
    escaped.write_be_u16(payload.len() as u16)?;

    let mut summed = SerializerChecksum::new(escaped);
    summed.write_bytes(payload)?;
    let (trailer, mut escaped) = summed.finalize();

    escaped.write_u8(trailer)
}

/// A trait for serializing frames.
pub trait MessageSerialize {
    /// The API id for this frame.
    fn api_id(&self) -> u8;

    /// Serialize just the bytes after the API id.
    ///
    /// This *must* perform the same writes every time it is called with
    /// the same message; the length pass below relies on it.
    fn message_body<S>(&self, ser: &mut S) -> Result<(), S::Error>
    where
        S: Serializer;

    // these can all use default implementations

    /// Serialize the frame payload: API id, then body.
    fn frame_body<S>(&self, ser: &mut S) -> Result<(), S::Error>
    where
        S: Serializer,
    {
        ser.write_u8(self.api_id())?;
        self.message_body(ser)
    }

    /// Serialize the complete frame with delimiter, length, escaping,
    /// and checksum trailer.
    fn frame<S>(&self, ser: &mut S) -> Result<(), S::Error>
    where
        S: Serializer,
    {
        use void::ResultVoidExt;

        // run the body once to measure it
        let mut len_ser = SerializerLength::new();
        self.frame_body(&mut len_ser).void_unwrap();
        let len = len_ser.len() as u16;

        ser.write_u8(FRAME_DELIM)?;

        let mut escaped = SerializerEscaped::new(ser);
        escaped.write_be_u16(len)?;

        let mut summed = SerializerChecksum::new(escaped);
        self.frame_body(&mut summed)?;
        let (trailer, mut escaped) = summed.finalize();

        escaped.write_u8(trailer)
    }
}

#[cfg(test)]
#[cfg(feature = "std")]
mod test {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn frame_bytes(payload: &[u8]) -> Vec<u8> {
        let mut ser = SerializerWrap::new(Vec::new());
        write_frame(&mut ser, payload).unwrap();
        ser.done()
    }

    #[test]
    fn at_query_frame() {
        assert_eq!(
            frame_bytes(&[0x08, 0x01, 0x41, 0x50]),
            [0x7e, 0x00, 0x04, 0x08, 0x01, 0x41, 0x50, 0x65],
        );
    }

    #[test]
    fn payload_bytes_are_escaped() {
        assert_eq!(
            frame_bytes(&[0x7e, 0x7d, 0x11, 0x13]),
            [
                0x7e, 0x00, 0x04, 0x7d, 0x5e, 0x7d, 0x5d, 0x7d, 0x31, 0x7d, 0x33,
                // 0x7e + 0x7d + 0x11 + 0x13 = 0x1f, trailer 0xe0
                0xe0,
            ],
        );
    }

    #[test]
    fn length_bytes_are_escaped() {
        let payload = vec![0u8; 0x7e];
        let wire = frame_bytes(&payload);
        assert_eq!(&wire[..4], [0x7e, 0x00, 0x7d, 0x5e]);

        let payload = vec![0u8; 0x11];
        let wire = frame_bytes(&payload);
        assert_eq!(&wire[..4], [0x7e, 0x00, 0x7d, 0x31]);
    }

    #[test]
    fn trailer_byte_is_escaped() {
        // payload sum 0x81 gives trailer 0x7e, which must be escaped
        let wire = frame_bytes(&[0x81]);
        assert_eq!(wire, [0x7e, 0x00, 0x01, 0x81, 0x7d, 0x5e]);
    }

    #[test]
    fn length_pass_counts_wide_writes() {
        use void::ResultVoidExt;

        let mut ser = SerializerLength::new();
        ser.write_u8(0).void_unwrap();
        ser.write_be_u16(0x1234).void_unwrap();
        ser.write_be_u64(0x0123_4567_89ab_cdef).void_unwrap();
        ser.write_bytes(&[1, 2, 3]).void_unwrap();
        assert_eq!(ser.len(), 14);
    }

    #[quickcheck]
    fn only_the_delimiter_is_raw(payload: Vec<u8>) -> bool {
        let wire = frame_bytes(&payload);
        wire[0] == 0x7e && !wire[1..].contains(&0x7e)
    }
}
