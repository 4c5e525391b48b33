//! Wire protocol for the XBee 802.15.4 serial API in mode 2 (escaped).

/// Start-of-frame delimiter. Never escaped, and therefore the sole
/// resynchronization point in the byte stream.
pub const FRAME_DELIM: u8 = 0x7e;

/// Upper bound on the raw on-wire size of any frame this driver handles.
pub const MAX_FRAME_SIZE: usize = 0x200;

/// Factory serial rate of the module.
pub const BAUD_RATE: u32 = 9600;

pub mod checksum;

pub mod escape;

pub mod parse;
pub use parse::{decode_frame, MessageParse, Parse, ParseFrameError, RecvBuffer};

pub mod messages;
pub use messages::*;

pub mod serialize;
pub use serialize::MessageSerialize;

/// Parse a decoded, unescaped frame payload into a tagged response.
///
/// The payload runs from the API id byte onward, exactly as returned by
/// [`decode_frame`] (without the trailing checksum byte). Variable-length
/// fields of the result borrow from the payload.
pub fn parse_frame<I>(payload: I) -> Result<Response<I>, ParseFrameError>
where
    I: Parse,
{
    use nom::{InputLength, Parser};

    if payload.input_len() < 2 {
        return Err(ParseFrameError::WrongLengthForApi);
    }

    // cannot fail, the input is non-empty
    let (body, api_id) = nom::number::complete::u8(payload)
        .map_err(|_: nom::Err<nom::error::Error<I>>| ParseFrameError::WrongLengthForApi)?;

    if !Response::<I>::recognizes(api_id) {
        return Err(ParseFrameError::UnknownApiId(api_id));
    }

    nom::combinator::all_consuming(Response::parse_body(api_id))
        .parse(body)
        .map(|(_, response)| response)
        .map_err(|_| ParseFrameError::WrongLengthForApi)
}

/// Serialize a message into a complete frame on a writer.
///
/// This covers the start delimiter, escaped length, escaped body, and
/// escaped checksum trailer.
#[cfg(feature = "std")]
pub fn serialize<W, M>(writer: &mut W, message: &M) -> std::io::Result<()>
where
    W: std::io::Write,
    M: MessageSerialize,
{
    let mut ser = serialize::SerializerWrap::new(writer);
    message.frame(&mut ser)
}
