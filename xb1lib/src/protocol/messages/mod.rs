//! Frame types used in the protocol.

use nom::{error::Error, Parser};

use crate::protocol::parse::{MessageParse, Parse};
use crate::protocol::serialize::{MessageSerialize, Serializer};

pub mod command;
pub mod response;
pub mod util;

pub use command::{AtCommand, AtQueueParameter, RemoteAtCommand, Transmit};
pub use response::{
    AtResponse, ModemStatus, Receive16, Receive64, RemoteAtResponse, TransmitStatus,
};

/// A trait for frames with statically-known API ids.
pub trait MessageType {
    const API_ID: u8;
}

/// 64-bit broadcast address.
pub const ADDR64_BROADCAST: u64 = 0xffff;

/// 16-bit broadcast address.
pub const ADDR16_BROADCAST: u16 = 0xffff;

/// 16-bit field value meaning "address by the 64-bit field instead".
pub const ADDR16_DISABLED: u16 = 0xfffe;

/// Destination of a module-bound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Address {
    /// 64-bit serial number address.
    Addr64(u64),
    /// 16-bit network address.
    Addr16(u16),
    /// Broadcast through the 64-bit address space.
    Broadcast64,
    /// Broadcast through the 16-bit address space.
    Broadcast16,
}

impl Address {
    /// The 64-bit and 16-bit field pair of a remote AT command header.
    ///
    /// Whichever field does not carry the address is pinned to the
    /// value the module expects for "unused".
    pub fn remote_fields(&self) -> (u64, u16) {
        match *self {
            Address::Addr64(addr) => (addr, ADDR16_DISABLED),
            Address::Addr16(addr) => (u64::from(ADDR16_DISABLED), addr),
            Address::Broadcast64 | Address::Broadcast16 => (ADDR64_BROADCAST, ADDR16_DISABLED),
        }
    }

    /// True for either broadcast variant.
    pub fn is_broadcast(&self) -> bool {
        matches!(self, Address::Broadcast64 | Address::Broadcast16)
    }
}

/// Any frame the module can send to the host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response<I> {
    /// 0x8A hardware event notification.
    ModemStatus(response::ModemStatus),
    /// 0x89 delivery result for a transmit request.
    TransmitStatus(response::TransmitStatus),
    /// 0x88 local AT command response.
    AtResponse(response::AtResponse<I>),
    /// 0x97 remote AT command response.
    RemoteAtResponse(response::RemoteAtResponse<I>),
    /// 0x80 received packet with a 64-bit source.
    Receive64(response::Receive64<I>),
    /// 0x81 received packet with a 16-bit source.
    Receive16(response::Receive16<I>),
}

impl<I> Response<I> {
    /// True if this API id maps to a known response frame.
    pub fn recognizes(api_id: u8) -> bool {
        matches!(
            api_id,
            response::ModemStatus::API_ID
                | response::TransmitStatus::API_ID
                | response::AtResponse::<()>::API_ID
                | response::RemoteAtResponse::<()>::API_ID
                | response::Receive64::<()>::API_ID
                | response::Receive16::<()>::API_ID
        )
    }

    pub fn map_ref<'a, F, J>(&'a self, f: F) -> Response<J>
    where
        F: FnOnce(&'a I) -> J,
    {
        match self {
            Self::ModemStatus(o) => Response::ModemStatus(o.clone()),
            Self::TransmitStatus(o) => Response::TransmitStatus(o.clone()),
            Self::AtResponse(o) => Response::AtResponse(o.map_ref(f)),
            Self::RemoteAtResponse(o) => Response::RemoteAtResponse(o.map_ref(f)),
            Self::Receive64(o) => Response::Receive64(o.map_ref(f)),
            Self::Receive16(o) => Response::Receive16(o.map_ref(f)),
        }
    }

    pub fn borrow<Borrowed: ?Sized>(&self) -> Response<&Borrowed>
    where
        I: core::borrow::Borrow<Borrowed>,
    {
        self.map_ref(I::borrow)
    }

    /// Correlation id, for the frame types that carry one.
    pub fn frame_id(&self) -> Option<u8> {
        match self {
            Self::ModemStatus(_) => None,
            Self::TransmitStatus(o) => Some(o.frame_id),
            Self::AtResponse(o) => Some(o.frame_id),
            Self::RemoteAtResponse(o) => Some(o.frame_id),
            Self::Receive64(_) => None,
            Self::Receive16(_) => None,
        }
    }
}

impl<I> MessageSerialize for Response<I>
where
    I: Parse,
{
    fn api_id(&self) -> u8 {
        match self {
            Self::ModemStatus(m) => m.api_id(),
            Self::TransmitStatus(m) => m.api_id(),
            Self::AtResponse(m) => m.api_id(),
            Self::RemoteAtResponse(m) => m.api_id(),
            Self::Receive64(m) => m.api_id(),
            Self::Receive16(m) => m.api_id(),
        }
    }

    fn message_body<S>(&self, ser: &mut S) -> Result<(), S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::ModemStatus(m) => m.message_body(ser),
            Self::TransmitStatus(m) => m.message_body(ser),
            Self::AtResponse(m) => m.message_body(ser),
            Self::RemoteAtResponse(m) => m.message_body(ser),
            Self::Receive64(m) => m.message_body(ser),
            Self::Receive16(m) => m.message_body(ser),
        }
    }
}

impl<I> MessageParse<I> for Response<I>
where
    I: Parse,
{
    fn parse_body(api_id: u8) -> impl Parser<I, Self, Error<I>> {
        move |input| match api_id {
            response::ModemStatus::API_ID => response::ModemStatus::parse_body(api_id)
                .map(Self::ModemStatus)
                .parse(input),
            response::TransmitStatus::API_ID => response::TransmitStatus::parse_body(api_id)
                .map(Self::TransmitStatus)
                .parse(input),
            response::AtResponse::<()>::API_ID => response::AtResponse::parse_body(api_id)
                .map(Self::AtResponse)
                .parse(input),
            response::RemoteAtResponse::<()>::API_ID => {
                response::RemoteAtResponse::parse_body(api_id)
                    .map(Self::RemoteAtResponse)
                    .parse(input)
            }
            response::Receive64::<()>::API_ID => response::Receive64::parse_body(api_id)
                .map(Self::Receive64)
                .parse(input),
            response::Receive16::<()>::API_ID => response::Receive16::parse_body(api_id)
                .map(Self::Receive16)
                .parse(input),

            // we don't recognize the API id
            _ => nom::combinator::fail(input),
        }
    }
}

#[cfg(test)]
#[cfg(feature = "std")]
pub(super) mod test {
    use crate::client::RingBuffer;
    use crate::protocol::serialize::SerializerWrap;
    use crate::protocol::{decode_frame, parse_frame, MessageSerialize};

    use super::*;

    /// Serialize a response, push the wire bytes through the real ring
    /// decoder, parse the payload back, and compare.
    pub(in crate::protocol) fn roundtrip(msg: &Response<&[u8]>) -> bool {
        let mut ser = SerializerWrap::new(Vec::new());
        msg.frame(&mut ser).unwrap();
        let wire = ser.done();

        let mut ring = RingBuffer::new([0u8; crate::protocol::MAX_FRAME_SIZE]);
        let mut src: &[u8] = &wire;
        ring.fill(&mut src).unwrap();
        assert!(src.is_empty(), "frame exceeds the test ring");

        let mut out = [0u8; crate::protocol::MAX_FRAME_SIZE];
        let length = decode_frame(&mut ring, &mut out);
        if length == 0 {
            return false;
        }

        // a validated frame sums to 0xff including its trailer
        let sum: u8 = out[..length + 1]
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b));
        if sum != 0xff {
            return false;
        }

        match parse_frame(&out[..length]) {
            Ok(parsed) => parsed == *msg,
            Err(_) => false,
        }
    }
}
