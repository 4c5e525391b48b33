//! Frames sent from the host to the module.

use crate::protocol::parse::Parse;
use crate::protocol::serialize::{MessageSerialize, Serializer};

use super::{Address, MessageType, ADDR16_BROADCAST, ADDR64_BROADCAST};

/// API id of a transmit request addressed by 64-bit serial number.
pub const TRANSMIT_64: u8 = 0x00;

/// API id of a transmit request addressed by 16-bit network address.
pub const TRANSMIT_16: u8 = 0x01;

/// 0x08 AT Command: query a parameter, or set and apply it at once.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AtCommand<I> {
    /// Correlation id echoed in the response; 0 requests no response.
    pub frame_id: u8,
    /// Two-letter command name, e.g. `*b"AP"`.
    pub at_command: [u8; 2],
    /// Parameter bytes; empty to query the current value.
    pub parameter: I,
}

impl<I> MessageType for AtCommand<I> {
    const API_ID: u8 = 0x08;
}

impl<I> MessageSerialize for AtCommand<I>
where
    I: Parse,
{
    fn api_id(&self) -> u8 {
        Self::API_ID
    }

    fn message_body<S>(&self, ser: &mut S) -> Result<(), S::Error>
    where
        S: Serializer,
    {
        ser.write_u8(self.frame_id)?;
        ser.write_bytes(&self.at_command)?;
        ser.write_slice(&self.parameter)
    }
}

/// 0x09 AT Queue Parameter: like [AtCommand], but the new value sits in
/// a pending set until an `AC` or `CN` command applies it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AtQueueParameter<I> {
    pub frame_id: u8,
    pub at_command: [u8; 2],
    pub parameter: I,
}

impl<I> MessageType for AtQueueParameter<I> {
    const API_ID: u8 = 0x09;
}

impl<I> MessageSerialize for AtQueueParameter<I>
where
    I: Parse,
{
    fn api_id(&self) -> u8 {
        Self::API_ID
    }

    fn message_body<S>(&self, ser: &mut S) -> Result<(), S::Error>
    where
        S: Serializer,
    {
        ser.write_u8(self.frame_id)?;
        ser.write_bytes(&self.at_command)?;
        ser.write_slice(&self.parameter)
    }
}

/// 0x17 Remote AT Command: configure another node over the air.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemoteAtCommand<I> {
    pub frame_id: u8,
    /// Target node.
    pub destination: Address,
    /// Bit 1 applies the change on the remote without a separate `AC`.
    pub options: u8,
    pub at_command: [u8; 2],
    pub parameter: I,
}

impl<I> MessageType for RemoteAtCommand<I> {
    const API_ID: u8 = 0x17;
}

impl<I> MessageSerialize for RemoteAtCommand<I>
where
    I: Parse,
{
    fn api_id(&self) -> u8 {
        Self::API_ID
    }

    fn message_body<S>(&self, ser: &mut S) -> Result<(), S::Error>
    where
        S: Serializer,
    {
        let (addr64, addr16) = self.destination.remote_fields();

        ser.write_u8(self.frame_id)?;
        ser.write_be_u64(addr64)?;
        ser.write_be_u16(addr16)?;
        ser.write_u8(self.options)?;
        ser.write_bytes(&self.at_command)?;
        ser.write_slice(&self.parameter)
    }
}

/// 0x00 / 0x01 Transmit Request: send a payload to another module.
///
/// The API id depends on the addressing mode: 16-bit destinations use
/// 0x01, 64-bit destinations 0x00.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transmit<I> {
    pub frame_id: u8,
    pub destination: Address,
    /// 0x01 disables the ACK, 0x04 sends on the broadcast PAN id.
    pub options: u8,
    pub data: I,
}

impl<I> MessageSerialize for Transmit<I>
where
    I: Parse,
{
    fn api_id(&self) -> u8 {
        match self.destination {
            Address::Addr16(_) | Address::Broadcast16 => TRANSMIT_16,
            Address::Addr64(_) | Address::Broadcast64 => TRANSMIT_64,
        }
    }

    fn message_body<S>(&self, ser: &mut S) -> Result<(), S::Error>
    where
        S: Serializer,
    {
        ser.write_u8(self.frame_id)?;
        match self.destination {
            Address::Addr64(addr) => ser.write_be_u64(addr)?,
            Address::Broadcast64 => ser.write_be_u64(ADDR64_BROADCAST)?,
            Address::Addr16(addr) => ser.write_be_u16(addr)?,
            Address::Broadcast16 => ser.write_be_u16(ADDR16_BROADCAST)?,
        }
        ser.write_u8(self.options)?;
        ser.write_slice(&self.data)
    }
}

#[cfg(test)]
#[cfg(feature = "std")]
mod test {
    use crate::protocol::serialize::SerializerWrap;

    use super::*;

    fn payload<M>(msg: &M) -> Vec<u8>
    where
        M: MessageSerialize,
    {
        let mut ser = SerializerWrap::new(Vec::new());
        msg.frame_body(&mut ser).unwrap();
        ser.done()
    }

    #[test]
    fn at_command_layout() {
        let msg = AtCommand {
            frame_id: 0x01,
            at_command: *b"AP",
            parameter: &b""[..],
        };
        assert_eq!(payload(&msg), [0x08, 0x01, 0x41, 0x50]);
    }

    #[test]
    fn at_command_with_parameter() {
        let msg = AtCommand {
            frame_id: 0x52,
            at_command: *b"DL",
            parameter: &[0x12, 0x34][..],
        };
        assert_eq!(payload(&msg), [0x08, 0x52, 0x44, 0x4c, 0x12, 0x34]);
    }

    #[test]
    fn at_queue_parameter_layout() {
        let msg = AtQueueParameter {
            frame_id: 0x02,
            at_command: *b"BD",
            parameter: &[0x07][..],
        };
        assert_eq!(payload(&msg), [0x09, 0x02, 0x42, 0x44, 0x07]);
    }

    #[test]
    fn remote_at_to_addr64() {
        let msg = RemoteAtCommand {
            frame_id: 0x05,
            destination: Address::Addr64(0x0013_a200_4000_1234),
            options: 0x02,
            at_command: *b"D0",
            parameter: &[0x04][..],
        };
        assert_eq!(
            payload(&msg),
            [
                0x17, 0x05, // api id, frame id
                0x00, 0x13, 0xa2, 0x00, 0x40, 0x00, 0x12, 0x34, // 64-bit destination
                0xff, 0xfe, // 16-bit field unused
                0x02, 0x44, 0x30, 0x04, // options, "D0", parameter
            ],
        );
    }

    #[test]
    fn remote_at_to_addr16() {
        let msg = RemoteAtCommand {
            frame_id: 0x06,
            destination: Address::Addr16(0x1234),
            options: 0x00,
            at_command: *b"D1",
            parameter: &b""[..],
        };
        assert_eq!(
            payload(&msg),
            [
                0x17, 0x06, //
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xfe, // 64-bit field unused
                0x12, 0x34, // 16-bit destination
                0x00, 0x44, 0x31,
            ],
        );
    }

    #[test]
    fn remote_at_broadcast() {
        for destination in [Address::Broadcast64, Address::Broadcast16] {
            let msg = RemoteAtCommand {
                frame_id: 0x07,
                destination,
                options: 0x00,
                at_command: *b"D2",
                parameter: &b""[..],
            };
            assert_eq!(
                payload(&msg),
                [
                    0x17, 0x07, //
                    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, // broadcast
                    0xff, 0xfe, //
                    0x00, 0x44, 0x32,
                ],
            );
        }
    }

    #[test]
    fn transmit_to_addr16() {
        let msg = Transmit {
            frame_id: 0x11,
            destination: Address::Addr16(0xbeef),
            options: 0x00,
            data: &b"hi"[..],
        };
        assert_eq!(payload(&msg), [0x01, 0x11, 0xbe, 0xef, 0x00, 0x68, 0x69]);
    }

    #[test]
    fn transmit_to_addr64() {
        let msg = Transmit {
            frame_id: 0x12,
            destination: Address::Addr64(0x0013_a200_4000_5678),
            options: 0x01,
            data: &[0xde, 0xad][..],
        };
        assert_eq!(
            payload(&msg),
            [
                0x00, 0x12, //
                0x00, 0x13, 0xa2, 0x00, 0x40, 0x00, 0x56, 0x78, //
                0x01, 0xde, 0xad,
            ],
        );
    }

    #[test]
    fn transmit_broadcast_addresses() {
        let msg = Transmit {
            frame_id: 0x13,
            destination: Address::Broadcast16,
            options: 0x00,
            data: &b"x"[..],
        };
        assert_eq!(payload(&msg), [0x01, 0x13, 0xff, 0xff, 0x00, 0x78]);

        let msg = Transmit {
            frame_id: 0x14,
            destination: Address::Broadcast64,
            options: 0x00,
            data: &b"x"[..],
        };
        assert_eq!(
            payload(&msg),
            [
                0x00, 0x14, //
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, //
                0x00, 0x78,
            ],
        );
    }
}
