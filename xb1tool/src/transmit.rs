use std::time::Duration;

use xb1lib::protocol::{Address, Response, Transmit};

#[derive(clap::Args, Debug)]
pub struct TransmitOpts {
    /// Destination: a 16-bit or 64-bit hex address (by digit count),
    /// "broadcast", or "broadcast16".
    address: String,

    /// Payload text, or hex bytes with --hex.
    data: String,

    /// Treat the payload as hex bytes.
    #[arg(long)]
    hex: bool,

    /// Skip the acknowledgement from the remote module.
    #[arg(long)]
    no_ack: bool,

    #[arg(long, default_value_t = 1)]
    frame_id: u8,

    #[command(flatten)]
    port: crate::common::SerialPortArgs,
    #[command(flatten)]
    trace: crate::debug::TraceArgs,
}

const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

fn parse_address(s: &str) -> anyhow::Result<Address> {
    match s {
        "broadcast" | "broadcast64" => return Ok(Address::Broadcast64),
        "broadcast16" => return Ok(Address::Broadcast16),
        _ => {}
    }

    let digits = s.trim_start_matches("0x");
    match digits.len() {
        1..=4 => Ok(Address::Addr16(u16::from_str_radix(digits, 16)?)),
        5..=16 => Ok(Address::Addr64(u64::from_str_radix(digits, 16)?)),
        _ => anyhow::bail!("address {:?} is too long", s),
    }
}

impl TransmitOpts {
    pub fn run(&self) -> anyhow::Result<()> {
        let destination = parse_address(&self.address)?;
        let data = if self.hex {
            crate::common::parse_hex_bytes(&self.data)?
        } else {
            self.data.clone().into_bytes()
        };
        let options = if self.no_ack { 0x01 } else { 0x00 };

        let mut client = self.trace.wrap(self.port.client()?)?;

        client.write(&Transmit {
            frame_id: self.frame_id,
            destination,
            options,
            data: &data[..],
        })?;

        if self.frame_id == 0 {
            // frame id 0 asks the module not to report back
            return Ok(());
        }

        let deadline = std::time::Instant::now() + STATUS_TIMEOUT;
        while std::time::Instant::now() < deadline {
            let mut frame = [0u8; xb1lib::protocol::MAX_FRAME_SIZE];
            match client.read_response(&mut frame)? {
                Some(Response::TransmitStatus(s)) if s.frame_id == self.frame_id => {
                    let name = crate::monitor::transmit_status_name(s.status);
                    if s.status == 0 {
                        println!("{}", name);
                        return Ok(());
                    }
                    anyhow::bail!("transmit failed: {} ({:#04x})", name, s.status);
                }
                Some(_) => {}
                None => std::thread::sleep(Duration::from_millis(20)),
            }
        }

        anyhow::bail!("no transmit status in time")
    }
}
