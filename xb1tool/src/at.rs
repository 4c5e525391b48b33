use std::time::Duration;

use xb1lib::protocol::{AtCommand, Response};

#[derive(clap::Args, Debug)]
pub struct AtOpts {
    /// Two-letter command name, like ID or CH.
    command: String,

    /// New value as hex bytes, like "0x1a2b" or "1a 2b"; omit to query.
    value: Option<String>,

    #[arg(long, default_value_t = 1)]
    frame_id: u8,

    #[command(flatten)]
    port: crate::common::SerialPortArgs,
    #[command(flatten)]
    trace: crate::debug::TraceArgs,
}

/// How long to wait for the response before giving up.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

impl AtOpts {
    pub fn run(&self) -> anyhow::Result<()> {
        let at_command = crate::common::parse_at_name(&self.command)?;
        let parameter = match self.value {
            Some(ref v) => crate::common::parse_hex_bytes(v.trim_start_matches("0x"))?,
            None => Vec::new(),
        };

        let mut client = self.trace.wrap(self.port.client()?)?;

        client.write(&AtCommand {
            frame_id: self.frame_id,
            at_command,
            parameter: &parameter[..],
        })?;

        let deadline = std::time::Instant::now() + RESPONSE_TIMEOUT;
        while std::time::Instant::now() < deadline {
            let mut frame = [0u8; xb1lib::protocol::MAX_FRAME_SIZE];
            match client.read_response(&mut frame)? {
                Some(Response::AtResponse(r)) if r.frame_id == self.frame_id => {
                    match r.status {
                        0 => {
                            if r.data.is_empty() {
                                println!("AT {} ok", r.at_command.escape_ascii());
                            } else {
                                print!("AT {} = ", r.at_command.escape_ascii());
                                for b in r.data {
                                    print!("{:02x}", b);
                                }
                                println!();
                            }
                            return Ok(());
                        }
                        status => {
                            anyhow::bail!(
                                "AT {} failed with status {:#04x}",
                                r.at_command.escape_ascii(),
                                status
                            );
                        }
                    }
                }
                Some(other) => {
                    // unrelated traffic, keep waiting
                    if self.trace.debug == 0 {
                        eprintln!("(ignoring {:?})", other);
                    }
                }
                None => std::thread::sleep(Duration::from_millis(20)),
            }
        }

        anyhow::bail!("no response to AT {} in time", at_command.escape_ascii())
    }
}
