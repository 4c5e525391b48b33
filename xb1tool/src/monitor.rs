use std::time::Duration;

use xb1lib::protocol::Response;

#[derive(clap::Args, Debug)]
pub struct MonitorOpts {
    #[command(flatten)]
    port: crate::common::SerialPortArgs,
    #[command(flatten)]
    trace: crate::debug::TraceArgs,
}

/// Modem status codes, per the module manual.
fn modem_status_name(status: u8) -> &'static str {
    match status {
        0 => "hardware reset",
        1 => "watchdog reset",
        2 => "associated",
        3 => "disassociated",
        4 => "sync lost",
        5 => "coordinator realignment",
        6 => "coordinator started",
        _ => "unknown",
    }
}

pub fn transmit_status_name(status: u8) -> &'static str {
    match status {
        0 => "delivered",
        1 => "no acknowledgement",
        2 => "CCA failure",
        3 => "purged",
        _ => "unknown",
    }
}

fn print_data(data: &[u8]) {
    if let Ok(s) = std::str::from_utf8(data) {
        if s.chars().all(|c| !c.is_control() || c == '\r' || c == '\n') {
            println!("    {:?}", s);
            return;
        }
    }
    for line in hexdump::hexdump_iter(data) {
        println!("    {}", line);
    }
}

impl MonitorOpts {
    pub fn run(&self) -> anyhow::Result<()> {
        let mut client = self.trace.wrap(self.port.client()?)?;

        loop {
            let mut frame = [0u8; xb1lib::protocol::MAX_FRAME_SIZE];
            match client.read_response(&mut frame) {
                Ok(Some(response)) => print_response(&response),
                Ok(None) => std::thread::sleep(Duration::from_millis(20)),
                Err(xb1lib::Error::Parse(e)) => eprintln!("skipping frame: {}", e),
                Err(xb1lib::Error::Io(e)) => return Err(e.into()),
            }
        }
    }
}

fn print_response(response: &Response<&[u8]>) {
    match response {
        Response::ModemStatus(m) => {
            println!(
                "modem status: {} ({:#04x})",
                modem_status_name(m.status),
                m.status
            );
        }
        Response::TransmitStatus(m) => {
            println!(
                "transmit status for frame {}: {} ({:#04x})",
                m.frame_id,
                transmit_status_name(m.status),
                m.status
            );
        }
        Response::AtResponse(m) => {
            println!(
                "AT {} response (frame {}, status {:#04x})",
                m.at_command.escape_ascii(),
                m.frame_id,
                m.status
            );
            if !m.data.is_empty() {
                print_data(m.data);
            }
        }
        Response::RemoteAtResponse(m) => {
            println!(
                "remote AT {} response from {:#018x}/{:#06x} (frame {}, status {:#04x})",
                m.at_command.escape_ascii(),
                m.responder_address,
                m.responder_network_address,
                m.frame_id,
                m.status
            );
            if !m.data.is_empty() {
                print_data(m.data);
            }
        }
        Response::Receive64(m) => {
            println!(
                "packet from {:#018x} (rssi -{} dBm, options {:#04x}):",
                m.source_address, m.rssi, m.options
            );
            print_data(m.data);
        }
        Response::Receive16(m) => {
            println!(
                "packet from {:#06x} (rssi -{} dBm, options {:#04x}):",
                m.source_address, m.rssi, m.options
            );
            print_data(m.data);
        }
    }
}
