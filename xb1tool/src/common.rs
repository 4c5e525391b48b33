use std::io::{Read, Write};
use std::time::Duration;

// for set_timeout on the boxed port
use serialport::SerialPort as _;

#[derive(clap::Args, Debug, Clone)]
pub struct SerialPortArgs {
    /// Serial device the module is attached to.
    #[arg(default_value_t = default_serial_port())]
    port: String,

    #[arg(short, long, default_value_t = xb1lib::protocol::BAUD_RATE)]
    baud: u32,

    /// Open the port as a plain file, for replaying captured traffic.
    #[arg(long)]
    plain_file: bool,

    /// Skip the configuration handshake; the module must already be
    /// in API mode 2.
    #[arg(long)]
    no_init: bool,
}

pub fn default_serial_port() -> String {
    if let Ok(infos) = serialport::available_ports() {
        for info in infos {
            // bluetooth pseudo-ports are never an attached radio
            if info.port_name.contains("Bluetooth") {
                continue;
            }

            return info.port_name;
        }
    }

    "/dev/ttyUSB0".to_owned()
}

#[derive(Debug)]
pub enum SerialPort {
    Serial(Box<dyn serialport::SerialPort>),
    File(std::fs::File),
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Serial(port) => port.read(buf),
            Self::File(port) => port.read(buf),
        }
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Serial(port) => port.write(buf),
            Self::File(port) => port.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Serial(port) => port.flush(),
            Self::File(port) => port.flush(),
        }
    }
}

impl SerialPortArgs {
    pub fn open(&self) -> anyhow::Result<SerialPort> {
        if self.plain_file {
            let port = std::fs::File::options()
                .read(true)
                .write(true)
                .open(&self.port)?;
            Ok(SerialPort::File(port))
        } else {
            let mut port = serialport::new(&self.port, self.baud)
                .flow_control(serialport::FlowControl::Hardware)
                .open()?;
            port.set_timeout(Duration::from_secs(1))?;
            Ok(SerialPort::Serial(port))
        }
    }

    /// Open the port and build a driver client around it.
    pub fn client(&self) -> anyhow::Result<xb1lib::Client<SerialPort>> {
        let port = self.open()?;
        if self.no_init || self.plain_file {
            Ok(xb1lib::Client::new(port))
        } else {
            Ok(xb1lib::Client::open(port)?)
        }
    }
}

/// Hexdump to stderr, each line prefixed.
pub fn ehexdump_prefix(prefix: &str, bytes: &[u8]) {
    for line in hexdump::hexdump_iter(bytes) {
        if prefix.is_empty() {
            eprintln!("{}", line);
        } else {
            eprintln!("{} {}", prefix, line);
        }
    }
}

/// Parse a string of hex digits into bytes. Spaces are allowed
/// between byte pairs.
pub fn parse_hex_bytes(s: &str) -> anyhow::Result<Vec<u8>> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    anyhow::ensure!(compact.len() % 2 == 0, "odd number of hex digits");

    let mut bytes = Vec::with_capacity(compact.len() / 2);
    for i in (0..compact.len()).step_by(2) {
        bytes.push(u8::from_str_radix(&compact[i..i + 2], 16)?);
    }
    Ok(bytes)
}

/// Parse a two-letter AT command name like "AP".
pub fn parse_at_name(s: &str) -> anyhow::Result<[u8; 2]> {
    let s = s.as_bytes();
    anyhow::ensure!(
        s.len() == 2 && s.iter().all(u8::is_ascii_alphanumeric),
        "AT command names are two letters, like ID or D7"
    );
    Ok([
        s[0].to_ascii_uppercase(),
        s[1].to_ascii_uppercase(),
    ])
}
