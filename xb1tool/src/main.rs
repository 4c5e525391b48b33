use clap::Parser;

mod at;
mod common;
mod debug;
mod monitor;
mod transmit;

#[derive(Parser, Debug)]
#[command(name = "xb1tool", about = "Talk to an XBee 802.15.4 module in API mode 2")]
struct Tool {
    #[command(subcommand)]
    command: ToolCommand,
}

#[derive(clap::Subcommand, Debug)]
enum ToolCommand {
    /// Decode and print every frame arriving from the module.
    Monitor(monitor::MonitorOpts),
    /// Send one AT command and print its response.
    At(at::AtOpts),
    /// Transmit a payload to another module and wait for the status.
    Transmit(transmit::TransmitOpts),
}

fn main() -> anyhow::Result<()> {
    match Tool::parse().command {
        ToolCommand::Monitor(o) => o.run(),
        ToolCommand::At(o) => o.run(),
        ToolCommand::Transmit(o) => o.run(),
    }
}
