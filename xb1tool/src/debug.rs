use std::io::{Read, Write};

use xb1lib::protocol::serialize::SerializerWrap;
use xb1lib::protocol::{MessageSerialize, Response};

#[derive(clap::Args, Debug, Clone)]
pub struct TraceArgs {
    /// Print decoded frames; repeat for payload dumps, again for raw
    /// wire bytes and the receive window.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Append the raw bytes of every outgoing frame to this file.
    #[arg(long)]
    dump: Option<String>,
}

/// A client wrapper that narrates traffic on stderr.
pub struct TraceClient<F> {
    args: TraceArgs,
    client: xb1lib::Client<F>,
    dump: Option<std::fs::File>,
}

impl TraceArgs {
    pub fn wrap<F>(&self, client: xb1lib::Client<F>) -> anyhow::Result<TraceClient<F>> {
        let mut dump = None;
        if let Some(ref path) = self.dump {
            dump = Some(
                std::fs::File::options()
                    .create(true)
                    .append(true)
                    .open(path)?,
            );
        }

        Ok(TraceClient {
            args: self.clone(),
            client,
            dump,
        })
    }
}

impl<F> TraceClient<F> {
    /// Write a frame to the port, narrating per the debug level.
    pub fn write<M>(&mut self, msg: &M) -> anyhow::Result<()>
    where
        F: Write,
        M: MessageSerialize + std::fmt::Debug,
    {
        if self.args.debug >= 3 || self.dump.is_some() {
            // render the frame again off to the side to show it raw
            let mut wire = Vec::new();
            xb1lib::protocol::serialize(&mut wire, msg)?;

            if let Some(ref mut dump) = self.dump {
                dump.write_all(&wire)?;
            }

            if self.args.debug >= 3 {
                eprintln!(">>> raw frame:");
                crate::common::ehexdump_prefix(">>>   ", &wire);
            }
        }

        if self.args.debug >= 2 {
            // the payload before escaping and framing
            let mut ser = SerializerWrap::new(Vec::new());
            msg.frame_body(&mut ser)?;
            eprintln!(">>> payload:");
            crate::common::ehexdump_prefix(">>>   ", &ser.done());
        }

        if self.args.debug >= 1 {
            eprintln!(">>> {:?}", msg);
        }

        self.client.write(msg)?;
        Ok(())
    }

    /// Receive and parse one response, narrating per the debug level.
    pub fn read_response<'a>(
        &mut self,
        out: &'a mut [u8],
    ) -> Result<Option<Response<&'a [u8]>>, xb1lib::Error>
    where
        F: Read,
    {
        let length = self.client.recv_frame(out)?;

        if self.args.debug >= 3 {
            // still-escaped bytes left buffered after this attempt,
            // e.g. the front of a frame that has not fully arrived
            let window: Vec<u8> = self.client.recv_window().collect();
            if !window.is_empty() {
                eprintln!("<<< receive window ({} bytes):", window.len());
                crate::common::ehexdump_prefix("<<<   ", &window);
            }
        }

        if length == 0 {
            return Ok(None);
        }

        let payload = &out[..length];
        if self.args.debug >= 2 {
            eprintln!("<<< payload:");
            crate::common::ehexdump_prefix("<<<   ", payload);
        }

        match xb1lib::protocol::parse_frame(payload) {
            Ok(response) => {
                if self.args.debug >= 1 {
                    eprintln!("<<< {:?}", response);
                }
                Ok(Some(response))
            }
            Err(e) => {
                if self.args.debug >= 1 {
                    eprintln!("!!! {}", e);
                    crate::common::ehexdump_prefix("!!!   ", payload);
                }
                Err(e.into())
            }
        }
    }
}
