//! Sends an AT command to a serial device and prints the response.
//!
//! ```text
//! cargo run --example at_command -- --device /dev/pts/1 --options baud=38400
//! ```

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use serial_line::{Options, SerialPort};

#[derive(Parser, Debug)]
#[command(about = "Write an AT command to a serial device and print the response")]
struct Args {
    /// Serial device path
    #[arg(short, long, default_value = "/dev/pts/1")]
    device: PathBuf,

    /// Line options, e.g. baud=38400,bits=8,stop=1,parity=0
    #[arg(short, long, default_value = "baud=38400,bits=8,stop=1,parity=0")]
    options: Options,

    /// Command to send; a carriage return is appended
    #[arg(short, long, default_value = "AT RV")]
    command: String,

    /// Settle delay after the write, in microseconds
    #[arg(long, default_value_t = 200_000)]
    delay_us: u64,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    if let Err(err) = interact(&args) {
        eprintln!("error: {}", err);

        if err.is_validation() {
            eprintln!("valid options: baud, bits (5-8), stop (1-2), parity (0 none, 1 odd, 2 even)");
            process::exit(2);
        }
        process::exit(1);
    }
}

fn interact(args: &Args) -> serial_line::Result<()> {
    let mut port = SerialPort::open(&args.device)?;
    port.apply_configuration(&args.options)?;

    let command = format!("{}\r", args.command);
    let written = port.write_with(
        command.as_bytes(),
        serial_line::DEFAULT_LENGTH,
        Duration::from_micros(args.delay_us),
    )?;
    println!("wrote {} bytes", written);

    let response = port.read()?;
    println!("res: {}", String::from_utf8_lossy(&response));

    Ok(())
}
