//! DriftKV CLI Client
//!
//! Command-line interface for interacting with DriftKV.

use std::io::{BufReader, Write};
use std::net::TcpStream;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use driftkv::protocol::{encode_request, read_response, Command, Response};

/// DriftKV CLI
#[derive(Parser, Debug)]
#[command(name = "driftkv-cli")]
#[command(about = "CLI for the DriftKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:56379")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Get { key } => Command::Get { key: key.into_bytes() },
            Commands::Set { key, value } => Command::Set {
                key: key.into_bytes(),
                value: value.into_bytes(),
            },
            Commands::Del { key } => Command::Del { key: key.into_bytes() },
            Commands::Ping => Command::Ping,
        }
    }
}

fn run(server: &str, command: Command) -> driftkv::Result<Response> {
    let mut stream = TcpStream::connect(server)?;
    stream.write_all(&encode_request(&command.to_args()))?;
    stream.flush()?;

    let mut reader = BufReader::new(stream);
    read_response(&mut reader)
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args.server, args.command.into()) {
        Ok(Response::Ok) => println!("OK"),
        Ok(Response::Pong) => println!("PONG"),
        Ok(Response::Bulk(value)) => println!("{}", String::from_utf8_lossy(&value)),
        Ok(Response::Nil) => println!("(nil)"),
        Ok(Response::Integer(n)) => println!("(integer) {}", n),
        Ok(Response::Error(message)) => {
            eprintln!("(error) {}", message);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Could not reach {}: {}", args.server, e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
