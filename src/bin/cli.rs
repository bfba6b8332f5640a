//! TimberKV CLI Client
//!
//! Command-line interface for interacting with TimberKV. Without a
//! subcommand it runs an interactive prompt that sends each line as a
//! request.

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use timberkv::client::Client;
use timberkv::protocol::Response;

/// TimberKV CLI
#[derive(Parser, Debug)]
#[command(name = "timberkv-cli")]
#[command(about = "CLI for TimberKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read a value by key
    Read {
        /// The key to read
        key: String,
    },

    /// Bind a key to a value
    Write {
        /// The key to write
        key: String,

        /// The value to write
        value: String,
    },

    /// Delete a key
    Delete {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Some(Commands::Read { key }) => client.read(&key).map(print_response),
        Some(Commands::Write { key, value }) => client.write(&key, &value).map(print_response),
        Some(Commands::Delete { key }) => client.delete(&key).map(print_response),
        Some(Commands::Ping) => client.ping().map(print_response),
        None => repl(&mut client),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_response(response: Response) {
    println!("{}", response);
}

/// Send stdin lines until `exit`, end of input, or the server says goodbye
fn repl(client: &mut Client) -> timberkv::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") {
            return Ok(());
        }

        let response = client.send_line(line)?;
        println!("Server said: {}", response);
        if response == Response::Bye {
            return Ok(());
        }
    }
}
