//! Lodestone CLI Client
//!
//! Interactive REPL for a running Lodestone server. One command per line:
//!
//! ```text
//! get <key>
//! set <key> <value>
//! del <key>
//! lst
//! exit
//! ```
//!
//! Uses a single TCP stream for sequential write-then-read, the same
//! pattern as Redis clients: each command is framed, sent, and its response
//! read back before the next prompt.

use std::io::{self, BufRead, Write};
use std::net::TcpStream;

use clap::Parser;
use lodestone::protocol::{read_response, write_request, Request, Response};

/// Lodestone CLI
#[derive(Parser, Debug)]
#[command(name = "lodestone-cli")]
#[command(about = "Interactive client for the Lodestone key-value store")]
#[command(version)]
struct Args {
    /// Server address (host:port)
    server: String,
}

fn main() {
    let args = Args::parse();

    let mut stream = match TcpStream::connect(&args.server) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    // immediate sends; the REPL is strictly request/response
    let _ = stream.set_nodelay(true);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}> ", args.server);
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Failed to read input: {}", e);
                break;
            }
            None => break,
        };

        let request = match parse_line(&line) {
            ParsedLine::Request(request) => request,
            ParsedLine::Empty => continue,
            ParsedLine::Exit => break,
            ParsedLine::Unrecognized => {
                eprintln!("commands: get <key> | set <key> <value> | del <key> | lst | exit");
                continue;
            }
        };

        if let Err(e) = write_request(&mut stream, &request) {
            eprintln!("Failed to send request: {}", e);
            std::process::exit(1);
        }

        match read_response(&mut stream) {
            Ok(response) => print_response(&response),
            Err(e) => {
                eprintln!("Failed to read response: {}", e);
                std::process::exit(1);
            }
        }
    }
}

enum ParsedLine {
    Request(Request),
    Empty,
    Exit,
    Unrecognized,
}

fn parse_line(line: &str) -> ParsedLine {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [] => ParsedLine::Empty,
        ["exit"] => ParsedLine::Exit,
        ["get", key] => ParsedLine::Request(Request::Get {
            key: key.as_bytes().to_vec(),
        }),
        ["set", key, value] => ParsedLine::Request(Request::Set {
            key: key.as_bytes().to_vec(),
            value: value.as_bytes().to_vec(),
        }),
        ["del", key] => ParsedLine::Request(Request::Delete {
            key: key.as_bytes().to_vec(),
        }),
        ["lst"] => ParsedLine::Request(Request::List),
        _ => ParsedLine::Unrecognized,
    }
}

fn print_response(response: &Response) {
    match response {
        Response::Get { value, .. } => match value {
            Some(value) => println!("{}", String::from_utf8_lossy(value)),
            None => println!("(nil)"),
        },
        Response::Set { .. } => println!("OK"),
        Response::Delete { .. } => println!("OK"),
        Response::List { entries } => {
            for (key, value) in entries {
                println!(
                    "{} {}",
                    String::from_utf8_lossy(key),
                    String::from_utf8_lossy(value)
                );
            }
            println!("({} entries)", entries.len());
        }
        Response::Unknown { raw } => {
            println!("(server) {}", String::from_utf8_lossy(raw));
        }
    }
}
