#![forbid(unsafe_code)]

use std::io::{self, Write};

use clap::Parser;
use tokio::net::TcpStream;

use galecache_common::{DEFAULT_HOST, DEFAULT_PORT};
use galecache_protocol::{Connection, Frame};

#[derive(Parser, Debug)]
#[command(name = "galecache-cli", about = "Cliente interativo do GaleCache")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Comando para executar diretamente (modo não interativo)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let stream = TcpStream::connect(&addr).await?;
    let mut conn = Connection::new(stream);

    // Modo comando único (via argumentos)
    if !args.command.is_empty() {
        let tokens: Vec<&str> = args.command.iter().map(|s| s.as_str()).collect();
        let response = conn.round_trip(&Frame::array_from_strs(&tokens)).await?;
        println!("{}", format_frame(&response, 0));
        return Ok(());
    }

    println!("Conectado a {addr}");
    println!("Comandos: CREATE <key> <ttl> | APPEND <key> <msg> | READ <key> | STATS | PING");

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("galecache> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }

        let refs: Vec<&str> = tokens.iter().map(|s| s.as_str()).collect();
        match conn.round_trip(&Frame::array_from_strs(&refs)).await {
            Ok(response) => println!("{}", format_frame(&response, 0)),
            Err(e) => {
                println!("(error) {e}");
                break;
            }
        }
    }

    Ok(())
}

/// Tokeniza a linha de input com suporte a strings quoted.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut quote_char = '"';
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quote {
            if c == quote_char {
                in_quote = false;
            } else if c == '\\' {
                if let Some(&next) = chars.peek() {
                    match next {
                        'n' => {
                            current.push('\n');
                            chars.next();
                        }
                        't' => {
                            current.push('\t');
                            chars.next();
                        }
                        '\\' => {
                            current.push('\\');
                            chars.next();
                        }
                        '"' => {
                            current.push('"');
                            chars.next();
                        }
                        '\'' => {
                            current.push('\'');
                            chars.next();
                        }
                        _ => current.push(c),
                    }
                }
            } else {
                current.push(c);
            }
        } else if c == '"' || c == '\'' {
            in_quote = true;
            quote_char = c;
        } else if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Formata um frame para exibição humana.
fn format_frame(frame: &Frame, indent: usize) -> String {
    let pad = " ".repeat(indent);
    match frame {
        Frame::Simple(s) => format!("{pad}\"{s}\""),
        Frame::Error(s) => format!("{pad}(error) {s}"),
        Frame::Integer(n) => format!("{pad}(integer) {n}"),
        Frame::Bulk(data) => match std::str::from_utf8(data) {
            Ok(s) => format!("{pad}\"{s}\""),
            Err(_) => format!("{pad}(binary) {} bytes", data.len()),
        },
        Frame::Null => format!("{pad}(nil)"),
        Frame::Array(frames) => {
            if frames.is_empty() {
                return format!("{pad}(empty array)");
            }
            let mut lines = Vec::new();
            for (i, f) in frames.iter().enumerate() {
                lines.push(format!("{pad}{}) {}", i + 1, format_frame(f, 0)));
            }
            lines.join("\n")
        }
    }
}
