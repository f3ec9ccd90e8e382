use clap::Parser;
use log::{error, info};
use parques_client::input::{parse_command, prompt, Command, HELP};
use parques_client::network::ParquesClient;
use parques_client::rendering::render_response;
use parques_shared::DEFAULT_PORT;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to (asked for when omitted)
    #[arg(short = 's', long)]
    server: Option<String>,

    /// Server port (asked for when omitted)
    #[arg(short = 'p', long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let (host, port) = {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        let host = match args.server {
            Some(host) => host,
            None => prompt(&mut input, &mut output, "Server", "127.0.0.1")?,
        };
        let port = match args.port {
            Some(port) => port,
            None => {
                let raw = prompt(&mut input, &mut output, "Port", &DEFAULT_PORT.to_string())?;
                raw.parse().unwrap_or(DEFAULT_PORT)
            }
        };
        (host, port)
    };

    let address = format!("{}:{}", host, port);
    info!("Connecting to: {}", address);
    let mut client = ParquesClient::connect(&address).await?;
    println!("Connected to {}. Type `help` for commands.", address);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let request = match parse_command(&line) {
            Ok(Command::Send(request)) => request,
            Ok(Command::Help) => {
                println!("{}", HELP);
                continue;
            }
            Ok(Command::Quit) => break,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match client.request(&request).await {
            Ok(response) => print!("{}", render_response(&response)),
            Err(e) => {
                error!("Request failed: {}", e);
                break;
            }
        }
    }

    Ok(())
}
