use clap::Parser;
use client::network::Client;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address or host name
    server_ip: String,

    /// Server TCP port
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    info!("Connecting to {}:{}", args.server_ip, args.port);
    let client = Client::connect(&args.server_ip, args.port).await?;
    println!("Connected to server {}", client.server_addr());

    client.run().await
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));
    // Stdin is read on a blocking thread; shutting down does not wait for it.
    runtime.shutdown_background();

    result
}
