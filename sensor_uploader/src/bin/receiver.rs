use anyhow::Result;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;

use sensor_uploader::logger;
use sensor_uploader::receiver::{self, ReceiverState, SUBMIT_PATH};

#[derive(Parser, Debug)]
#[command(name = "receiver")]
#[command(about = "Reference endpoint that decodes and logs uploaded sample batches")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Port to serve on
    #[arg(long, default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger();
    let args = Args::parse();

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = TcpListener::bind(addr).await?;
    log::info!("Receiver listening on http://{}{}", addr, SUBMIT_PATH);

    receiver::serve(listener, ReceiverState::new()).await?;
    Ok(())
}
