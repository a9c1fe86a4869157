use bacwire_transport::{
    ApduHandler, BvlcHandler, Connection, ConnectionConfig, MessageNexus, NexusConfig, NpduHandler,
};
use clap::Parser;
use log::info;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Print every BACnet message heard on the wire until interrupted.
#[derive(Parser, Debug)]
#[command(name = "bacwire-listen")]
struct Args {
    /// Interface address to bind and compute the broadcast address from.
    #[arg(long)]
    ip: Ipv4Addr,
    #[arg(long, default_value_t = 24)]
    prefix_len: u8,
    /// Bitmask over BVLC function codes.
    #[arg(long, default_value_t = 0xFF)]
    bvlc_filter: u8,
    /// Bitmask over network-layer message types.
    #[arg(long, default_value_t = 0xFF)]
    npdu_filter: u8,
    /// Bitmask over unconfirmed service ids.
    #[arg(long, default_value_t = 0xFF)]
    apdu_filter: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let nexus = Arc::new(MessageNexus::new(NexusConfig::default()));
    nexus.start()?;

    let (bvlc_handler, mut bvlc_rx) = BvlcHandler::channel(16);
    let (npdu_handler, mut npdu_rx) = NpduHandler::channel(16);
    let (apdu_handler, mut apdu_rx) = ApduHandler::channel(16);
    nexus.register_bvlc_handler(args.bvlc_filter, &bvlc_handler);
    nexus.register_npdu_handler(args.npdu_filter, &npdu_handler);
    nexus.register_apdu_handler(args.apdu_filter, &apdu_handler);

    let mut connection = Connection::connect(ConnectionConfig::new(args.ip, args.prefix_len)).await?;
    connection.set_router(Arc::clone(&nexus));
    connection.start()?;
    info!("listening on {}", connection.local_addr()?);

    loop {
        tokio::select! {
            Some(frame) = bvlc_rx.recv() => {
                info!("bvlc frame {:?} ({} bytes)", frame.function, frame.data.len());
            }
            Some(npdu) = npdu_rx.recv() => {
                info!("npdu priority {:?} content {:?}", npdu.priority, npdu.content);
            }
            Some(request) = apdu_rx.recv() => {
                info!("apdu {:?} parameters {:?}", request.service, request.parameters);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    connection.stop().await;
    nexus.stop().await;
    Ok(())
}
