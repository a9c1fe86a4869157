use bacwire_core::apdu::Apdu;
use bacwire_core::encoding::reader::Reader;
use bacwire_core::npdu::{NpduContent, Priority};
use bacwire_core::services::{IAmRequest, WhoIsRequest};
use bacwire_transport::{Connection, ConnectionConfig, MessageNexus, NexusConfig, NpduHandler};
use clap::Parser;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Broadcast a WhoIs and print the IAm announcements heard in reply.
#[derive(Parser, Debug)]
#[command(name = "bacwire-whois")]
struct Args {
    /// Interface address to bind and compute the broadcast address from.
    #[arg(long)]
    ip: Ipv4Addr,
    #[arg(long, default_value_t = 24)]
    prefix_len: u8,
    #[arg(long, default_value_t = 3)]
    timeout_secs: u64,
    /// Low instance-range limit; requires --high.
    #[arg(long, requires = "high")]
    low: Option<u64>,
    /// High instance-range limit; requires --low.
    #[arg(long, requires = "low")]
    high: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let nexus = Arc::new(MessageNexus::new(NexusConfig::default()));
    nexus.start()?;

    // IAm replies ride in APDU-bearing NPDUs, which the nexus hands to
    // every NPDU handler.
    let (handler, mut rx) = NpduHandler::channel(16);
    nexus.register_npdu_handler(0xFF, &handler);

    let mut connection = Connection::connect(ConnectionConfig::new(args.ip, args.prefix_len)).await?;
    connection.set_router(Arc::clone(&nexus));
    connection.start()?;

    let request = WhoIsRequest {
        low_limit: args.low,
        high_limit: args.high,
    };
    connection
        .send_unconfirmed(Priority::Normal, &request.to_request()?)
        .await?;

    let deadline = Duration::from_secs(args.timeout_secs);
    let listen = async {
        while let Some(npdu) = rx.recv().await {
            let NpduContent::Application(bytes) = &npdu.content else {
                continue;
            };
            let Ok(Apdu::UnconfirmedRequest(request)) = Apdu::decode(&mut Reader::new(bytes))
            else {
                continue;
            };
            if let Ok(i_am) = IAmRequest::from_request(&request) {
                println!(
                    "device {} (type {}) vendor {} max-apdu {} segmentation {}",
                    i_am.device_id.instance(),
                    i_am.device_id.object_type(),
                    i_am.vendor_id,
                    i_am.max_apdu_length_accepted,
                    i_am.segmentation_supported,
                );
            }
        }
    };
    let _ = timeout(deadline, listen).await;

    connection.stop().await;
    nexus.stop().await;
    Ok(())
}
