use bacwire_core::apdu::UnconfirmedService;
use bacwire_core::encoding::value::ParamValue;
use bacwire_core::encoding::writer::Writer;
use bacwire_core::npdu::{message_type, Npdu, NpduContent, Priority};
use bacwire_core::services::WhoIsRequest;
use bacwire_datalink::{BvlcFrame, BvlcFunction};
use bacwire_transport::{
    ApduHandler, Connection, ConnectionConfig, MessageNexus, NexusConfig, NpduHandler,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

const WHO_IS_FILTER: u8 = UnconfirmedService::WhoIs as u8;

fn who_is_npdu_bytes() -> Vec<u8> {
    let mut apdu = [0u8; 16];
    let mut w = Writer::new(&mut apdu);
    WhoIsRequest::range(0, 999).encode(&mut w).unwrap();
    let npdu = Npdu::application(Priority::Normal, w.as_written().to_vec());

    let mut buf = [0u8; 32];
    let mut w = Writer::new(&mut buf);
    npdu.encode(&mut w).unwrap();
    w.as_written().to_vec()
}

async fn loopback_connection(router: Arc<MessageNexus>) -> Connection {
    let mut connection =
        Connection::connect(ConnectionConfig::new(Ipv4Addr::LOCALHOST, 32).with_port(0))
            .await
            .unwrap();
    connection.set_router(router);
    connection
}

#[test]
fn bvlc_wraps_who_is_fixture() {
    let frame = BvlcFrame::new(BvlcFunction::OriginalBroadcastNpdu, who_is_npdu_bytes());
    assert_eq!(
        frame.to_vec().unwrap(),
        [0x81, 0x0B, 0x00, 0x0D, 0x01, 0x00, 0x10, 0x08, 0x09, 0x00, 0x1A, 0x03, 0xE7]
    );
}

#[tokio::test]
async fn padded_datagram_reaches_the_apdu_handler() {
    let nexus = Arc::new(MessageNexus::new(NexusConfig::default()));
    nexus.start().unwrap();

    let (handler, mut rx) = ApduHandler::channel(4);
    nexus.register_apdu_handler(WHO_IS_FILTER, &handler);

    let connection = loopback_connection(Arc::clone(&nexus)).await;
    connection.start().unwrap();
    let target = connection.local_addr().unwrap();

    // globally broadcast WhoIs over the full instance range, padded with
    // five trailing zero bytes
    let datagram = [
        0x81, 0x0B, 0x00, 0x14, 0x01, 0x20, 0xFF, 0xFF, 0x00, 0xFF, 0x10, 0x08, 0x0B, 0x3F, 0xFF,
        0xFF, 0x1B, 0x3F, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(&datagram, target).await.unwrap();

    let request = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("handler should hear the WhoIs")
        .unwrap();
    assert_eq!(request.service, UnconfirmedService::WhoIs);
    assert_eq!(request.parameters[0].value, ParamValue::Unsigned(0x3F_FFFF));
    assert_eq!(request.parameters[1].value, ParamValue::Unsigned(0x3F_FFFF));

    connection.stop().await;
    nexus.stop().await;
}

#[tokio::test]
async fn malformed_datagrams_are_discarded_without_killing_dispatch() {
    let nexus = Arc::new(MessageNexus::new(NexusConfig::default()));
    nexus.start().unwrap();

    let (handler, mut rx) = ApduHandler::channel(4);
    nexus.register_apdu_handler(WHO_IS_FILTER, &handler);

    let connection = loopback_connection(Arc::clone(&nexus)).await;
    connection.start().unwrap();
    let target = connection.local_addr().unwrap();

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    // wrong BVLC type byte, then garbage, then a valid WhoIs frame
    sender.send_to(&[0x99, 0x0B, 0x00, 0x04], target).await.unwrap();
    sender.send_to(&[0xFF], target).await.unwrap();
    let frame = BvlcFrame::new(BvlcFunction::OriginalBroadcastNpdu, who_is_npdu_bytes());
    sender
        .send_to(&frame.to_vec().unwrap(), target)
        .await
        .unwrap();

    let request = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("valid frame should still get through")
        .unwrap();
    assert_eq!(request.service, UnconfirmedService::WhoIs);

    connection.stop().await;
    nexus.stop().await;
}

#[tokio::test]
async fn send_unconfirmed_loops_back_to_own_handler() {
    let nexus = Arc::new(MessageNexus::new(NexusConfig::default()));
    nexus.start().unwrap();

    let (handler, mut rx) = ApduHandler::channel(4);
    nexus.register_apdu_handler(WHO_IS_FILTER, &handler);

    // a /32 prefix makes the broadcast address the interface itself, so the
    // connection hears its own broadcast
    let connection = loopback_connection(Arc::clone(&nexus)).await;
    connection.start().unwrap();

    let request = WhoIsRequest::range(0, 999).to_request().unwrap();
    connection
        .send_unconfirmed(Priority::Normal, &request)
        .await
        .unwrap();

    let heard = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("own broadcast should loop back")
        .unwrap();
    assert_eq!(WhoIsRequest::from_request(&heard).unwrap(), WhoIsRequest::range(0, 999));

    connection.stop().await;
    nexus.stop().await;
}

#[tokio::test]
async fn network_messages_reach_filtered_npdu_handlers() {
    let nexus = Arc::new(MessageNexus::new(NexusConfig::default()));
    nexus.start().unwrap();

    let (handler, mut rx) = NpduHandler::channel(4);
    nexus.register_npdu_handler(message_type::I_AM_ROUTER_TO_NETWORK, &handler);

    let connection = loopback_connection(Arc::clone(&nexus)).await;
    connection.start().unwrap();

    connection
        .send_network_message(Priority::Normal, message_type::I_AM_ROUTER_TO_NETWORK, None)
        .await
        .unwrap();

    let npdu = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("network message should be dispatched")
        .unwrap();
    assert_eq!(
        npdu.content,
        NpduContent::Network {
            message_type: message_type::I_AM_ROUTER_TO_NETWORK,
            vendor_id: None
        }
    );

    connection.stop().await;
    nexus.stop().await;
}
