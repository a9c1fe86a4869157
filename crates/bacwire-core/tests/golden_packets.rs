use bacwire_core::apdu::{Apdu, UnconfirmedRequest, UnconfirmedService};
use bacwire_core::encoding::primitives::byte_size;
use bacwire_core::encoding::reader::Reader;
use bacwire_core::encoding::value::ParamValue;
use bacwire_core::encoding::writer::Writer;
use bacwire_core::npdu::{Npdu, NpduAddress, NpduContent, Priority};
use bacwire_core::services::WhoIsRequest;

#[test]
fn unsigned_381_matches_fixture() {
    let mut buf = [0u8; 4];
    let mut w = Writer::new(&mut buf);
    w.write_unsigned(381, byte_size(381)).unwrap();
    assert_eq!(w.as_written(), &[0x01, 0x7D]);

    let mut r = Reader::new(&[0x01, 0x7D]);
    assert_eq!(r.read_unsigned(2).unwrap(), 381);
}

#[test]
fn who_is_npdu_frame_matches_fixture() {
    let mut apdu = [0u8; 16];
    let mut w = Writer::new(&mut apdu);
    WhoIsRequest::range(0, 999).encode(&mut w).unwrap();
    let npdu = Npdu::application(Priority::Normal, w.as_written().to_vec());

    let mut buf = [0u8; 32];
    let mut w = Writer::new(&mut buf);
    npdu.encode(&mut w).unwrap();
    assert_eq!(
        w.as_written(),
        &[0x01, 0x00, 0x10, 0x08, 0x09, 0x00, 0x1A, 0x03, 0xE7]
    );

    let mut r = Reader::new(w.as_written());
    let decoded = Npdu::decode(&mut r).unwrap();
    assert_eq!(decoded, npdu);
}

#[test]
fn globally_broadcast_who_is_decodes() {
    // destination 0xFFFF/broadcast, hop count 0xFF, WhoIs over the full
    // instance range
    let bytes = [
        0x01, 0x20, 0xFF, 0xFF, 0x00, 0xFF, 0x10, 0x08, 0x0B, 0x3F, 0xFF, 0xFF, 0x1B, 0x3F, 0xFF,
        0xFF,
    ];
    let mut r = Reader::new(&bytes);
    let npdu = Npdu::decode(&mut r).unwrap();

    let destination = npdu.destination.unwrap();
    assert_eq!(destination.network, NpduAddress::GLOBAL_BROADCAST_NETWORK);
    assert!(destination.is_broadcast());
    assert_eq!(npdu.hop_count, Some(0xFF));

    let apdu_bytes = match &npdu.content {
        NpduContent::Application(bytes) => bytes.clone(),
        other => panic!("expected an APDU, got {other:?}"),
    };
    let mut r = Reader::new(&apdu_bytes);
    let apdu = Apdu::decode(&mut r).unwrap();
    let request = match apdu {
        Apdu::UnconfirmedRequest(request) => request,
        other => panic!("expected an unconfirmed request, got {other:?}"),
    };
    assert_eq!(request.service, UnconfirmedService::WhoIs);
    assert_eq!(request.parameters.len(), 2);
    assert_eq!(request.parameters[0].value, ParamValue::Unsigned(0x3F_FFFF));
    assert_eq!(request.parameters[1].value, ParamValue::Unsigned(0x3F_FFFF));
}

#[test]
fn who_is_request_recovered_from_decoded_apdu() {
    let mut r = Reader::new(&[0x10, 0x08, 0x09, 0x00, 0x1A, 0x03, 0xE7]);
    let request = UnconfirmedRequest::decode(&mut r).unwrap();
    assert_eq!(
        WhoIsRequest::from_request(&request).unwrap(),
        WhoIsRequest::range(0, 999)
    );
}
