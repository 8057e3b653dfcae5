//! Send/receive round trip through the dump-file source

use std::time::Duration;

use wirepack_capture::file::Handle;
use wirepack_core::packet::downcast;
use wirepack_core::{MacAddr, Packet, Type};
use wirepack_packet::{arp, ethernet, layers};

fn arp_request() -> Vec<Box<dyn Packet>> {
    let eth = Box::new(ethernet::Ethernet {
        src_addr: "4c:72:b9:54:e5:3d".parse().unwrap(),
        dst_addr: MacAddr::broadcast(),
        ..Default::default()
    });

    let req = Box::new(arp::Arp {
        hw_src: "4c:72:b9:54:e5:3d".parse().unwrap(),
        proto_src: "192.168.1.135".parse().unwrap(),
        proto_dst: "192.168.1.254".parse().unwrap(),
        ..Default::default()
    });

    vec![eth as Box<dyn Packet>, req as Box<dyn Packet>]
}

#[test]
fn send_then_recv_through_dump_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loop.pcap");

    let mut source = Handle::open(&path).unwrap();

    wirepack_net::send(&mut source, arp_request()).unwrap();

    // the injected frame comes back out of the record stream and decodes
    // into the same chain
    let pkt = wirepack_net::recv(&mut source).unwrap().unwrap();
    assert_eq!(pkt.packet_type(), Type::Eth);

    let req = downcast::<arp::Arp>(layers::find_layer(pkt.as_ref(), Type::Arp).unwrap()).unwrap();
    assert_eq!(req.proto_dst, "192.168.1.254".parse::<std::net::Ipv4Addr>().unwrap());

    assert!(wirepack_net::recv(&mut source).unwrap().is_none());
}

#[test]
fn send_recv_reports_no_answer_at_end_of_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noanswer.pcap");

    let mut source = Handle::open(&path).unwrap();

    // the only frame in the file is our own request, which does not answer
    // itself; the stream then ends
    let result = wirepack_net::send_recv(&mut source, Duration::ZERO, arp_request()).unwrap();
    assert!(result.is_none());
}
