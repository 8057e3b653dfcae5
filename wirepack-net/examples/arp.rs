//! Build an ARP probe and hex-dump the encoded frame.

use wirepack_core::{MacAddr, Packet};
use wirepack_packet::{arp, ethernet, layers};

fn main() {
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

    let (chain, raw_pkt) =
        layers::pack(vec![eth as Box<dyn Packet>, req as Box<dyn Packet>]).unwrap();

    println!("{chain}");

    for (i, byte) in raw_pkt.iter().enumerate() {
        if i % 16 == 0 {
            print!("{i:04x}  ");
        }
        print!("{byte:02x} ");
        if i % 16 == 15 {
            println!();
        }
    }
    println!();
}
