//! Protocol layer codecs for wirepack
//!
//! One module per protocol, each implementing the
//! [`Packet`](wirepack_core::Packet) capability set, plus the [`layers`]
//! module that composes, packs and unpacks whole chains
//! (e.g. ethernet -> ipv4 -> udp).
//!
//! # Quick start
//!
//! Build and encode an ARP probe:
//!
//! ```
//! use wirepack_packet::{arp, ethernet, layers};
//! use wirepack_core::MacAddr;
//!
//! let mut eth = ethernet::Ethernet::default();
//! eth.src_addr = "4c:72:b9:54:e5:3d".parse().unwrap();
//! eth.dst_addr = MacAddr::broadcast();
//!
//! let mut req = arp::Arp::default();
//! req.hw_src = eth.src_addr;
//! req.proto_src = "192.168.1.135".parse().unwrap();
//! req.proto_dst = "192.168.1.254".parse().unwrap();
//!
//! let (_chain, bytes) = layers::pack(vec![Box::new(eth), Box::new(req)]).unwrap();
//! assert_eq!(bytes.len(), 42);
//! ```
//!
//! Decode an unknown frame:
//!
//! ```no_run
//! use wirepack_core::Type;
//! use wirepack_packet::layers;
//!
//! # let raw: Vec<u8> = vec![];
//! let chain = layers::unpack_all(&raw, Type::Eth).unwrap();
//! println!("{}", chain);
//! ```

pub mod arp;
pub mod ethernet;
pub mod icmpv4;
pub mod icmpv6;
pub mod ipv4;
pub mod ipv6;
pub mod layers;
pub mod llc;
pub mod radiotap;
pub mod raw;
pub mod sll;
pub mod snap;
pub mod tcp;
pub mod udp;
pub mod vlan;

mod wire;
