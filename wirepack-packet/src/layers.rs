//! Chain composition: encoding and decoding whole stacks of layers
//!
//! Unlike the per-protocol codecs, which handle a single header each, this
//! module packs and unpacks complete chains (e.g. ethernet -> ipv4 -> udp),
//! propagating next-protocol tags, lengths and pseudo-header checksum seeds
//! across layers.

use wirepack_core::{Buffer, Error, Packet, Result, Type};

use crate::{arp, ethernet, icmpv4, icmpv6, ipv4, ipv6, llc, radiotap, raw, sll, snap, tcp, udp, vlan};

/// Compose the given layers into a chain, installing each layer as the
/// payload of the previous one. Installing a payload updates the enclosing
/// layer (next-protocol tag, lengths) and seeds transport checksums.
/// Returns the outermost layer, which owns the rest of the chain.
pub fn compose(layers: Vec<Box<dyn Packet>>) -> Result<Box<dyn Packet>> {
    let mut iter = layers.into_iter().rev();

    let mut chain = iter
        .next()
        .ok_or_else(|| Error::Compose("cannot compose an empty chain".into()))?;

    for mut outer in iter {
        outer.set_payload(chain)?;
        chain = outer;
    }

    Ok(chain)
}

/// Compose the layers and encode them into their binary form, calculating
/// checksums on the way. Returns the composed chain together with the bytes
/// so the caller can keep it for request/response correlation.
pub fn pack(layers: Vec<Box<dyn Packet>>) -> Result<(Box<dyn Packet>, Vec<u8>)> {
    let mut chain = compose(layers)?;
    let buf = pack_chain(chain.as_mut())?;

    Ok((chain, buf))
}

/// Encode an already-composed chain.
///
/// Layers are packed inside out: the innermost layer is encoded first, each
/// enclosing layer in front of it at `total - wire_len(layer)`. An outer
/// layer therefore sees the encoded bytes of everything it contains when it
/// computes its checksum.
pub fn pack_chain(chain: &mut dyn Packet) -> Result<Vec<u8>> {
    let total = chain.wire_len() as usize;
    let mut buf = Buffer::zeroed(total);

    pack_layer(chain, &mut buf, total)?;

    Ok(buf.into_vec())
}

fn pack_layer(pkt: &mut dyn Packet, buf: &mut Buffer, total: usize) -> Result<()> {
    if let Some(payload) = pkt.payload_mut() {
        pack_layer(payload, buf, total)?;
    }

    let start = total
        .checked_sub(pkt.wire_len() as usize)
        .ok_or_else(|| Error::Compose(format!("inconsistent {} layer length", pkt.packet_type())))?;

    buf.set_offset(start);
    buf.begin_layer();

    pkt.pack(buf).map_err(|e| Error::pack(pkt.packet_type(), e))
}

/// Decode the byte slice into the supplied layers, in order. This does not
/// check that the layer types match the raw data; when the types are
/// unknown, use [`unpack_all`] instead. Decoding stops early when the buffer
/// drains or a layer guesses no payload follows it.
pub fn unpack(raw_pkt: &[u8], layers: Vec<Box<dyn Packet>>) -> Result<Box<dyn Packet>> {
    let mut buf = Buffer::view(raw_pkt);
    let mut decoded: Vec<Box<dyn Packet>> = Vec::new();

    for mut pkt in layers {
        if buf.remaining() == 0 {
            break;
        }

        buf.begin_layer();
        pkt.unpack(&mut buf)
            .map_err(|e| Error::decode(pkt.packet_type(), e))?;

        let done = pkt.guess_payload_type() == Type::None;
        decoded.push(pkt);

        if done {
            break;
        }
    }

    chain_decoded(decoded)
}

/// Decode the byte slice into a chain of automatically chosen layers,
/// seeded with the link type of the packet source. Each decoded layer's
/// payload guess selects the next codec; unknown guesses fall back to raw
/// data.
pub fn unpack_all(raw_pkt: &[u8], link_type: Type) -> Result<Box<dyn Packet>> {
    let mut buf = Buffer::view(raw_pkt);
    let mut decoded: Vec<Box<dyn Packet>> = Vec::new();
    let mut tag = link_type;

    while buf.remaining() > 0 {
        let mut pkt = packet_for(tag);

        buf.begin_layer();
        pkt.unpack(&mut buf)
            .map_err(|e| Error::decode(pkt.packet_type(), e))?;

        tag = pkt.guess_payload_type();
        decoded.push(pkt);

        if tag == Type::None {
            break;
        }
    }

    chain_decoded(decoded)
}

fn chain_decoded(decoded: Vec<Box<dyn Packet>>) -> Result<Box<dyn Packet>> {
    let mut iter = decoded.into_iter().rev();

    let mut chain = iter
        .next()
        .ok_or_else(|| Error::Compose("no layers decoded".into()))?;

    for mut outer in iter {
        outer.link_payload(chain);
        chain = outer;
    }

    Ok(chain)
}

/// A fresh, default-initialized layer for the given tag. Tags without a
/// codec decode as raw data.
pub fn packet_for(tag: Type) -> Box<dyn Packet> {
    match tag {
        Type::Arp => Box::new(arp::Arp::default()),
        Type::Eth => Box::new(ethernet::Ethernet::default()),
        Type::Icmpv4 => Box::new(icmpv4::Icmpv4::default()),
        Type::Icmpv6 => Box::new(icmpv6::Icmpv6::default()),
        Type::Ipv4 => Box::new(ipv4::Ipv4::default()),
        Type::Ipv6 => Box::new(ipv6::Ipv6::default()),
        Type::Llc => Box::new(llc::Llc::default()),
        Type::RadioTap => Box::new(radiotap::RadioTap::default()),
        Type::Sll => Box::new(sll::Sll::default()),
        Type::Snap => Box::new(snap::Snap::default()),
        Type::Tcp => Box::new(tcp::Tcp::default()),
        Type::Udp => Box::new(udp::Udp::default()),
        Type::Vlan => Box::new(vlan::Vlan::default()),
        _ => Box::new(raw::Raw::default()),
    }
}

/// Walk the chain from the outermost layer inward and return the first
/// layer with the given tag.
pub fn find_layer<'a>(pkt: &'a dyn Packet, tag: Type) -> Option<&'a dyn Packet> {
    let mut cur = pkt;

    loop {
        if cur.packet_type() == tag {
            return Some(cur);
        }

        cur = cur.payload()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirepack_core::packet::downcast;
    use wirepack_core::MacAddr;

    const HWSRC: &str = "4c:72:b9:54:e5:3d";
    const HWDST: &str = "00:21:96:6e:f0:70";
    const IPSRC: &str = "192.168.1.135";
    const IPDST: &str = "193.27.208.37";

    const TEST_ETH_ARP: [u8; 42] = [
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x4c, 0x72, 0xb9, 0x54, 0xe5, 0x3d, 0x08, 0x06, 0x00,
        0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01, 0x4c, 0x72, 0xb9, 0x54, 0xe5, 0x3d, 0xc0, 0xa8,
        0x01, 0x87, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xc1, 0x1b, 0xd0, 0x25,
    ];

    fn eth_for(dst: MacAddr) -> Box<ethernet::Ethernet> {
        Box::new(ethernet::Ethernet {
            src_addr: HWSRC.parse().unwrap(),
            dst_addr: dst,
            ..Default::default()
        })
    }

    fn arp_probe() -> Box<arp::Arp> {
        Box::new(arp::Arp {
            hw_src: HWSRC.parse().unwrap(),
            proto_src: IPSRC.parse().unwrap(),
            proto_dst: IPDST.parse().unwrap(),
            ..Default::default()
        })
    }

    #[test]
    fn test_pack_eth_arp() {
        let (_, buf) = pack(vec![eth_for(MacAddr::broadcast()), arp_probe()]).unwrap();

        assert_eq!(buf, TEST_ETH_ARP);
    }

    #[test]
    fn test_unpack_eth_arp() {
        let chain = unpack(
            &TEST_ETH_ARP,
            vec![
                Box::<ethernet::Ethernet>::default(),
                Box::<arp::Arp>::default(),
            ],
        )
        .unwrap();

        assert_eq!(chain.packet_type(), Type::Eth);
        assert_eq!(chain.payload().unwrap().packet_type(), Type::Arp);
    }

    #[test]
    fn test_unpack_all_eth_arp() {
        let chain = unpack_all(&TEST_ETH_ARP, Type::Eth).unwrap();

        assert_eq!(chain.packet_type(), Type::Eth);

        let arp_layer = chain.payload().unwrap();
        assert_eq!(arp_layer.packet_type(), Type::Arp);
        assert!(arp_layer.equals(arp_probe().as_ref()));
    }

    const TEST_ETH_VLAN_ARP: [u8; 46] = [
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x4c, 0x72, 0xb9, 0x54, 0xe5, 0x3d, 0x81, 0x00, 0x00,
        0x87, 0x08, 0x06, 0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01, 0x4c, 0x72, 0xb9, 0x54,
        0xe5, 0x3d, 0xc0, 0xa8, 0x01, 0x87, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xc1, 0x1b, 0xd0,
        0x25,
    ];

    #[test]
    fn test_pack_eth_vlan_arp() {
        let tag = Box::new(vlan::Vlan {
            vlan: 135,
            ..Default::default()
        });

        let (_, buf) = pack(vec![eth_for(MacAddr::broadcast()), tag, arp_probe()]).unwrap();

        assert_eq!(buf, TEST_ETH_VLAN_ARP);
    }

    #[test]
    fn test_unpack_all_eth_vlan_arp() {
        let chain = unpack_all(&TEST_ETH_VLAN_ARP, Type::Eth).unwrap();

        let tags: Vec<Type> = layer_tags(chain.as_ref());
        assert_eq!(tags, vec![Type::Eth, Type::Vlan, Type::Arp]);

        let tag = downcast::<vlan::Vlan>(find_layer(chain.as_ref(), Type::Vlan).unwrap()).unwrap();
        assert_eq!(tag.vlan, 135);
    }

    const TEST_ETH_IPV4_UDP: [u8; 42] = [
        0x00, 0x21, 0x96, 0x6e, 0xf0, 0x70, 0x4c, 0x72, 0xb9, 0x54, 0xe5, 0x3d, 0x08, 0x00, 0x45,
        0x00, 0x00, 0x1c, 0x00, 0x01, 0x00, 0x00, 0x40, 0x11, 0x27, 0x60, 0xc0, 0xa8, 0x01, 0x87,
        0xc1, 0x1b, 0xd0, 0x25, 0xa2, 0x5a, 0x20, 0x92, 0x00, 0x08, 0xe9, 0x80,
    ];

    fn ipv4_for() -> Box<ipv4::Ipv4> {
        Box::new(ipv4::Ipv4 {
            src_addr: IPSRC.parse().unwrap(),
            dst_addr: IPDST.parse().unwrap(),
            ..Default::default()
        })
    }

    #[test]
    fn test_pack_eth_ipv4_udp() {
        let udp_seg = Box::new(udp::Udp {
            src_port: 41562,
            dst_port: 8338,
            ..Default::default()
        });

        let (chain, buf) =
            pack(vec![eth_for(HWDST.parse().unwrap()), ipv4_for(), udp_seg]).unwrap();

        assert_eq!(buf, TEST_ETH_IPV4_UDP);

        // the IPv4 header checksum lands at offset 24 of the frame
        assert_eq!(&buf[24..26], &[0x27, 0x60]);

        let ip = downcast::<ipv4::Ipv4>(find_layer(chain.as_ref(), Type::Ipv4).unwrap()).unwrap();
        assert_eq!(ip.checksum, 0x2760);
    }

    #[test]
    fn test_unpack_all_eth_ipv4_udp() {
        let chain = unpack_all(&TEST_ETH_IPV4_UDP, Type::Eth).unwrap();

        assert_eq!(layer_tags(chain.as_ref()), vec![Type::Eth, Type::Ipv4, Type::Udp]);
    }

    const TEST_ETH_IPV4_UDP_RAW: [u8; 80] = [
        0x00, 0x21, 0x96, 0x6e, 0xf0, 0x70, 0x4c, 0x72, 0xb9, 0x54, 0xe5, 0x3d, 0x08, 0x00, 0x45,
        0x00, 0x00, 0x42, 0x00, 0x01, 0x00, 0x00, 0x40, 0x11, 0x27, 0x3a, 0xc0, 0xa8, 0x01, 0x87,
        0xc1, 0x1b, 0xd0, 0x25, 0xa2, 0x5a, 0x20, 0x92, 0x00, 0x2e, 0x07, 0x03, 0x66, 0x64, 0x67,
        0x20, 0x61, 0x67, 0x66, 0x68, 0x20, 0x6c, 0x64, 0x66, 0x68, 0x67, 0x6b, 0x20, 0x68, 0x66,
        0x64, 0x6b, 0x67, 0x68, 0x20, 0x6b, 0x66, 0x6a, 0x64, 0x68, 0x73, 0x67, 0x20, 0x6b, 0x73,
        0x68, 0x66, 0x64, 0x67, 0x6b,
    ];

    #[test]
    fn test_pack_eth_ipv4_udp_raw() {
        let udp_seg = Box::new(udp::Udp {
            src_port: 41562,
            dst_port: 8338,
            ..Default::default()
        });
        let data = Box::new(raw::Raw::new(b"fdg agfh ldfhgk hfdkgh kfjdhsg kshfdgk".to_vec()));

        let (chain, buf) = pack(vec![
            eth_for(HWDST.parse().unwrap()),
            ipv4_for(),
            udp_seg,
            data,
        ])
        .unwrap();

        assert_eq!(buf.len(), 80);
        assert_eq!(buf, TEST_ETH_IPV4_UDP_RAW);

        let ip = find_layer(chain.as_ref(), Type::Ipv4).unwrap();
        assert_eq!(ip.wire_len(), 66);

        let udp_layer = find_layer(chain.as_ref(), Type::Udp).unwrap();
        assert_eq!(udp_layer.wire_len(), 46);
    }

    const TEST_ETH_IPV4_TCP: [u8; 54] = [
        0x00, 0x21, 0x96, 0x6e, 0xf0, 0x70, 0x4c, 0x72, 0xb9, 0x54, 0xe5, 0x3d, 0x08, 0x00, 0x45,
        0x00, 0x00, 0x28, 0x00, 0x01, 0x00, 0x00, 0x40, 0x06, 0x27, 0x5f, 0xc0, 0xa8, 0x01, 0x87,
        0xc1, 0x1b, 0xd0, 0x25, 0xa2, 0x5a, 0x20, 0x92, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x50, 0x02, 0x20, 0x00, 0x79, 0x85, 0x00, 0x00,
    ];

    fn tcp_syn() -> Box<tcp::Tcp> {
        Box::new(tcp::Tcp {
            src_port: 41562,
            dst_port: 8338,
            flags: tcp::Flags::SYN,
            window: 8192,
            ..Default::default()
        })
    }

    #[test]
    fn test_pack_eth_ipv4_tcp() {
        let (chain, buf) = pack(vec![eth_for(HWDST.parse().unwrap()), ipv4_for(), tcp_syn()]).unwrap();

        assert_eq!(buf, TEST_ETH_IPV4_TCP);

        let seg = downcast::<tcp::Tcp>(find_layer(chain.as_ref(), Type::Tcp).unwrap()).unwrap();
        assert_eq!(seg.checksum, 0x7985);
    }

    #[test]
    fn test_pack_eth_ipv4_tcp_raw() {
        let data = Box::new(raw::Raw::new(b"fdg agfh ldfhgk hfdkgh kfjdhsg kshfdgk".to_vec()));

        let (chain, buf) = pack(vec![
            eth_for(HWDST.parse().unwrap()),
            ipv4_for(),
            tcp_syn(),
            data,
        ])
        .unwrap();

        assert_eq!(buf.len(), 92);

        // the TCP checksum covers the payload through the pseudo-header seed
        assert_eq!(&buf[50..52], &[0x97, 0x2d]);

        let ip = find_layer(chain.as_ref(), Type::Ipv4).unwrap();
        assert_eq!(ip.wire_len(), 78);

        let seg = find_layer(chain.as_ref(), Type::Tcp).unwrap();
        assert_eq!(seg.wire_len(), 58);
    }

    #[test]
    fn test_unpack_all_eth_ipv4_tcp_raw() {
        let data = Box::new(raw::Raw::new(b"fdg agfh ldfhgk hfdkgh kfjdhsg kshfdgk".to_vec()));
        let (_, buf) = pack(vec![
            eth_for(HWDST.parse().unwrap()),
            ipv4_for(),
            tcp_syn(),
            data,
        ])
        .unwrap();

        let chain = unpack_all(&buf, Type::Eth).unwrap();
        assert_eq!(
            layer_tags(chain.as_ref()),
            vec![Type::Eth, Type::Ipv4, Type::Tcp, Type::Raw]
        );

        let payload = downcast::<raw::Raw>(find_layer(chain.as_ref(), Type::Raw).unwrap()).unwrap();
        assert_eq!(payload.data, b"fdg agfh ldfhgk hfdkgh kfjdhsg kshfdgk");
    }

    #[test]
    fn test_pack_eth_ipv6_icmpv6() {
        let ip6 = Box::new(ipv6::Ipv6 {
            src_addr: "fe80::4e72:b9ff:fe54:e53d".parse().unwrap(),
            dst_addr: "2001:4860:4860::8888".parse().unwrap(),
            ..Default::default()
        });
        let echo = Box::<icmpv6::Icmpv6>::default();

        let (chain, buf) = pack(vec![eth_for(HWDST.parse().unwrap()), ip6, echo]).unwrap();

        assert_eq!(buf.len(), 62);
        assert_eq!(&buf[12..14], &[0x86, 0xdd]);

        // the pseudo-header seed installed at compose time yields the
        // golden echo-request checksum
        assert_eq!(&buf[54..62], &[0x80, 0x00, 0x5b, 0xed, 0x00, 0x00, 0x00, 0x00]);

        let icmp =
            downcast::<icmpv6::Icmpv6>(find_layer(chain.as_ref(), Type::Icmpv6).unwrap()).unwrap();
        assert_eq!(icmp.checksum, 0x5bed);

        let decoded = unpack_all(&buf, Type::Eth).unwrap();
        assert_eq!(
            layer_tags(decoded.as_ref()),
            vec![Type::Eth, Type::Ipv6, Type::Icmpv6]
        );
    }

    #[test]
    fn test_unpack_all_icmp_error_quotes_inner_packet() {
        // time-exceeded quoting an IPv4+UDP header, as a traceroute hop
        // would send it back
        let quoted_ip = ipv4_for();
        let quoted_udp = Box::new(udp::Udp {
            src_port: 33434,
            dst_port: 33435,
            ..Default::default()
        });

        let icmp = Box::new(icmpv4::Icmpv4 {
            kind: icmpv4::Kind::TimeExceeded,
            ..Default::default()
        });

        let outer_ip = Box::new(ipv4::Ipv4 {
            src_addr: "10.0.0.1".parse().unwrap(),
            dst_addr: IPSRC.parse().unwrap(),
            ..Default::default()
        });

        let (_, buf) = pack(vec![
            eth_for(HWDST.parse().unwrap()),
            outer_ip,
            icmp,
            quoted_ip,
            quoted_udp,
        ])
        .unwrap();

        let chain = unpack_all(&buf, Type::Eth).unwrap();
        assert_eq!(
            layer_tags(chain.as_ref()),
            vec![Type::Eth, Type::Ipv4, Type::Icmpv4, Type::Ipv4, Type::Udp]
        );
    }

    #[test]
    fn test_pack_802_3_llc_snap_chain() {
        let llc_hdr = Box::new(llc::Llc {
            control: 0x03,
            ..Default::default()
        });
        let snap_hdr = Box::<snap::Snap>::default();
        let udp_seg = Box::new(udp::Udp {
            src_port: 41562,
            dst_port: 8338,
            ..Default::default()
        });

        let (_, buf) = pack(vec![
            eth_for(MacAddr::broadcast()),
            llc_hdr,
            snap_hdr,
            ipv4_for(),
            udp_seg,
        ])
        .unwrap();

        // 14 + 3 (LLC, one-byte control) + 5 (SNAP) + 20 + 8
        assert_eq!(buf.len(), 50);

        // the type slot carries the 802.3 length of everything after the
        // Ethernet header, and the SAPs select SNAP
        assert_eq!(&buf[12..14], &[0x00, 0x24]);
        assert_eq!(&buf[14..17], &[0xaa, 0xaa, 0x03]);

        let chain = unpack_all(&buf, Type::Eth).unwrap();
        assert_eq!(
            layer_tags(chain.as_ref()),
            vec![Type::Eth, Type::Llc, Type::Snap, Type::Ipv4, Type::Udp]
        );
    }

    #[test]
    fn test_unpack_truncated_frame_reports_layer() {
        let err = unpack_all(&TEST_ETH_IPV4_UDP[..20], Type::Eth).unwrap_err();

        match err {
            Error::Decode { layer, .. } => assert_eq!(layer, Type::Ipv4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_find_layer() {
        let chain = unpack_all(&TEST_ETH_IPV4_TCP, Type::Eth).unwrap();

        assert!(find_layer(chain.as_ref(), Type::Ipv4).is_some());
        assert!(find_layer(chain.as_ref(), Type::Tcp).is_some());
        assert!(find_layer(chain.as_ref(), Type::Udp).is_none());
    }

    #[test]
    fn test_compose_empty_chain() {
        assert!(compose(Vec::new()).is_err());
    }

    fn layer_tags(chain: &dyn Packet) -> Vec<Type> {
        let mut tags = Vec::new();
        let mut cur = Some(chain);

        while let Some(pkt) = cur {
            tags.push(pkt.packet_type());
            cur = pkt.payload();
        }

        tags
    }
}
