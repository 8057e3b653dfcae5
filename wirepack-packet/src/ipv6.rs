//! IPv6 packet encoding and decoding

use std::any::Any;
use std::fmt;
use std::net::Ipv6Addr;

use wirepack_core::checksum;
use wirepack_core::packet::{downcast, fmt_chain, payload_answers};
use wirepack_core::{Buffer, Error, Packet, Result, Type};

use crate::wire::read_ipv6;

/// An IPv6 packet. Extension headers are not decoded.
///
/// The `length` field is the payload length, kept in sync by `set_payload`;
/// the flow label straddles three bytes after the version nibble (4/20
/// split).
#[derive(Debug)]
pub struct Ipv6 {
    pub version: u8,
    pub class: u8,
    pub label: u32,
    pub length: u16,
    pub next_header: u8,
    pub hop_limit: u8,
    pub src_addr: Ipv6Addr,
    pub dst_addr: Ipv6Addr,
    pub payload: Option<Box<dyn Packet>>,
}

impl Default for Ipv6 {
    fn default() -> Self {
        Ipv6 {
            version: 6,
            class: 0,
            label: 0,
            length: 0,
            next_header: 0,
            hop_limit: 64,
            src_addr: Ipv6Addr::UNSPECIFIED,
            dst_addr: Ipv6Addr::UNSPECIFIED,
            payload: None,
        }
    }
}

impl Ipv6 {
    fn pseudo_sum(&self) -> u32 {
        checksum::pseudo_sum_v6(self.src_addr, self.dst_addr, self.next_header, self.length)
    }
}

impl Packet for Ipv6 {
    fn packet_type(&self) -> Type {
        Type::Ipv6
    }

    fn wire_len(&self) -> u16 {
        40 + self.length
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_u8(self.version << 4 | (self.class >> 4))?;
        buf.write_u8(self.class << 4 | ((self.label >> 16) as u8 & 0x0f))?;
        buf.write_u16(self.label as u16)?;

        buf.write_u16(self.length)?;
        buf.write_u8(self.next_header)?;
        buf.write_u8(self.hop_limit)?;

        buf.write_slice(&self.src_addr.octets())?;
        buf.write_slice(&self.dst_addr.octets())?;

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        let b0 = buf.read_u8()?;
        let b1 = buf.read_u8()?;
        let b2 = buf.read_u8()?;
        let b3 = buf.read_u8()?;

        self.version = b0 >> 4;
        if self.version != 6 {
            return Err(Error::BadVersion {
                layer: Type::Ipv6,
                version: self.version,
            });
        }

        self.class = (b0 & 0x0f) << 4 | b1 >> 4;
        self.label = ((b1 & 0x0f) as u32) << 16 | (b2 as u32) << 8 | b3 as u32;

        self.length = buf.read_u16()?;
        self.next_header = buf.read_u8()?;
        self.hop_limit = buf.read_u8()?;

        self.src_addr = read_ipv6(buf)?;
        self.dst_addr = read_ipv6(buf)?;

        Ok(())
    }

    fn payload(&self) -> Option<&dyn Packet> {
        self.payload.as_deref()
    }

    fn payload_mut(&mut self) -> Option<&mut (dyn Packet + '_)> {
        self.payload.as_deref_mut().map(|p| p as &mut dyn Packet)
    }

    fn take_payload(&mut self) -> Option<Box<dyn Packet>> {
        self.payload.take()
    }

    fn guess_payload_type(&self) -> Type {
        Type::from_ip_protocol(self.next_header)
    }

    fn set_payload(&mut self, mut payload: Box<dyn Packet>) -> Result<()> {
        self.next_header = payload.packet_type().to_ip_protocol();
        self.length = payload.wire_len();

        payload.init_checksum(self.pseudo_sum());

        self.payload = Some(payload);
        Ok(())
    }

    fn link_payload(&mut self, payload: Box<dyn Packet>) {
        self.payload = Some(payload);
    }

    fn answers(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Ipv6>(other) else {
            return false;
        };

        if self.dst_addr != other.src_addr {
            return false;
        }

        payload_answers(self.payload(), other.payload())
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Ipv6>(other) else {
            return false;
        };

        self.version == other.version
            && self.class == other.class
            && self.label == other.label
            && self.length == other.length
            && self.next_header == other.next_header
            && self.hop_limit == other.hop_limit
            && self.src_addr == other.src_addr
            && self.dst_addr == other.dst_addr
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Ipv6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ipv6(len={}, next={}, hop={}, src={}, dst={})",
            self.length, self.next_header, self.hop_limit, self.src_addr, self.dst_addr
        )?;
        fmt_chain(f, self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_simple() -> Ipv6 {
        Ipv6 {
            class: 0xab,
            label: 0x3c9d2,
            length: 8,
            next_header: 0x3a,
            src_addr: "fe80::4e72:b9ff:fe54:e53d".parse().unwrap(),
            dst_addr: "2001:4860:4860::8888".parse().unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_round_trip() {
        let mut p = make_test_simple();

        let mut buf = Buffer::zeroed(40);
        p.pack(&mut buf).unwrap();

        let bytes = buf.into_vec();

        // version 6, class 0xab, label 0x3c9d2 across the 4/20 split
        assert_eq!(&bytes[..4], &[0x6a, 0xb3, 0xc9, 0xd2]);
        assert_eq!(&bytes[4..8], &[0x00, 0x08, 0x3a, 0x40]);

        let mut decoded = Ipv6::default();
        decoded.unpack(&mut Buffer::view(&bytes)).unwrap();

        assert!(p.equals(&decoded));
        assert_eq!(decoded.guess_payload_type(), Type::Icmpv6);
    }

    #[test]
    fn test_unpack_bad_version() {
        let data = [0x45u8; 40];

        let mut p = Ipv6::default();
        assert!(matches!(
            p.unpack(&mut Buffer::view(&data)),
            Err(Error::BadVersion {
                layer: Type::Ipv6,
                version: 4
            })
        ));
    }
}
