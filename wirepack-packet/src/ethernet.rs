//! Ethernet (Ethernet II and 802.3) frame encoding and decoding

use std::any::Any;
use std::fmt;

use wirepack_core::packet::{downcast, fmt_chain, payload_answers};
use wirepack_core::{Buffer, MacAddr, Packet, Result, Type};

use crate::wire::read_mac;

/// Pseudo EtherType selecting 802.3 framing: the type/length slot carries a
/// length, and the payload is an LLC header.
pub const ETHERTYPE_LLC: u16 = 0x0001;

/// An Ethernet frame.
///
/// The `length` field is the 802.3 length slot; it is only meaningful when
/// `ether_type` is [`ETHERTYPE_LLC`]. Values below 0x0600 on the wire mean
/// "length, LLC follows"; anything else is an EtherType.
#[derive(Debug, Default)]
pub struct Ethernet {
    pub dst_addr: MacAddr,
    pub src_addr: MacAddr,
    pub ether_type: u16,
    pub length: u16,
    pub payload: Option<Box<dyn Packet>>,
}

impl Packet for Ethernet {
    fn packet_type(&self) -> Type {
        Type::Eth
    }

    fn wire_len(&self) -> u16 {
        match &self.payload {
            Some(p) => p.wire_len() + 14,
            None => 14,
        }
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_slice(self.dst_addr.as_bytes())?;
        buf.write_slice(self.src_addr.as_bytes())?;

        if self.ether_type != ETHERTYPE_LLC {
            buf.write_u16(self.ether_type)?;
        } else {
            buf.write_u16(self.length)?;
        }

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.dst_addr = read_mac(buf)?;
        self.src_addr = read_mac(buf)?;

        self.ether_type = buf.read_u16()?;
        if self.ether_type < 0x0600 {
            self.length = self.ether_type;
            self.ether_type = ETHERTYPE_LLC;
        }

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
        Type::from_ether_type(self.ether_type)
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        self.ether_type = payload.packet_type().to_ether_type();

        if self.ether_type < 0x0600 {
            self.length = payload.wire_len();
        }

        self.payload = Some(payload);
        Ok(())
    }

    fn link_payload(&mut self, payload: Box<dyn Packet>) {
        self.payload = Some(payload);
    }

    fn answers(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Ethernet>(other) else {
            return false;
        };

        if self.ether_type != other.ether_type {
            return false;
        }

        payload_answers(self.payload(), other.payload())
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Ethernet>(other) else {
            return false;
        };

        self.dst_addr == other.dst_addr
            && self.src_addr == other.src_addr
            && self.ether_type == other.ether_type
            && self.length == other.length
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Ethernet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ethernet(dst={}, src={}, type=0x{:x})",
            self.dst_addr, self.src_addr, self.ether_type
        )?;
        fmt_chain(f, self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack() {
        let mut eth = Ethernet {
            dst_addr: MacAddr::broadcast(),
            src_addr: "4c:72:b9:54:e5:3d".parse().unwrap(),
            ether_type: 0x0806,
            ..Default::default()
        };

        let mut buf = Buffer::zeroed(14);
        eth.pack(&mut buf).unwrap();

        assert_eq!(
            buf.bytes(),
            &[
                0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x4c, 0x72, 0xb9, 0x54, 0xe5, 0x3d, 0x08,
                0x06,
            ]
        );
    }

    #[test]
    fn test_unpack() {
        let data = [
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x4c, 0x72, 0xb9, 0x54, 0xe5, 0x3d, 0x08, 0x00,
        ];

        let mut eth = Ethernet::default();
        let mut buf = Buffer::view(&data);
        eth.unpack(&mut buf).unwrap();

        assert!(eth.dst_addr.is_broadcast());
        assert_eq!(eth.src_addr.to_string(), "4c:72:b9:54:e5:3d");
        assert_eq!(eth.ether_type, 0x0800);
        assert_eq!(eth.guess_payload_type(), Type::Ipv4);
    }

    #[test]
    fn test_unpack_length_means_llc() {
        let data = [
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x4c, 0x72, 0xb9, 0x54, 0xe5, 0x3d, 0x00, 0x2a,
        ];

        let mut eth = Ethernet::default();
        let mut buf = Buffer::view(&data);
        eth.unpack(&mut buf).unwrap();

        assert_eq!(eth.ether_type, ETHERTYPE_LLC);
        assert_eq!(eth.length, 0x2a);
        assert_eq!(eth.guess_payload_type(), Type::Llc);
    }

    #[test]
    fn test_unpack_truncated() {
        let data = [0xff, 0xff, 0xff];

        let mut eth = Ethernet::default();
        let mut buf = Buffer::view(&data);
        assert!(eth.unpack(&mut buf).is_err());
    }
}
