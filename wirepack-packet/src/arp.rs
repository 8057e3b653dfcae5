//! ARP packet encoding and decoding

use std::any::Any;
use std::fmt;
use std::net::Ipv4Addr;

use wirepack_core::packet::downcast;
use wirepack_core::{Buffer, Error, MacAddr, Packet, Result, Type};

use crate::wire::{read_ipv4, read_mac};

/// ARP operation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Request,
    Reply,
    Other(u16),
}

impl Operation {
    pub fn to_u16(self) -> u16 {
        match self {
            Operation::Request => 1,
            Operation::Reply => 2,
            Operation::Other(v) => v,
        }
    }

    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Operation::Request,
            2 => Operation::Reply,
            v => Operation::Other(v),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Request => f.write_str("request"),
            Operation::Reply => f.write_str("reply"),
            Operation::Other(_) => f.write_str("invalid"),
        }
    }
}

/// An ARP packet over Ethernet and IPv4.
///
/// The declared hardware and protocol address lengths are authoritative on
/// the wire; only the 6-byte MAC / 4-byte IPv4 combination is decodable.
#[derive(Debug)]
pub struct Arp {
    pub operation: Operation,

    pub hw_type: u16,
    pub hw_len: u8,
    pub hw_src: MacAddr,
    pub hw_dst: MacAddr,

    pub proto_type: u16,
    pub proto_len: u8,
    pub proto_src: Ipv4Addr,
    pub proto_dst: Ipv4Addr,
}

impl Default for Arp {
    fn default() -> Self {
        Arp {
            operation: Operation::Request,

            hw_type: 1,
            hw_len: 6,
            hw_src: MacAddr::zero(),
            hw_dst: MacAddr::zero(),

            proto_type: 0x0800,
            proto_len: 4,
            proto_src: Ipv4Addr::UNSPECIFIED,
            proto_dst: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl Packet for Arp {
    fn packet_type(&self) -> Type {
        Type::Arp
    }

    fn wire_len(&self) -> u16 {
        8 + (self.hw_len as u16) * 2 + (self.proto_len as u16) * 2
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        if self.hw_len != 6 || self.proto_len != 4 {
            return Err(Error::malformed(
                Type::Arp,
                "only 6-byte hardware and 4-byte protocol addresses are supported",
            ));
        }

        buf.write_u16(self.hw_type)?;
        buf.write_u16(self.proto_type)?;

        buf.write_u8(self.hw_len)?;
        buf.write_u8(self.proto_len)?;

        buf.write_u16(self.operation.to_u16())?;

        buf.write_slice(self.hw_src.as_bytes())?;
        buf.write_slice(&self.proto_src.octets())?;

        buf.write_slice(self.hw_dst.as_bytes())?;
        buf.write_slice(&self.proto_dst.octets())?;

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.hw_type = buf.read_u16()?;
        self.proto_type = buf.read_u16()?;

        self.hw_len = buf.read_u8()?;
        self.proto_len = buf.read_u8()?;

        if self.hw_len != 6 || self.proto_len != 4 {
            return Err(Error::malformed(
                Type::Arp,
                format!(
                    "unsupported address lengths: hw {} proto {}",
                    self.hw_len, self.proto_len
                ),
            ));
        }

        self.operation = Operation::from_u16(buf.read_u16()?);

        self.hw_src = read_mac(buf)?;
        self.proto_src = read_ipv4(buf)?;

        self.hw_dst = read_mac(buf)?;
        self.proto_dst = read_ipv4(buf)?;

        Ok(())
    }

    fn payload(&self) -> Option<&dyn Packet> {
        None
    }

    fn payload_mut(&mut self) -> Option<&mut (dyn Packet + '_)> {
        None
    }

    fn take_payload(&mut self) -> Option<Box<dyn Packet>> {
        None
    }

    fn guess_payload_type(&self) -> Type {
        Type::None
    }

    fn set_payload(&mut self, _payload: Box<dyn Packet>) -> Result<()> {
        Ok(())
    }

    fn link_payload(&mut self, _payload: Box<dyn Packet>) {}

    fn answers(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Arp>(other) else {
            return false;
        };

        self.operation == Operation::Reply
            && other.operation == Operation::Request
            && self.proto_src == other.proto_dst
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Arp>(other) else {
            return false;
        };

        self.operation == other.operation
            && self.hw_type == other.hw_type
            && self.hw_len == other.hw_len
            && self.hw_src == other.hw_src
            && self.hw_dst == other.hw_dst
            && self.proto_type == other.proto_type
            && self.proto_len == other.proto_len
            && self.proto_src == other.proto_src
            && self.proto_dst == other.proto_dst
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Arp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arp(op={}, hwsrc={}, hwdst={}, psrc={}, pdst={})",
            self.operation, self.hw_src, self.hw_dst, self.proto_src, self.proto_dst
        )
    }
}
