//! ICMPv6 packet encoding and decoding

use std::any::Any;
use std::fmt;

use wirepack_core::checksum;
use wirepack_core::packet::downcast;
use wirepack_core::{Buffer, Packet, Result, Type};

/// ICMPv6 message type (RFC 4443 numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    DstUnreachable,
    PacketTooBig,
    TimeExceeded,
    ParamProblem,
    EchoRequest,
    EchoReply,
    Other(u8),
}

impl Kind {
    pub fn to_u8(self) -> u8 {
        match self {
            Kind::DstUnreachable => 1,
            Kind::PacketTooBig => 2,
            Kind::TimeExceeded => 3,
            Kind::ParamProblem => 4,
            Kind::EchoRequest => 128,
            Kind::EchoReply => 129,
            Kind::Other(v) => v,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Kind::DstUnreachable,
            2 => Kind::PacketTooBig,
            3 => Kind::TimeExceeded,
            4 => Kind::ParamProblem,
            128 => Kind::EchoRequest,
            129 => Kind::EchoReply,
            v => Kind::Other(v),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::DstUnreachable => "dst-unreach",
            Kind::PacketTooBig => "too-big",
            Kind::TimeExceeded => "time-exceeded",
            Kind::ParamProblem => "param-problem",
            Kind::EchoRequest => "echo-request",
            Kind::EchoReply => "echo-reply",
            Kind::Other(_) => "unknown",
        };

        f.write_str(name)
    }
}

/// An ICMPv6 message: type, code, checksum and a 4-byte body (identifier and
/// sequence for the echo kinds).
///
/// The checksum is only computed when the enclosing IPv6 layer has seeded the
/// pseudo-header sum; a detached pack leaves the slot zero.
#[derive(Debug)]
pub struct Icmpv6 {
    pub kind: Kind,
    pub code: u8,
    pub checksum: u16,
    pub body: u32,
    csum_seed: u32,
}

impl Default for Icmpv6 {
    fn default() -> Self {
        Icmpv6 {
            kind: Kind::EchoRequest,
            code: 0,
            checksum: 0,
            body: 0,
            csum_seed: 0,
        }
    }
}

impl Packet for Icmpv6 {
    fn packet_type(&self) -> Type {
        Type::Icmpv6
    }

    fn wire_len(&self) -> u16 {
        8
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_u8(self.kind.to_u8())?;
        buf.write_u8(self.code)?;
        buf.write_u16(0x0000)?;
        buf.write_u32(self.body)?;

        if self.csum_seed != 0 {
            self.checksum = checksum::fold(buf.layer_bytes(), self.csum_seed);
            buf.patch_u16(2, self.checksum)?;
        }

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.kind = Kind::from_u8(buf.read_u8()?);
        self.code = buf.read_u8()?;
        self.checksum = buf.read_u16()?;
        self.body = buf.read_u32()?;

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

    fn init_checksum(&mut self, seed: u32) {
        self.csum_seed = seed;
    }

    fn answers(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Icmpv6>(other) else {
            return false;
        };

        // identifier and sequence live in the body for the echo kinds
        other.kind == Kind::EchoRequest && self.kind == Kind::EchoReply && self.body == other.body
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Icmpv6>(other) else {
            return false;
        };

        self.kind == other.kind && self.code == other.code && self.checksum == other.checksum
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Icmpv6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "icmpv6(type={}, sum=0x{:x})", self.kind, self.checksum)
    }
}
