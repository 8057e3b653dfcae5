//! IPv4 packet encoding and decoding

use std::any::Any;
use std::fmt;
use std::net::Ipv4Addr;
use std::ops::{BitOr, BitOrAssign};

use wirepack_core::checksum;
use wirepack_core::packet::{downcast, fmt_chain, payload_answers};
use wirepack_core::{Buffer, Error, Packet, Result, Type};

use crate::wire::read_ipv4;

/// The 3-bit IPv4 flags field.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags(pub u8);

impl Flags {
    /// The reserved bit (RFC 3514's "evil" bit).
    pub const EVIL: Flags = Flags(1 << 2);
    pub const DONT_FRAGMENT: Flags = Flags(1 << 1);
    pub const MORE_FRAGMENTS: Flags = Flags(1 << 0);

    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();

        if self.contains(Flags::EVIL) {
            names.push("evil");
        }
        if self.contains(Flags::DONT_FRAGMENT) {
            names.push("dont-fragment");
        }
        if self.contains(Flags::MORE_FRAGMENTS) {
            names.push("more-fragments");
        }

        f.write_str(&names.join("|"))
    }
}

/// An IPv4 packet. Options are skipped on decode, not interpreted.
///
/// Attaching a payload derives the protocol number and total length from it
/// and installs the pseudo-header checksum seed on the payload.
#[derive(Debug)]
pub struct Ipv4 {
    pub version: u8,
    pub ihl: u8,
    pub tos: u8,
    pub length: u16,
    pub id: u16,
    pub flags: Flags,
    pub frag_off: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub payload: Option<Box<dyn Packet>>,
}

impl Default for Ipv4 {
    fn default() -> Self {
        Ipv4 {
            version: 4,
            ihl: 5,
            tos: 0,
            length: 20,
            id: 1,
            flags: Flags::default(),
            frag_off: 0,
            ttl: 64,
            protocol: 0,
            checksum: 0,
            src_addr: Ipv4Addr::UNSPECIFIED,
            dst_addr: Ipv4Addr::UNSPECIFIED,
            payload: None,
        }
    }
}

impl Ipv4 {
    /// Partial one's-complement sum over the pseudo-header, installed on the
    /// transport payload so its checksum covers the addresses, protocol and
    /// length.
    fn pseudo_sum(&self, payload_len: u16) -> u32 {
        checksum::pseudo_sum_v4(self.src_addr, self.dst_addr, self.protocol, payload_len)
    }
}

impl Packet for Ipv4 {
    fn packet_type(&self) -> Type {
        Type::Ipv4
    }

    fn wire_len(&self) -> u16 {
        match &self.payload {
            Some(p) => p.wire_len() + 20,
            None => 20,
        }
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_u8(self.version << 4 | (self.ihl & 0x0f))?;
        buf.write_u8(self.tos)?;
        buf.write_u16(self.length)?;
        buf.write_u16(self.id)?;
        buf.write_u16((self.flags.0 as u16) << 13 | (self.frag_off & 0x1fff))?;
        buf.write_u8(self.ttl)?;
        buf.write_u8(self.protocol)?;
        buf.write_u16(0x0000)?;
        buf.write_slice(&self.src_addr.octets())?;
        buf.write_slice(&self.dst_addr.octets())?;

        self.checksum = checksum::fold(&buf.layer_bytes()[..20], 0);
        buf.patch_u16(10, self.checksum)?;

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        let versihl = buf.read_u8()?;

        self.version = versihl >> 4;
        self.ihl = versihl & 0x0f;

        if self.version != 4 {
            return Err(Error::BadVersion {
                layer: Type::Ipv4,
                version: self.version,
            });
        }

        if self.ihl < 5 {
            return Err(Error::malformed(
                Type::Ipv4,
                format!("header length {} below the 20-byte minimum", self.ihl),
            ));
        }

        self.tos = buf.read_u8()?;
        self.length = buf.read_u16()?;
        self.id = buf.read_u16()?;

        let flagsfrag = buf.read_u16()?;
        self.flags = Flags((flagsfrag >> 13) as u8);
        self.frag_off = flagsfrag & 0x1fff;

        self.ttl = buf.read_u8()?;
        self.protocol = buf.read_u8()?;
        self.checksum = buf.read_u16()?;

        self.src_addr = read_ipv4(buf)?;
        self.dst_addr = read_ipv4(buf)?;

        // options are not interpreted, but the cursor has to move past them
        // for the next layer to line up
        let options = self.ihl as usize * 4 - 20;
        if buf.next(options).len() < options {
            return Err(Error::Truncated {
                need: options,
                have: 0,
            });
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
        Type::from_ip_protocol(self.protocol)
    }

    fn set_payload(&mut self, mut payload: Box<dyn Packet>) -> Result<()> {
        self.protocol = payload.packet_type().to_ip_protocol();
        self.length = payload.wire_len() + 20;

        payload.init_checksum(self.pseudo_sum(payload.wire_len()));

        self.payload = Some(payload);
        Ok(())
    }

    fn link_payload(&mut self, payload: Box<dyn Packet>) {
        self.payload = Some(payload);
    }

    fn answers(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Ipv4>(other) else {
            return false;
        };

        // an ICMPv4 error quotes the offending packet; correlate against the
        // quoted copy instead of the outer header
        if let Some(p) = self.payload() {
            if p.packet_type() == Type::Icmpv4 {
                if let Some(inner) = p.payload() {
                    return inner.equals(other as &dyn Packet);
                }
            }
        }

        if self.src_addr != other.dst_addr || self.protocol != other.protocol {
            return false;
        }

        payload_answers(self.payload(), other.payload())
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Ipv4>(other) else {
            return false;
        };

        // tos, length, ttl and checksum are mutated in flight and stay out
        // of the comparison
        self.version == other.version
            && self.ihl == other.ihl
            && self.id == other.id
            && self.flags == other.flags
            && self.frag_off == other.frag_off
            && self.protocol == other.protocol
            && self.src_addr == other.src_addr
            && self.dst_addr == other.dst_addr
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ipv4(id={}, proto={}, src={}, dst={})",
            self.id, self.protocol, self.src_addr, self.dst_addr
        )?;
        fmt_chain(f, self.payload())
    }
}
