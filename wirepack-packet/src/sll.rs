//! SLL (Linux cooked capture) header encoding and decoding

use std::any::Any;
use std::fmt;

use wirepack_core::packet::{downcast, fmt_chain};
use wirepack_core::{Buffer, Error, MacAddr, Packet, Result, Type};

use crate::wire::read_mac;

/// Where the packet was headed relative to the capturing host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Host,
    Broadcast,
    Multicast,
    OtherHost,
    Outgoing,
    Other(u16),
}

impl Kind {
    pub fn to_u16(self) -> u16 {
        match self {
            Kind::Host => 0,
            Kind::Broadcast => 1,
            Kind::Multicast => 2,
            Kind::OtherHost => 3,
            Kind::Outgoing => 4,
            Kind::Other(v) => v,
        }
    }

    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Kind::Host,
            1 => Kind::Broadcast,
            2 => Kind::Multicast,
            3 => Kind::OtherHost,
            4 => Kind::Outgoing,
            v => Kind::Other(v),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Host => f.write_str("host"),
            Kind::Broadcast => f.write_str("broadcast"),
            Kind::Multicast => f.write_str("multicast"),
            Kind::OtherHost => f.write_str("other"),
            Kind::Outgoing => f.write_str("outgoing"),
            Kind::Other(_) => f.write_str("unknown"),
        }
    }
}

/// A Linux cooked-mode header: 16 fixed bytes with the source address padded
/// to 8, followed by the same EtherType slot Ethernet uses.
#[derive(Debug)]
pub struct Sll {
    pub kind: Kind,
    pub addr_type: u16,
    pub addr_len: u16,
    pub src_addr: MacAddr,
    pub ether_type: u16,
    pub payload: Option<Box<dyn Packet>>,
}

impl Default for Sll {
    fn default() -> Self {
        Sll {
            kind: Kind::Host,
            addr_type: 2,
            addr_len: 6,
            src_addr: MacAddr::zero(),
            ether_type: 0,
            payload: None,
        }
    }
}

impl Packet for Sll {
    fn packet_type(&self) -> Type {
        Type::Sll
    }

    fn wire_len(&self) -> u16 {
        match &self.payload {
            Some(p) => p.wire_len() + 16,
            None => 16,
        }
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        if self.addr_len != 6 {
            return Err(Error::malformed(
                Type::Sll,
                "only 6-byte source addresses are supported",
            ));
        }

        buf.write_u16(self.kind.to_u16())?;
        buf.write_u16(self.addr_type)?;
        buf.write_u16(self.addr_len)?;
        buf.write_slice(self.src_addr.as_bytes())?;
        buf.write_slice(&[0x00, 0x00])?; // pad the address slot to 8 bytes
        buf.write_u16(self.ether_type)?;

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.kind = Kind::from_u16(buf.read_u16()?);
        self.addr_type = buf.read_u16()?;
        self.addr_len = buf.read_u16()?;

        if self.addr_len != 6 {
            return Err(Error::malformed(
                Type::Sll,
                format!("unsupported address length: {}", self.addr_len),
            ));
        }

        self.src_addr = read_mac(buf)?;
        buf.next(2);

        self.ether_type = buf.read_u16()?;

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
        self.payload = Some(payload);
        Ok(())
    }

    fn link_payload(&mut self, payload: Box<dyn Packet>) {
        self.payload = Some(payload);
    }

    fn answers(&self, _other: &dyn Packet) -> bool {
        false
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Sll>(other) else {
            return false;
        };

        self.kind == other.kind
            && self.addr_type == other.addr_type
            && self.addr_len == other.addr_len
            && self.src_addr == other.src_addr
            && self.ether_type == other.ether_type
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Sll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sll(type={}, src={}, ethertype=0x{:x})",
            self.kind, self.src_addr, self.ether_type
        )?;
        fmt_chain(f, self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut p = Sll {
            kind: Kind::Outgoing,
            src_addr: "4c:72:b9:54:e5:3d".parse().unwrap(),
            ether_type: 0x0800,
            ..Default::default()
        };

        let mut buf = Buffer::zeroed(16);
        p.pack(&mut buf).unwrap();

        assert_eq!(
            buf.bytes(),
            &[
                0x00, 0x04, 0x00, 0x02, 0x00, 0x06, 0x4c, 0x72, 0xb9, 0x54, 0xe5, 0x3d, 0x00,
                0x00, 0x08, 0x00,
            ]
        );

        let bytes = buf.into_vec();
        let mut decoded = Sll::default();
        decoded.unpack(&mut Buffer::view(&bytes)).unwrap();

        assert!(p.equals(&decoded));
        assert_eq!(decoded.guess_payload_type(), Type::Ipv4);
    }
}
