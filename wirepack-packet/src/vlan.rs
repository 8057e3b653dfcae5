//! 802.1Q VLAN tag encoding and decoding

use std::any::Any;
use std::fmt;

use wirepack_core::packet::{downcast, fmt_chain, payload_answers};
use wirepack_core::{Buffer, Packet, Result, Type};

/// An 802.1Q tag: 3-bit priority, drop-eligible indicator, 12-bit VLAN id
/// and the encapsulated EtherType.
#[derive(Debug, Default)]
pub struct Vlan {
    pub priority: u8,
    pub drop_eligible: bool,
    pub vlan: u16,
    pub ether_type: u16,
    pub payload: Option<Box<dyn Packet>>,
}

impl Packet for Vlan {
    fn packet_type(&self) -> Type {
        Type::Vlan
    }

    fn wire_len(&self) -> u16 {
        match &self.payload {
            Some(p) => p.wire_len() + 4,
            None => 4,
        }
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        let mut tci = (self.priority as u16) << 13 | (self.vlan & 0x0fff);
        if self.drop_eligible {
            tci |= 0x1000;
        }

        buf.write_u16(tci)?;
        buf.write_u16(self.ether_type)?;

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        let tci = buf.read_u16()?;

        self.priority = (tci >> 13) as u8;
        self.drop_eligible = tci & 0x1000 != 0;
        self.vlan = tci & 0x0fff;

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

    fn answers(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Vlan>(other) else {
            return false;
        };

        if self.vlan != other.vlan {
            return false;
        }

        payload_answers(self.payload(), other.payload())
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Vlan>(other) else {
            return false;
        };

        self.priority == other.priority
            && self.drop_eligible == other.drop_eligible
            && self.vlan == other.vlan
            && self.ether_type == other.ether_type
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Vlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vlan(prio={}, drop={}, vlan={}, type=0x{:x})",
            self.priority, self.drop_eligible, self.vlan, self.ether_type
        )?;
        fmt_chain(f, self.payload())
    }
}
