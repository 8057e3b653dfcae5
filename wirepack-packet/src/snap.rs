//! SNAP (Subnetwork Access Protocol) header encoding and decoding

use std::any::Any;
use std::fmt;

use wirepack_core::packet::{downcast, fmt_chain};
use wirepack_core::{Buffer, Error, Packet, Result, Type};

/// A SNAP header: 3-byte OUI plus the encapsulated EtherType. When the OUI
/// is all zero the EtherType selects the payload; any other OUI carries an
/// organization-private payload decoded as raw data.
#[derive(Debug, Default)]
pub struct Snap {
    pub oui: [u8; 3],
    pub ether_type: u16,
    pub payload: Option<Box<dyn Packet>>,
}

impl Packet for Snap {
    fn packet_type(&self) -> Type {
        Type::Snap
    }

    fn wire_len(&self) -> u16 {
        match &self.payload {
            Some(p) => p.wire_len() + 5,
            None => 5,
        }
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_slice(&self.oui)?;
        buf.write_u16(self.ether_type)?;

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        let oui = buf.next(3);
        if oui.len() < 3 {
            return Err(Error::Truncated {
                need: 3,
                have: oui.len(),
            });
        }
        self.oui.copy_from_slice(oui);

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
        if self.oui == [0x00, 0x00, 0x00] {
            Type::from_ether_type(self.ether_type)
        } else {
            Type::Raw
        }
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
        let Some(other) = downcast::<Snap>(other) else {
            return false;
        };

        self.oui == other.oui && self.ether_type == other.ether_type
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Snap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "snap(oui={:02x}:{:02x}:{:02x}, type=0x{:x})",
            self.oui[0], self.oui[1], self.oui[2], self.ether_type
        )?;
        fmt_chain(f, self.payload())
    }
}
