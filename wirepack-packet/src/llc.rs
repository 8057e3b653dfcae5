//! 802.2 LLC (Logical Link Control) header encoding and decoding

use std::any::Any;
use std::fmt;

use wirepack_core::packet::{downcast, fmt_chain};
use wirepack_core::{Buffer, Packet, Result, Type};

/// An LLC header. The control field is one or two bytes wide: if the low bit
/// of its first byte is 0, or the low two bits are 01, it is two bytes.
#[derive(Debug, Default)]
pub struct Llc {
    pub dsap: u8,
    pub ssap: u8,
    pub control: u16,
    pub payload: Option<Box<dyn Packet>>,
}

/// Width of the control field for a stored control value. I- and S-format
/// controls (first byte low bit 0, or low two bits 01) are two bytes;
/// U-format controls are one.
fn control_width(control: u16) -> u16 {
    if control > 0xff {
        return 2;
    }

    let b = control as u8;
    if b & 0x1 == 0 || b & 0x3 == 0x1 {
        2
    } else {
        1
    }
}

impl Llc {
    fn header_len(&self) -> u16 {
        2 + control_width(self.control)
    }
}

impl Packet for Llc {
    fn packet_type(&self) -> Type {
        Type::Llc
    }

    fn wire_len(&self) -> u16 {
        match &self.payload {
            Some(p) => p.wire_len() + self.header_len(),
            None => self.header_len(),
        }
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_u8(self.dsap)?;
        buf.write_u8(self.ssap)?;

        if control_width(self.control) == 2 {
            buf.write_u16(self.control)?;
        } else {
            buf.write_u8(self.control as u8)?;
        }

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.dsap = buf.read_u8()?;
        self.ssap = buf.read_u8()?;

        let first = buf.read_u8()?;
        if first & 0x1 == 0 || first & 0x3 == 0x1 {
            let second = buf.read_u8()?;
            self.control = u16::from_be_bytes([first, second]);
        } else {
            self.control = first as u16;
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
        if self.dsap == 0xaa && self.ssap == 0xaa {
            return Type::Snap;
        }

        Type::None
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        if payload.packet_type() == Type::Snap {
            self.dsap = 0xaa;
            self.ssap = 0xaa;
        }

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
        let Some(other) = downcast::<Llc>(other) else {
            return false;
        };

        self.dsap == other.dsap && self.ssap == other.ssap && self.control == other.control
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Llc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "llc(dsap=0x{:x}, ssap=0x{:x}, ctrl=0x{:x})",
            self.dsap, self.ssap, self.control
        )?;
        fmt_chain(f, self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_byte_control() {
        // 0x03 (UI frame): low two bits are 11, control is one byte
        let mut p = Llc {
            dsap: 0xaa,
            ssap: 0xaa,
            control: 0x03,
            ..Default::default()
        };

        assert_eq!(p.wire_len(), 3);

        let mut buf = Buffer::zeroed(3);
        p.pack(&mut buf).unwrap();
        assert_eq!(buf.bytes(), &[0xaa, 0xaa, 0x03]);

        let bytes = buf.into_vec();
        let mut decoded = Llc::default();
        decoded.unpack(&mut Buffer::view(&bytes)).unwrap();
        assert!(p.equals(&decoded));
        assert_eq!(decoded.guess_payload_type(), Type::Snap);
    }

    #[test]
    fn test_two_byte_control() {
        // low bit of the first control byte is 0: two-byte control
        let mut p = Llc {
            dsap: 0x42,
            ssap: 0x42,
            control: 0x1234,
            ..Default::default()
        };

        assert_eq!(p.wire_len(), 4);

        let mut buf = Buffer::zeroed(4);
        p.pack(&mut buf).unwrap();
        assert_eq!(buf.bytes(), &[0x42, 0x42, 0x12, 0x34]);

        let bytes = buf.into_vec();
        let mut decoded = Llc::default();
        decoded.unpack(&mut Buffer::view(&bytes)).unwrap();
        assert_eq!(decoded.control, 0x1234);
        assert_eq!(decoded.guess_payload_type(), Type::None);
    }
}
