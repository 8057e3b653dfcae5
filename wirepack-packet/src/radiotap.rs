//! RadioTap header encoding and decoding
//!
//! The options area indicated by the `present` bitmap is captured as opaque
//! bytes; the enclosed 802.11 frame is not decoded further by this crate.

use std::any::Any;
use std::fmt;

use wirepack_core::packet::{downcast, fmt_chain};
use wirepack_core::{Buffer, Error, Packet, Result, Type};

/// A RadioTap header. Integer fields are little-endian on the wire, unlike
/// every other protocol here.
#[derive(Debug, Default)]
pub struct RadioTap {
    pub version: u8,
    pub length: u16,
    pub present: u32,
    pub data: Vec<u8>,
    pub payload: Option<Box<dyn Packet>>,
}

impl Packet for RadioTap {
    fn packet_type(&self) -> Type {
        Type::RadioTap
    }

    fn wire_len(&self) -> u16 {
        let header = 8 + self.data.len() as u16;
        match &self.payload {
            Some(p) => p.wire_len() + header,
            None => header,
        }
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_u8(self.version)?;
        buf.write_u8(0x00)?;
        buf.write_u16_le(self.length)?;
        buf.write_u32_le(self.present)?;
        buf.write_slice(&self.data)?;

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.version = buf.read_u8()?;
        buf.read_u8()?; // pad

        self.length = buf.read_u16_le()?;
        self.present = buf.read_u32_le()?;

        if self.length < 8 {
            return Err(Error::malformed(
                Type::RadioTap,
                format!("declared length {} shorter than the fixed header", self.length),
            ));
        }

        let want = self.length as usize - 8;
        let data = buf.next(want);
        if data.len() < want {
            return Err(Error::Truncated {
                need: want,
                have: data.len(),
            });
        }
        self.data = data.to_vec();

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
        Type::WiFi
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        self.length = 8 + self.data.len() as u16;
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
        let Some(other) = downcast::<RadioTap>(other) else {
            return false;
        };

        self.version == other.version
            && self.length == other.length
            && self.present == other.present
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for RadioTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "radiotap(len={}, present=0x{:x})",
            self.length, self.present
        )?;
        fmt_chain(f, self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_little_endian() {
        let mut p = RadioTap {
            version: 0,
            length: 12,
            present: 0x0000482e,
            data: vec![0x10, 0x02, 0x6c, 0x09],
            ..Default::default()
        };

        let mut buf = Buffer::zeroed(12);
        p.pack(&mut buf).unwrap();

        assert_eq!(
            buf.bytes(),
            &[0x00, 0x00, 0x0c, 0x00, 0x2e, 0x48, 0x00, 0x00, 0x10, 0x02, 0x6c, 0x09]
        );

        let bytes = buf.into_vec();
        let mut decoded = RadioTap::default();
        decoded.unpack(&mut Buffer::view(&bytes)).unwrap();

        assert!(p.equals(&decoded));
        assert_eq!(decoded.data, vec![0x10, 0x02, 0x6c, 0x09]);
        assert_eq!(decoded.guess_payload_type(), Type::WiFi);
    }

    #[test]
    fn test_unpack_short_options() {
        // declares 12 bytes but only 10 are present
        let data = [0x00, 0x00, 0x0c, 0x00, 0x2e, 0x48, 0x00, 0x00, 0x10, 0x02];

        let mut p = RadioTap::default();
        assert!(p.unpack(&mut Buffer::view(&data)).is_err());
    }
}
