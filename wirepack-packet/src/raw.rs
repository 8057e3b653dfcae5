//! Opaque payload bytes at the end of a chain

use std::any::Any;
use std::fmt;

use wirepack_core::packet::downcast;
use wirepack_core::{Buffer, Packet, Result, Type};

/// Raw application data. Unpacking consumes whatever remains of the buffer.
#[derive(Debug, Default)]
pub struct Raw {
    pub data: Vec<u8>,
}

impl Raw {
    pub fn new(data: Vec<u8>) -> Self {
        Raw { data }
    }
}

impl Packet for Raw {
    fn packet_type(&self) -> Type {
        Type::Raw
    }

    fn wire_len(&self) -> u16 {
        self.data.len() as u16
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_slice(&self.data)
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.data = buf.next(buf.remaining()).to_vec();
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

    fn answers(&self, _other: &dyn Packet) -> bool {
        false
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Raw>(other) else {
            return false;
        };

        self.data == other.data
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Raw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data(len={})", self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut p = Raw::new(b"fdg agfh ldfhgk".to_vec());

        let mut buf = Buffer::zeroed(p.wire_len() as usize);
        p.pack(&mut buf).unwrap();

        let bytes = buf.into_vec();
        assert_eq!(bytes, b"fdg agfh ldfhgk");

        let mut decoded = Raw::default();
        decoded.unpack(&mut Buffer::view(&bytes)).unwrap();
        assert!(p.equals(&decoded));
    }
}
