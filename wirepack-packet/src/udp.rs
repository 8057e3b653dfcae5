//! UDP datagram encoding and decoding

use std::any::Any;
use std::fmt;

use wirepack_core::checksum;
use wirepack_core::packet::{downcast, fmt_chain};
use wirepack_core::{Buffer, Packet, Result, Type};

/// A UDP datagram. The checksum is only computed when the enclosing IP layer
/// has seeded the pseudo-header sum; unseeded it is stored as zero, which
/// IPv4 receivers treat as "no checksum".
#[derive(Debug)]
pub struct Udp {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: u16,
    pub(crate) csum_seed: u32,
    pub payload: Option<Box<dyn Packet>>,
}

impl Default for Udp {
    fn default() -> Self {
        Udp {
            src_port: 0,
            dst_port: 0,
            length: 8,
            checksum: 0,
            csum_seed: 0,
            payload: None,
        }
    }
}

impl Packet for Udp {
    fn packet_type(&self) -> Type {
        Type::Udp
    }

    fn wire_len(&self) -> u16 {
        match &self.payload {
            Some(p) => p.wire_len() + 8,
            None => 8,
        }
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_u16(self.src_port)?;
        buf.write_u16(self.dst_port)?;
        buf.write_u16(self.length)?;

        if self.csum_seed != 0 {
            // the checksum slot is still zero at this point, and the payload
            // bytes behind the header are already encoded
            self.checksum = checksum::fold(buf.layer_bytes(), self.csum_seed);
        }

        buf.write_u16(self.checksum)?;

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.src_port = buf.read_u16()?;
        self.dst_port = buf.read_u16()?;
        self.length = buf.read_u16()?;
        self.checksum = buf.read_u16()?;

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
        Type::Raw
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        self.length = payload.wire_len() + 8;
        self.payload = Some(payload);
        Ok(())
    }

    fn link_payload(&mut self, payload: Box<dyn Packet>) {
        self.payload = Some(payload);
    }

    fn init_checksum(&mut self, seed: u32) {
        self.csum_seed = seed;
    }

    fn answers(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Udp>(other) else {
            return false;
        };

        self.src_port == other.dst_port && self.dst_port == other.src_port
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Udp>(other) else {
            return false;
        };

        self.src_port == other.src_port
            && self.dst_port == other.dst_port
            && self.length == other.length
            && self.checksum == other.checksum
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Udp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "udp(sport={}, dport={}, len={})",
            self.src_port, self.dst_port, self.length
        )?;
        fmt_chain(f, self.payload())
    }
}
