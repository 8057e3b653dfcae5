//! TCP segment encoding and decoding

use std::any::Any;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use wirepack_core::checksum;
use wirepack_core::packet::{downcast, fmt_chain};
use wirepack_core::{Buffer, Error, Packet, Result, Type};

/// The eight TCP control bits, in their wire layout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags(pub u8);

impl Flags {
    pub const FIN: Flags = Flags(0x01);
    pub const SYN: Flags = Flags(0x02);
    pub const RST: Flags = Flags(0x04);
    pub const PSH: Flags = Flags(0x08);
    pub const ACK: Flags = Flags(0x10);
    pub const URG: Flags = Flags(0x20);
    pub const ECE: Flags = Flags(0x40);
    pub const CWR: Flags = Flags(0x80);

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
        let all = [
            (Flags::FIN, "fin"),
            (Flags::SYN, "syn"),
            (Flags::RST, "rst"),
            (Flags::PSH, "psh"),
            (Flags::ACK, "ack"),
            (Flags::URG, "urg"),
            (Flags::ECE, "ece"),
            (Flags::CWR, "cwr"),
        ];

        let names: Vec<&str> = all
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|&(_, name)| name)
            .collect();

        f.write_str(&names.join("|"))
    }
}

/// One TCP option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TcpOption {
    /// End of the option list; the rest of the header is padding.
    End,
    /// Single-byte padding between options.
    Nop,
    /// Any other kind, carried as opaque bytes.
    Raw { kind: u8, data: Vec<u8> },
}

/// A TCP segment with options.
///
/// `data_off` is authoritative for the header length: options are padded
/// with zeros up to `data_off * 4` bytes on pack, and read until that offset
/// on unpack. The checksum is only computed when the enclosing IP layer has
/// seeded the pseudo-header sum.
#[derive(Debug)]
pub struct Tcp {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub data_off: u8,
    pub ns: bool,
    pub flags: Flags,
    pub window: u16,
    pub checksum: u16,
    pub urgent: u16,
    pub options: Vec<TcpOption>,
    pub(crate) csum_seed: u32,
    pub payload: Option<Box<dyn Packet>>,
}

impl Default for Tcp {
    fn default() -> Self {
        Tcp {
            src_port: 0,
            dst_port: 0,
            seq: 0,
            ack: 0,
            data_off: 5,
            ns: false,
            flags: Flags::default(),
            window: 0,
            checksum: 0,
            urgent: 0,
            options: Vec::new(),
            csum_seed: 0,
            payload: None,
        }
    }
}

impl Tcp {
    /// Replace the options and grow `data_off` to cover them.
    pub fn set_options(&mut self, options: Vec<TcpOption>) {
        let bytes: usize = options.iter().map(option_len).sum();
        self.data_off = (5 + bytes.div_ceil(4)) as u8;
        self.options = options;
    }
}

fn option_len(opt: &TcpOption) -> usize {
    match opt {
        TcpOption::End | TcpOption::Nop => 1,
        TcpOption::Raw { data, .. } => 2 + data.len(),
    }
}

impl Packet for Tcp {
    fn packet_type(&self) -> Type {
        Type::Tcp
    }

    fn wire_len(&self) -> u16 {
        let header = self.data_off as u16 * 4;
        match &self.payload {
            Some(p) => p.wire_len() + header,
            None => header,
        }
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_u16(self.src_port)?;
        buf.write_u16(self.dst_port)?;
        buf.write_u32(self.seq)?;
        buf.write_u32(self.ack)?;

        buf.write_u8(self.data_off << 4 | self.ns as u8)?;
        buf.write_u8(self.flags.0)?;

        buf.write_u16(self.window)?;
        buf.write_u16(0x0000)?;
        buf.write_u16(self.urgent)?;

        let header_len = self.data_off as usize * 4;
        let mut written = 20;

        for opt in &self.options {
            written += option_len(opt);
            if written > header_len {
                return Err(Error::malformed(
                    Type::Tcp,
                    "options exceed the declared header length",
                ));
            }

            match opt {
                TcpOption::End => buf.write_u8(0)?,
                TcpOption::Nop => buf.write_u8(1)?,
                TcpOption::Raw { kind, data } => {
                    buf.write_u8(*kind)?;
                    buf.write_u8((data.len() + 2) as u8)?;
                    buf.write_slice(data)?;
                }
            }
        }

        for _ in written..header_len {
            buf.write_u8(0)?;
        }

        if self.csum_seed != 0 {
            // the layer bytes include the already-encoded payload, so this
            // covers pseudo-header + header + options + payload
            self.checksum = checksum::fold(buf.layer_bytes(), self.csum_seed);
        }

        buf.patch_u16(16, self.checksum)?;

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.src_port = buf.read_u16()?;
        self.dst_port = buf.read_u16()?;
        self.seq = buf.read_u32()?;
        self.ack = buf.read_u32()?;

        let offns = buf.read_u8()?;
        self.data_off = offns >> 4;
        self.ns = offns & 0x01 != 0;

        self.flags = Flags(buf.read_u8()?);

        self.window = buf.read_u16()?;
        self.checksum = buf.read_u16()?;
        self.urgent = buf.read_u16()?;

        let header_len = self.data_off as usize * 4;
        if header_len < 20 {
            return Err(Error::malformed(
                Type::Tcp,
                format!("data offset {} below the 20-byte minimum", self.data_off),
            ));
        }

        self.options.clear();

        let mut consumed = 20;
        while consumed < header_len {
            let kind = buf.read_u8()?;
            consumed += 1;

            match kind {
                0x00 => {
                    self.options.push(TcpOption::End);
                    // everything after End is padding
                    buf.next(header_len - consumed);
                    consumed = header_len;
                }
                0x01 => self.options.push(TcpOption::Nop),
                kind => {
                    let len = buf.read_u8()? as usize;
                    consumed += 1;

                    if len < 2 || consumed + len - 2 > header_len {
                        return Err(Error::malformed(
                            Type::Tcp,
                            "option length exceeds the declared header length",
                        ));
                    }

                    let data = buf.next(len - 2);
                    if data.len() < len - 2 {
                        return Err(Error::Truncated {
                            need: len - 2,
                            have: data.len(),
                        });
                    }

                    self.options.push(TcpOption::Raw {
                        kind,
                        data: data.to_vec(),
                    });
                    consumed += len - 2;
                }
            }
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
        Type::Raw
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
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
        let Some(other) = downcast::<Tcp>(other) else {
            return false;
        };

        self.src_port == other.dst_port && self.dst_port == other.src_port
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Tcp>(other) else {
            return false;
        };

        self.src_port == other.src_port
            && self.dst_port == other.dst_port
            && self.seq == other.seq
            && self.ack == other.ack
            && self.data_off == other.data_off
            && self.ns == other.ns
            && self.flags == other.flags
            && self.window == other.window
            && self.checksum == other.checksum
            && self.urgent == other.urgent
            && self.options == other.options
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Tcp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tcp(sport={}, dport={}, seq={}, flags={}, win={})",
            self.src_port, self.dst_port, self.seq, self.flags, self.window
        )?;
        fmt_chain(f, self.payload())
    }
}
