//! ICMPv4 packet encoding and decoding

use std::any::Any;
use std::fmt;

use wirepack_core::checksum;
use wirepack_core::packet::{downcast, fmt_chain};
use wirepack_core::{Buffer, Packet, Result, Type};

/// ICMPv4 message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    EchoReply,
    DstUnreachable,
    SrcQuench,
    RedirectMsg,
    EchoRequest,
    RouterAdv,
    RouterSol,
    TimeExceeded,
    ParamProblem,
    Timestamp,
    TimestampReply,
    InfoRequest,
    InfoReply,
    AddrMaskRequest,
    AddrMaskReply,
    Other(u8),
}

impl Kind {
    pub fn to_u8(self) -> u8 {
        match self {
            Kind::EchoReply => 0,
            Kind::DstUnreachable => 3,
            Kind::SrcQuench => 4,
            Kind::RedirectMsg => 5,
            Kind::EchoRequest => 8,
            Kind::RouterAdv => 9,
            Kind::RouterSol => 10,
            Kind::TimeExceeded => 11,
            Kind::ParamProblem => 12,
            Kind::Timestamp => 13,
            Kind::TimestampReply => 14,
            Kind::InfoRequest => 15,
            Kind::InfoReply => 16,
            Kind::AddrMaskRequest => 17,
            Kind::AddrMaskReply => 18,
            Kind::Other(v) => v,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Kind::EchoReply,
            3 => Kind::DstUnreachable,
            4 => Kind::SrcQuench,
            5 => Kind::RedirectMsg,
            8 => Kind::EchoRequest,
            9 => Kind::RouterAdv,
            10 => Kind::RouterSol,
            11 => Kind::TimeExceeded,
            12 => Kind::ParamProblem,
            13 => Kind::Timestamp,
            14 => Kind::TimestampReply,
            15 => Kind::InfoRequest,
            16 => Kind::InfoReply,
            17 => Kind::AddrMaskRequest,
            18 => Kind::AddrMaskReply,
            v => Kind::Other(v),
        }
    }

    /// Error messages quote the packet that triggered them.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Kind::DstUnreachable
                | Kind::SrcQuench
                | Kind::RedirectMsg
                | Kind::TimeExceeded
                | Kind::ParamProblem
        )
    }

    /// The reply kind answering this request kind, if there is one.
    fn reply(self) -> Option<Kind> {
        match self {
            Kind::EchoRequest => Some(Kind::EchoReply),
            Kind::Timestamp => Some(Kind::TimestampReply),
            Kind::InfoRequest => Some(Kind::InfoReply),
            Kind::AddrMaskRequest => Some(Kind::AddrMaskReply),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::EchoReply => "echo-reply",
            Kind::DstUnreachable => "dst-unreach",
            Kind::SrcQuench => "src-quench",
            Kind::RedirectMsg => "redirect",
            Kind::EchoRequest => "echo-request",
            Kind::RouterAdv => "router-adv",
            Kind::RouterSol => "router-sol",
            Kind::TimeExceeded => "time-exceeded",
            Kind::ParamProblem => "param-problem",
            Kind::Timestamp => "timestamp-request",
            Kind::TimestampReply => "timestamp-reply",
            Kind::InfoRequest => "info-request",
            Kind::InfoReply => "info-reply",
            Kind::AddrMaskRequest => "addr-mask-request",
            Kind::AddrMaskReply => "addr-mask-reply",
            Kind::Other(_) => "unknown",
        };

        f.write_str(name)
    }
}

/// An ICMPv4 message. Error kinds carry the quoted offending packet as their
/// payload; every other kind terminates the chain.
#[derive(Debug)]
pub struct Icmpv4 {
    pub kind: Kind,
    pub code: u8,
    pub checksum: u16,
    pub id: u16,
    pub seq: u16,
    pub payload: Option<Box<dyn Packet>>,
}

impl Default for Icmpv4 {
    fn default() -> Self {
        Icmpv4 {
            kind: Kind::EchoRequest,
            code: 0,
            checksum: 0,
            id: 0,
            seq: 0,
            payload: None,
        }
    }
}

impl Packet for Icmpv4 {
    fn packet_type(&self) -> Type {
        Type::Icmpv4
    }

    fn wire_len(&self) -> u16 {
        match &self.payload {
            Some(p) => p.wire_len() + 8,
            None => 8,
        }
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_u8(self.kind.to_u8())?;
        buf.write_u8(self.code)?;
        buf.write_u16(0x0000)?;
        buf.write_u16(self.id)?;
        buf.write_u16(self.seq)?;

        // the wire sum has no pseudo-header seed; it covers this header and
        // any quoted packet already encoded behind it
        self.checksum = checksum::fold(buf.layer_bytes(), 0);
        buf.patch_u16(2, self.checksum)?;

        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.kind = Kind::from_u8(buf.read_u8()?);
        self.code = buf.read_u8()?;
        self.checksum = buf.read_u16()?;
        self.id = buf.read_u16()?;
        self.seq = buf.read_u16()?;

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
        if self.kind.is_error() {
            return Type::Ipv4;
        }

        Type::None
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        if self.kind.is_error() {
            self.payload = Some(payload);
        }

        Ok(())
    }

    fn link_payload(&mut self, payload: Box<dyn Packet>) {
        if self.kind.is_error() {
            self.payload = Some(payload);
        }
    }

    fn answers(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Icmpv4>(other) else {
            return false;
        };

        if other.kind.reply() != Some(self.kind) {
            return false;
        }

        self.id == other.id && self.seq == other.seq
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        let Some(other) = downcast::<Icmpv4>(other) else {
            return false;
        };

        self.kind == other.kind
            && self.code == other.code
            && self.checksum == other.checksum
            && self.id == other.id
            && self.seq == other.seq
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Icmpv4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "icmpv4(type={}, id={}, seq={})",
            self.kind, self.id, self.seq
        )?;
        fmt_chain(f, self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // echo request, id 15, seq 30
    const TEST_SIMPLE: [u8; 8] = [0x08, 0x00, 0xf7, 0xd2, 0x00, 0x0f, 0x00, 0x1e];

    fn make_test_simple() -> Icmpv4 {
        Icmpv4 {
            id: 15,
            seq: 30,
            ..Default::default()
        }
    }

    #[test]
    fn test_pack() {
        let mut p = make_test_simple();

        let mut buf = Buffer::zeroed(8);
        p.pack(&mut buf).unwrap();

        assert_eq!(buf.bytes(), &TEST_SIMPLE);
        assert_eq!(p.checksum, 0xf7d2);
    }

    #[test]
    fn test_unpack() {
        let mut p = Icmpv4::default();
        p.unpack(&mut Buffer::view(&TEST_SIMPLE)).unwrap();

        let mut cmp = make_test_simple();
        cmp.checksum = 0xf7d2;
        assert!(p.equals(&cmp));
    }

    #[test]
    fn test_answers() {
        let request = make_test_simple();

        let reply = Icmpv4 {
            kind: Kind::EchoReply,
            id: 15,
            seq: 30,
            ..Default::default()
        };
        assert!(reply.answers(&request));
        assert!(!request.answers(&reply));

        let wrong_seq = Icmpv4 {
            kind: Kind::EchoReply,
            id: 15,
            seq: 31,
            ..Default::default()
        };
        assert!(!wrong_seq.answers(&request));
    }

    #[test]
    fn test_error_kinds_carry_payload() {
        assert_eq!(
            Icmpv4 {
                kind: Kind::TimeExceeded,
                ..Default::default()
            }
            .guess_payload_type(),
            Type::Ipv4
        );
        assert_eq!(make_test_simple().guess_payload_type(), Type::None);
    }
}
