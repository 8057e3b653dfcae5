//! The capability set every protocol layer implements

use std::any::Any;
use std::fmt;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::types::Type;

/// A single protocol layer in a packet chain.
///
/// A chain runs from the outermost (link-layer) packet down to the
/// application payload; each layer exclusively owns the next one through its
/// payload link. Composition installs payloads top-down and lets the
/// enclosing layer derive anything it needs from the payload (next-protocol
/// tags, lengths, pseudo-header checksum seeds); layers never know their
/// parents.
pub trait Packet: fmt::Debug + fmt::Display {
    /// The protocol tag of this layer.
    fn packet_type(&self) -> Type;

    /// Wire length of this layer plus everything below it. Detached layers
    /// report their own header length (or a protocol-specific pseudo
    /// length).
    fn wire_len(&self) -> u16;

    /// Encode this layer's header into the buffer at the current cursor and
    /// patch any checksum slot it owns. The buffer's layer marker has been
    /// placed at this layer's first byte; with the inside-out packing order
    /// the payload bytes are already in the buffer behind the header.
    fn pack(&mut self, buf: &mut Buffer) -> Result<()>;

    /// Decode this layer's header from the buffer at the current cursor.
    /// Nested payloads are left in the buffer for the caller to decode.
    fn unpack(&mut self, buf: &mut Buffer) -> Result<()>;

    /// The payload layer, if one is attached.
    fn payload(&self) -> Option<&dyn Packet>;

    /// Mutable access to the payload layer.
    fn payload_mut(&mut self) -> Option<&mut (dyn Packet + '_)>;

    /// Detach and return the payload, transferring ownership out.
    fn take_payload(&mut self) -> Option<Box<dyn Packet>>;

    /// Guess the payload's protocol from decoded header fields (EtherType,
    /// IP protocol number, ...). `Type::None` means this layer terminates
    /// the chain.
    fn guess_payload_type(&self) -> Type;

    /// Attach a payload at compose time. The layer derives its dependent
    /// fields from the payload (next-protocol tag, lengths) and installs a
    /// pseudo-header checksum seed on the payload where the protocol calls
    /// for one. Layers that cannot carry a payload silently drop it.
    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()>;

    /// Attach a payload at decode time without re-deriving any fields; the
    /// decoded header values stay authoritative.
    fn link_payload(&mut self, payload: Box<dyn Packet>);

    /// Install a partial one's-complement sum handed down by the enclosing
    /// network layer. Layers without a seeded checksum ignore it.
    fn init_checksum(&mut self, _seed: u32) {}

    /// Whether this packet is a plausible answer to `other` (request and
    /// reply correlation). Implementations check their own header pairing
    /// and delegate to their payloads.
    fn answers(&self, other: &dyn Packet) -> bool;

    /// Field equality against another layer of the same type, ignoring
    /// fields that are not comparable across an encode/decode round trip
    /// (checksum seeds, attached payloads, mutable hop fields).
    fn equals(&self, other: &dyn Packet) -> bool;

    /// Downcast support for `answers`/`equals` implementations.
    fn as_any(&self) -> &dyn Any;
}

/// Format a layer chain as `outer(...) | inner(...) | ...`, used by the
/// `Display` implementations of the protocol codecs.
pub fn fmt_chain(f: &mut fmt::Formatter<'_>, payload: Option<&dyn Packet>) -> fmt::Result {
    if let Some(p) = payload {
        write!(f, " | {}", p)?;
    }

    Ok(())
}

/// Downcast a packet to a concrete layer type, if the tag matches.
pub fn downcast<P: Any>(pkt: &dyn Packet) -> Option<&P> {
    pkt.as_any().downcast_ref::<P>()
}

/// Delegate an answers check to the payload layers. A layer that has a
/// payload expects the other side to have one too; a layer without payload
/// has nothing further to check.
pub fn payload_answers(mine: Option<&dyn Packet>, theirs: Option<&dyn Packet>) -> bool {
    match (mine, theirs) {
        (Some(p), Some(o)) => p.answers(o),
        (Some(_), None) => false,
        (None, _) => true,
    }
}
