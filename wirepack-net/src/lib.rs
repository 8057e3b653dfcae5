//! Sending and receiving packets over a capture source
//!
//! Hides the plumbing of using the codec and capture layers together: a
//! send packs a chain and injects it, a receive captures a frame and
//! decodes it, and [`send_recv`] correlates the two through the answers
//! relation with a wall-clock deadline.

use std::time::{Duration, Instant};

use tracing::debug;

use wirepack_capture::Source;
use wirepack_core::{Error, Packet, Result};
use wirepack_packet::layers;

/// Compose and pack the layers, inject the bytes into the source, and
/// return the composed chain for later correlation.
///
/// The outermost layer must match the source's link type.
pub fn send(source: &mut dyn Source, pkts: Vec<Box<dyn Packet>>) -> Result<Box<dyn Packet>> {
    let first = pkts
        .first()
        .ok_or_else(|| Error::Compose("cannot send an empty chain".into()))?;

    if first.packet_type() != source.link_type() {
        return Err(Error::LinkTypeMismatch {
            expected: source.link_type(),
            actual: first.packet_type(),
        });
    }

    let (chain, raw_pkt) = layers::pack(pkts)?;

    debug!(len = raw_pkt.len(), "injecting packet");
    source.inject(&raw_pkt)?;

    Ok(chain)
}

/// Capture a single frame from the source and decode it. Blocks until a
/// frame arrives on live sources; `Ok(None)` surfaces the end of a finite
/// stream.
pub fn recv(source: &mut dyn Source) -> Result<Option<Box<dyn Packet>>> {
    let Some(raw_pkt) = source.capture()? else {
        return Ok(None);
    };

    debug!(len = raw_pkt.len(), "captured packet");
    layers::unpack_all(&raw_pkt, source.link_type()).map(Some)
}

/// Send the chain and wait for the packet that answers it.
///
/// Captured packets that do not answer the sent chain are discarded. A zero
/// `timeout` waits forever; otherwise the wall clock is checked between
/// captures and [`Error::Timeout`] is returned once the deadline has
/// passed without an answer. `Ok(None)` surfaces the end of a finite
/// stream.
pub fn send_recv(
    source: &mut dyn Source,
    timeout: Duration,
    pkts: Vec<Box<dyn Packet>>,
) -> Result<Option<Box<dyn Packet>>> {
    let sent = send(source, pkts)?;
    let start = Instant::now();

    loop {
        let Some(pkt) = recv(source)? else {
            return Ok(None);
        };

        // an answer that raced the deadline still wins; only keep waiting
        // while time remains
        if pkt.answers(sent.as_ref()) {
            return Ok(Some(pkt));
        }

        if !timeout.is_zero() && start.elapsed() > timeout {
            return Err(Error::Timeout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use wirepack_core::{MacAddr, Type};
    use wirepack_filter::Filter;
    use wirepack_packet::{ethernet, icmpv4, ipv4};

    /// In-memory source feeding canned frames to the receive path.
    struct TestSource {
        link: Type,
        frames: VecDeque<Vec<u8>>,
        repeat: Option<Vec<u8>>,
        injected: Vec<Vec<u8>>,
    }

    impl TestSource {
        fn new(link: Type) -> Self {
            TestSource {
                link,
                frames: VecDeque::new(),
                repeat: None,
                injected: Vec::new(),
            }
        }
    }

    impl Source for TestSource {
        fn link_type(&self) -> Type {
            self.link
        }

        fn set_mtu(&mut self, _mtu: usize) -> Result<()> {
            Ok(())
        }

        fn set_promisc_mode(&mut self, _promisc: bool) -> Result<()> {
            Ok(())
        }

        fn set_monitor_mode(&mut self, _monitor: bool) -> Result<()> {
            Ok(())
        }

        fn apply_filter(&mut self, _filter: Filter) -> Result<()> {
            Ok(())
        }

        fn activate(&mut self) -> Result<()> {
            Ok(())
        }

        fn capture(&mut self) -> Result<Option<Vec<u8>>> {
            if let Some(frame) = self.frames.pop_front() {
                return Ok(Some(frame));
            }

            Ok(self.repeat.clone())
        }

        fn inject(&mut self, raw_pkt: &[u8]) -> Result<()> {
            self.injected.push(raw_pkt.to_vec());
            Ok(())
        }

        fn close(&mut self) {}
    }

    const MAC_A: MacAddr = MacAddr::new([0x4c, 0x72, 0xb9, 0x54, 0xe5, 0x3d]);
    const MAC_B: MacAddr = MacAddr::new([0x00, 0x21, 0x96, 0x6e, 0xf0, 0x70]);

    fn echo_request() -> Vec<Box<dyn Packet>> {
        let eth = Box::new(ethernet::Ethernet {
            src_addr: MAC_A,
            dst_addr: MAC_B,
            ..Default::default()
        });

        let ip = Box::new(ipv4::Ipv4 {
            src_addr: "192.168.1.135".parse().unwrap(),
            dst_addr: "8.8.8.8".parse().unwrap(),
            ..Default::default()
        });

        let icmp = Box::new(icmpv4::Icmpv4 {
            id: 42,
            seq: 7,
            ..Default::default()
        });

        vec![eth, ip, icmp]
    }

    fn echo_reply_frame(id: u16, seq: u16) -> Vec<u8> {
        let eth = Box::new(ethernet::Ethernet {
            src_addr: MAC_B,
            dst_addr: MAC_A,
            ..Default::default()
        });

        let ip = Box::new(ipv4::Ipv4 {
            src_addr: "8.8.8.8".parse().unwrap(),
            dst_addr: "192.168.1.135".parse().unwrap(),
            ..Default::default()
        });

        let icmp = Box::new(icmpv4::Icmpv4 {
            kind: icmpv4::Kind::EchoReply,
            id,
            seq,
            ..Default::default()
        });

        let (_, buf) = layers::pack(vec![
            eth as Box<dyn Packet>,
            ip as Box<dyn Packet>,
            icmp as Box<dyn Packet>,
        ])
        .unwrap();
        buf
    }

    #[test]
    fn test_send_injects_packed_chain() {
        let mut source = TestSource::new(Type::Eth);

        let chain = send(&mut source, echo_request()).unwrap();

        assert_eq!(chain.packet_type(), Type::Eth);
        assert_eq!(source.injected.len(), 1);
        assert_eq!(source.injected[0].len(), 42);
    }

    #[test]
    fn test_send_checks_link_type() {
        let mut source = TestSource::new(Type::Sll);

        let err = send(&mut source, echo_request()).unwrap_err();
        assert!(matches!(
            err,
            Error::LinkTypeMismatch {
                expected: Type::Sll,
                actual: Type::Eth
            }
        ));
    }

    #[test]
    fn test_recv_decodes_frame() {
        let mut source = TestSource::new(Type::Eth);
        source.frames.push_back(echo_reply_frame(42, 7));

        let pkt = recv(&mut source).unwrap().unwrap();

        assert_eq!(pkt.packet_type(), Type::Eth);
        assert_eq!(
            layers::find_layer(pkt.as_ref(), Type::Icmpv4)
                .unwrap()
                .packet_type(),
            Type::Icmpv4
        );
    }

    #[test]
    fn test_recv_surfaces_end_of_stream() {
        let mut source = TestSource::new(Type::Eth);

        assert!(recv(&mut source).unwrap().is_none());
    }

    #[test]
    fn test_send_recv_discards_non_answers() {
        let mut source = TestSource::new(Type::Eth);
        source.frames.push_back(echo_reply_frame(99, 1)); // unrelated
        source.frames.push_back(echo_reply_frame(42, 7));

        let answer = send_recv(&mut source, Duration::ZERO, echo_request())
            .unwrap()
            .unwrap();

        let icmp = wirepack_core::packet::downcast::<icmpv4::Icmpv4>(
            layers::find_layer(answer.as_ref(), Type::Icmpv4).unwrap(),
        )
        .unwrap();
        assert_eq!(icmp.id, 42);
        assert_eq!(icmp.seq, 7);
    }

    #[test]
    fn test_send_recv_times_out() {
        let mut source = TestSource::new(Type::Eth);
        source.repeat = Some(echo_reply_frame(99, 1));

        let err = send_recv(&mut source, Duration::from_nanos(1), echo_request()).unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[test]
    fn test_send_recv_end_of_stream() {
        let mut source = TestSource::new(Type::Eth);
        source.frames.push_back(echo_reply_frame(99, 1));

        let result = send_recv(&mut source, Duration::ZERO, echo_request()).unwrap();
        assert!(result.is_none());
    }
}
