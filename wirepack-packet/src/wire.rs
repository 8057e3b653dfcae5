//! Fixed-width address reads shared by the codecs

use std::net::{Ipv4Addr, Ipv6Addr};

use wirepack_core::{Buffer, Error, MacAddr, Result};

pub(crate) fn read_mac(buf: &mut Buffer) -> Result<MacAddr> {
    let bytes = buf.next(6);
    MacAddr::from_slice(bytes).ok_or(Error::Truncated {
        need: 6,
        have: bytes.len(),
    })
}

pub(crate) fn read_ipv4(buf: &mut Buffer) -> Result<Ipv4Addr> {
    let bytes = buf.next(4);
    if bytes.len() < 4 {
        return Err(Error::Truncated {
            need: 4,
            have: bytes.len(),
        });
    }

    Ok(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]))
}

pub(crate) fn read_ipv6(buf: &mut Buffer) -> Result<Ipv6Addr> {
    let bytes = buf.next(16);
    if bytes.len() < 16 {
        return Err(Error::Truncated {
            need: 16,
            have: bytes.len(),
        });
    }

    let mut octets = [0u8; 16];
    octets.copy_from_slice(bytes);
    Ok(Ipv6Addr::from(octets))
}
