//! Packet capturing and injection on dump files
//!
//! Implements the [`Source`] trait natively over the standard
//! packet-capture dump format, without a capture library. Capturing walks
//! the records from the start of the file; injecting appends records at the
//! end, so the two never fight over one file position.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use wirepack_core::{Error, Result, Type};
use wirepack_filter::Filter;

use crate::source::Source;

const MAGIC_BE: [u8; 4] = [0xa1, 0xb2, 0xc3, 0xd4];
const MAGIC_LE: [u8; 4] = [0xd4, 0xc3, 0xb2, 0xa1];

const VERSION_MAJOR: u16 = 2;
const VERSION_MINOR: u16 = 4;
const DEFAULT_SNAPLEN: u32 = 0x7fff;

/// Byte order of a dump file, chosen by its magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    Big,
    Little,
}

impl Order {
    fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            Order::Big => u16::from_be_bytes(bytes),
            Order::Little => u16::from_le_bytes(bytes),
        }
    }

    fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Order::Big => u32::from_be_bytes(bytes),
            Order::Little => u32::from_le_bytes(bytes),
        }
    }

    fn u32_bytes(self, v: u32) -> [u8; 4] {
        match self {
            Order::Big => v.to_be_bytes(),
            Order::Little => v.to_le_bytes(),
        }
    }
}

/// A capture handle over a dump file.
///
/// Opening an existing file reads its global header and follows the byte
/// order its magic declares; opening a path that does not exist yet creates
/// the file with a big-endian header, version 2.4, the default snap length
/// and an Ethernet link type.
#[derive(Debug)]
pub struct Handle {
    path: PathBuf,
    reader: File,
    writer: File,
    order: Order,
    link: u32,
    snaplen: u32,
    filter: Option<Filter>,
    closed: bool,
}

impl Handle {
    /// Open the dump file at `path`, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Handle> {
        let path = path.as_ref();

        if !path.exists() {
            create_file(path)?;
        }

        let mut reader = File::open(path)?;
        reader.seek(SeekFrom::Start(0))?;

        let mut header = [0u8; 24];
        reader
            .read_exact(&mut header)
            .map_err(|_| Error::InvalidDump("header shorter than 24 bytes".into()))?;

        let magic = &header[..4];
        let order = if magic == MAGIC_BE {
            Order::Big
        } else if magic == MAGIC_LE {
            Order::Little
        } else {
            return Err(Error::InvalidDump("unrecognized magic".into()));
        };

        let snaplen = order.u32([header[16], header[17], header[18], header[19]]);
        let link = order.u32([header[20], header[21], header[22], header[23]]);

        debug!(
            path = %path.display(),
            version_major = order.u16([header[4], header[5]]),
            version_minor = order.u16([header[6], header[7]]),
            snaplen,
            link,
            "opened dump file"
        );

        // a separate handle for injection, always appending, so capture and
        // inject keep independent cursors
        let writer = OpenOptions::new().append(true).open(path)?;

        Ok(Handle {
            path: path.to_path_buf(),
            reader,
            writer,
            order,
            link,
            snaplen,
            filter: None,
            closed: false,
        })
    }

    /// The snap length declared in the file header.
    pub fn snaplen(&self) -> u32 {
        self.snaplen
    }

    /// The path this handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Io(io::Error::other("handle closed")));
        }

        Ok(())
    }
}

fn create_file(path: &Path) -> Result<()> {
    let mut file = File::create(path)?;

    file.write_all(&MAGIC_BE)?;
    file.write_all(&VERSION_MAJOR.to_be_bytes())?;
    file.write_all(&VERSION_MINOR.to_be_bytes())?;
    file.write_all(&[0u8; 8])?;
    file.write_all(&DEFAULT_SNAPLEN.to_be_bytes())?;
    file.write_all(&Type::Eth.to_link_type().to_be_bytes())?;

    debug!(path = %path.display(), "created dump file");

    Ok(())
}

impl Source for Handle {
    fn link_type(&self) -> Type {
        Type::from_link_type(self.link)
    }

    fn set_mtu(&mut self, _mtu: usize) -> Result<()> {
        Err(Error::Unsupported("MTU on a dump file"))
    }

    fn set_promisc_mode(&mut self, _promisc: bool) -> Result<()> {
        Err(Error::Unsupported("promiscuous mode on a dump file"))
    }

    fn set_monitor_mode(&mut self, _monitor: bool) -> Result<()> {
        Err(Error::Unsupported("monitor mode on a dump file"))
    }

    fn apply_filter(&mut self, filter: Filter) -> Result<()> {
        if !filter.validate() {
            return Err(Error::InvalidFilter("program failed validation".into()));
        }

        self.filter = Some(filter);
        Ok(())
    }

    /// Dump files need no activation; accepted so sources stay
    /// interchangeable.
    fn activate(&mut self) -> Result<()> {
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<Vec<u8>>> {
        self.check_open()?;

        loop {
            let mut header = [0u8; 16];
            if self.reader.read_exact(&mut header).is_err() {
                // ran off the end of the record stream
                return Ok(None);
            }

            let caplen = self.order.u32([header[8], header[9], header[10], header[11]]);
            if caplen == 0 {
                return Ok(None);
            }

            let mut raw_pkt = vec![0u8; caplen as usize];
            match self.reader.read_exact(&mut raw_pkt) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(Error::Io(e)),
            }

            if let Some(filter) = &self.filter {
                if !filter.matches(&raw_pkt) {
                    continue;
                }
            }

            return Ok(Some(raw_pkt));
        }
    }

    fn inject(&mut self, raw_pkt: &[u8]) -> Result<()> {
        self.check_open()?;

        let len = raw_pkt.len() as u32;

        // record header: seconds, microseconds, captured and wire length
        self.writer.write_all(&self.order.u32_bytes(0))?;
        self.writer.write_all(&self.order.u32_bytes(0))?;
        self.writer.write_all(&self.order.u32_bytes(len))?;
        self.writer.write_all(&self.order.u32_bytes(len))?;
        self.writer.write_all(raw_pkt)?;
        self.writer.flush()?;

        debug!(path = %self.path.display(), len, "injected packet");

        Ok(())
    }

    fn close(&mut self) {
        let _ = self.writer.flush();
        self.closed = true;
    }
}
