//! The packet source capability

use wirepack_core::{Result, Type};
use wirepack_filter::Filter;

/// A handle that produces and swallows raw frames.
///
/// Configuration (MTU, promiscuous and monitor mode, filter) happens before
/// [`activate`](Source::activate); sources may refuse changes afterwards
/// with [`Error::AlreadyActive`](wirepack_core::Error::AlreadyActive). A
/// handle is exclusively owned; concurrent capture and injection on the
/// same handle is not defined.
pub trait Source {
    /// The protocol of the outermost layer of every frame this source
    /// produces.
    fn link_type(&self) -> Type;

    /// Request a maximum capture length.
    fn set_mtu(&mut self, mtu: usize) -> Result<()>;

    /// Enable or disable promiscuous mode.
    fn set_promisc_mode(&mut self, promisc: bool) -> Result<()>;

    /// Enable or disable monitor mode. Only meaningful for RF sources.
    fn set_monitor_mode(&mut self, monitor: bool) -> Result<()>;

    /// Attach a filter; only matching frames are captured. The filter is
    /// validated first and refused if malformed.
    fn apply_filter(&mut self, filter: Filter) -> Result<()>;

    /// Freeze the configuration and start the source.
    fn activate(&mut self) -> Result<()>;

    /// Capture a single frame. Blocks on live sources; returns `Ok(None)`
    /// at the end of a finite stream. The caller owns the returned buffer.
    fn capture(&mut self) -> Result<Option<Vec<u8>>>;

    /// Inject a single frame.
    fn inject(&mut self, raw_pkt: &[u8]) -> Result<()>;

    /// Release the source.
    fn close(&mut self);
}
