//! The reliable-transport primitive and its KCP implementation.
//!
//! The tunnel owns scheduling and buffering around the primitive but never its
//! retransmission or congestion logic. Outgoing datagrams leave the primitive
//! through a [`DatagramSink`] and are written to the socket by a separate
//! driver, so no socket I/O happens while the primitive's lock is held.

use std::io::{self, Write};

use bytes::Bytes;
use kcp::Kcp;
use tokio::sync::mpsc;

use super::error::{TunnelError, TunnelResult};
use crate::core::TunnelConfig;

/// A sliding-window ARQ primitive that is not internally thread-safe.
///
/// Every call must be serialized by the caller.
pub trait ReliableTransport: Send + 'static {
    /// Queue application bytes for reliable delivery.
    fn submit(&mut self, data: &[u8]) -> TunnelResult<()>;

    /// Push queued segments out now instead of at the next tick.
    fn flush(&mut self) -> TunnelResult<()> {
        Ok(())
    }

    /// Feed one datagram received from the peer.
    fn ingest(&mut self, datagram: &[u8]) -> TunnelResult<()>;

    /// Take the next reassembled application chunk, if one is complete.
    fn drain(&mut self) -> Option<Vec<u8>>;

    /// Advance timers: retransmissions, window probes, ACK flushes.
    fn tick(&mut self, now_ms: u32) -> TunnelResult<()>;
}

/// Where the primitive writes datagrams destined for the peer.
#[derive(Debug, Clone)]
pub struct DatagramSink {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl DatagramSink {
    /// Create a sink and the receiver the output driver reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Write for DatagramSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // After shutdown nothing reads the queue; dropping is the only option.
        let _ = self.tx.send(Bytes::copy_from_slice(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// KCP-backed [`ReliableTransport`].
pub struct KcpTransport {
    kcp: Kcp<DatagramSink>,
}

impl std::fmt::Debug for KcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KcpTransport")
            .field("conv", &self.kcp.conv())
            .finish()
    }
}

impl KcpTransport {
    /// Create a KCP control block for conversation `conv` with `tuning` applied.
    pub fn new(conv: u32, tuning: &TunnelConfig, sink: DatagramSink) -> TunnelResult<Self> {
        tuning.validate()?;

        let mut kcp = Kcp::new(conv, sink);
        kcp.set_nodelay(
            tuning.no_delay,
            tuning.interval_ms as i32,
            tuning.fast_retransmit_count as i32,
            tuning.congestion_control_disabled,
        );
        kcp.set_wndsize(tuning.send_window as u16, tuning.recv_window as u16);
        kcp.set_mtu(tuning.mtu).map_err(kcp_error)?;

        Ok(Self { kcp })
    }

    /// Conversation id.
    pub fn conv(&self) -> u32 {
        self.kcp.conv()
    }
}

impl ReliableTransport for KcpTransport {
    fn submit(&mut self, data: &[u8]) -> TunnelResult<()> {
        self.kcp.send(data).map(|_| ()).map_err(kcp_error)
    }

    fn flush(&mut self) -> TunnelResult<()> {
        self.kcp.flush().map_err(kcp_error)
    }

    fn ingest(&mut self, datagram: &[u8]) -> TunnelResult<()> {
        self.kcp.input(datagram).map(|_| ()).map_err(kcp_error)
    }

    fn drain(&mut self) -> Option<Vec<u8>> {
        let size = self.kcp.peeksize().ok()?;
        let mut buf = vec![0u8; size];
        let n = self.kcp.recv(&mut buf).ok()?;
        buf.truncate(n);
        Some(buf)
    }

    fn tick(&mut self, now_ms: u32) -> TunnelResult<()> {
        self.kcp.update(now_ms).map_err(kcp_error)
    }
}

fn kcp_error(e: kcp::Error) -> TunnelError {
    TunnelError::Kcp(format!("{e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(conv: u32) -> (
        KcpTransport,
        mpsc::UnboundedReceiver<Bytes>,
        KcpTransport,
        mpsc::UnboundedReceiver<Bytes>,
    ) {
        let tuning = TunnelConfig::default();
        let (sink_a, out_a) = DatagramSink::channel();
        let (sink_b, out_b) = DatagramSink::channel();
        let a = KcpTransport::new(conv, &tuning, sink_a).unwrap();
        let b = KcpTransport::new(conv, &tuning, sink_b).unwrap();
        (a, out_a, b, out_b)
    }

    fn pump(from: &mut mpsc::UnboundedReceiver<Bytes>, to: &mut KcpTransport) {
        while let Ok(datagram) = from.try_recv() {
            let _ = to.ingest(&datagram);
        }
    }

    #[test]
    fn test_kcp_pair_delivers_in_order() {
        let (mut a, mut out_a, mut b, mut out_b) = pair(7);

        for i in 0..10u8 {
            a.submit(&[i; 16]).unwrap();
        }
        a.flush().unwrap();

        let mut received = Vec::new();
        for now in (0..200).step_by(10) {
            a.tick(now).unwrap();
            b.tick(now).unwrap();
            pump(&mut out_a, &mut b);
            pump(&mut out_b, &mut a);
            while let Some(chunk) = b.drain() {
                received.push(chunk);
            }
        }

        let expected: Vec<Vec<u8>> = (0..10u8).map(|i| vec![i; 16]).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn test_drain_empty_returns_none() {
        let (mut a, _out_a, _b, _out_b) = pair(1);
        assert!(a.drain().is_none());
    }

    #[test]
    fn test_conv_mismatch_is_rejected() {
        let tuning = TunnelConfig::default();
        let (sink_a, mut out_a) = DatagramSink::channel();
        let (sink_b, _out_b) = DatagramSink::channel();
        let mut a = KcpTransport::new(1, &tuning, sink_a).unwrap();
        let mut b = KcpTransport::new(2, &tuning, sink_b).unwrap();

        a.submit(b"wrong session").unwrap();
        // The first update flushes immediately.
        a.tick(0).unwrap();
        let datagram = out_a.try_recv().unwrap();
        assert!(b.ingest(&datagram).is_err());
        assert!(b.drain().is_none());
    }

    #[test]
    fn test_invalid_tuning_rejected() {
        let mut tuning = TunnelConfig::default();
        tuning.interval_ms = 0;
        let (sink, _rx) = DatagramSink::channel();
        assert!(matches!(
            KcpTransport::new(1, &tuning, sink),
            Err(TunnelError::Tuning(_))
        ));
    }

    #[test]
    fn test_conv_is_session_id() {
        let (sink, _rx) = DatagramSink::channel();
        let t = KcpTransport::new(0xDEAD_BEEF, &TunnelConfig::default(), sink).unwrap();
        assert_eq!(t.conv(), 0xDEAD_BEEF);
    }
}
