//! The data-plane tunnel.
//!
//! Three drivers run per tunnel:
//!
//! - the tick driver advances the primitive's timers every `tick_interval`;
//! - the receive driver reads datagrams, feeds the primitive, and turns the
//!   reassembled byte stream into decoded messages;
//! - the output driver writes the primitive's datagrams to the socket.
//!
//! The primitive lives behind one mutex. Every call into it (tick, ingest plus
//! drain, submit plus flush) happens inside that lock and no lock section
//! awaits, so calls never overlap and socket I/O never stalls the primitive.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::clock::TickClock;
use super::error::{TunnelError, TunnelResult, is_transient};
use super::primitive::{DatagramSink, KcpTransport, ReliableTransport};
use super::socket::DataPlaneSocket;
use super::stats::{TunnelStats, TunnelStatsSnapshot};
use crate::core::constants::{
    DEFAULT_INBOUND_QUEUE, DEFAULT_MAX_FRAME_PAYLOAD, DEFAULT_REASSEMBLY_CAPACITY,
    DEFAULT_TICK_INTERVAL, EXPECTED_PROTOCOL_MAJOR_VERSION, UDP_RECV_BUFFER_SIZE,
};
use crate::core::{MessageCodec, TunnelConfig, UpMessage, VersionGate, VersionPolicy};
use crate::framing::{self, ReassemblyBuffer};

/// Scheduling and buffering knobs of a tunnel.
#[derive(Debug, Clone)]
pub struct TunnelOptions {
    /// Period of the tick driver.
    pub tick_interval: Duration,
    /// Reassembly buffer capacity.
    pub reassembly_capacity: usize,
    /// Largest payload accepted by [`DataPlaneTunnel::send_payload`].
    pub max_frame_payload: usize,
    /// Decoded messages buffered for the consumer. Messages arriving while
    /// the queue is full are dropped and counted.
    pub inbound_queue: usize,
    /// Protocol major version expected in every inbound message.
    pub expected_version: u32,
    /// What to do when a message carries another version.
    pub version_policy: VersionPolicy,
}

impl Default for TunnelOptions {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            reassembly_capacity: DEFAULT_REASSEMBLY_CAPACITY,
            max_frame_payload: DEFAULT_MAX_FRAME_PAYLOAD,
            inbound_queue: DEFAULT_INBOUND_QUEUE,
            expected_version: EXPECTED_PROTOCOL_MAJOR_VERSION,
            version_policy: VersionPolicy::Warn,
        }
    }
}

/// Primitive slot shared by the drivers and the send path. `None` once released.
type SharedPrimitive<T> = Arc<Mutex<Option<T>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic inside a primitive call leaves no invariant of ours broken.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Receiving end of a tunnel's decoded messages.
#[derive(Debug)]
pub struct TunnelReceiver<M> {
    rx: mpsc::Receiver<M>,
}

impl<M> TunnelReceiver<M> {
    /// Wait for the next message. `None` once the receive driver has stopped.
    pub async fn recv(&mut self) -> Option<M> {
        self.rx.recv().await
    }

    /// Take a message if one is already queued.
    ///
    /// [`TryRecvError::Empty`] means nothing has arrived yet,
    /// [`TryRecvError::Disconnected`] that the receive driver has stopped.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.rx.try_recv()
    }
}

/// Reliable message tunnel over UDP.
pub struct DataPlaneTunnel<C: MessageCodec, T: ReliableTransport = KcpTransport> {
    primitive: SharedPrimitive<T>,
    codec: C,
    session_id: u32,
    local_addr: SocketAddr,
    remote: SocketAddr,
    max_frame_payload: usize,
    closed: AtomicBool,
    cancel: CancellationToken,
    drivers: tokio::sync::Mutex<Vec<JoinHandle<TunnelResult<()>>>>,
    stats: Arc<TunnelStats>,
}

impl<C: MessageCodec, T: ReliableTransport> std::fmt::Debug for DataPlaneTunnel<C, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPlaneTunnel")
            .field("session_id", &self.session_id)
            .field("local_addr", &self.local_addr)
            .field("remote", &self.remote)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<C: MessageCodec> DataPlaneTunnel<C, KcpTransport> {
    /// Activate a KCP tunnel to `remote` for conversation `session_id`.
    ///
    /// Must be called inside a Tokio runtime; the drivers are spawned here.
    pub fn activate(
        socket: DataPlaneSocket,
        remote: SocketAddr,
        session_id: u32,
        tuning: &TunnelConfig,
        codec: C,
        options: TunnelOptions,
    ) -> TunnelResult<(Self, TunnelReceiver<C::Up>)> {
        Self::activate_with(socket, remote, session_id, codec, options, |sink| {
            KcpTransport::new(session_id, tuning, sink)
        })
    }
}

impl<C: MessageCodec, T: ReliableTransport> DataPlaneTunnel<C, T> {
    /// Activate a tunnel around a primitive built by `make_transport`.
    pub fn activate_with<F>(
        socket: DataPlaneSocket,
        remote: SocketAddr,
        session_id: u32,
        codec: C,
        options: TunnelOptions,
        make_transport: F,
    ) -> TunnelResult<(Self, TunnelReceiver<C::Up>)>
    where
        F: FnOnce(DatagramSink) -> TunnelResult<T>,
    {
        let (sink, outgoing) = DatagramSink::channel();
        let primitive: SharedPrimitive<T> = Arc::new(Mutex::new(Some(make_transport(sink)?)));
        let (inbound_tx, inbound_rx) = mpsc::channel(options.inbound_queue.max(1));
        let cancel = CancellationToken::new();
        let stats = Arc::new(TunnelStats::default());
        let udp = socket.socket_arc();
        let local_addr = socket.local_addr();

        let tick = tokio::spawn(tick_driver(
            Arc::clone(&primitive),
            TickClock::new(),
            options.tick_interval,
            cancel.clone(),
        ));
        let output = tokio::spawn(output_driver(
            Arc::clone(&udp),
            remote,
            outgoing,
            cancel.clone(),
            Arc::clone(&stats),
        ));
        let receive = tokio::spawn(receive_driver(ReceiveDriver {
            primitive: Arc::clone(&primitive),
            socket: udp,
            codec: codec.clone(),
            reassembly: ReassemblyBuffer::with_capacity(options.reassembly_capacity),
            inbound: inbound_tx,
            versions: VersionGate::new(options.expected_version, options.version_policy),
            cancel: cancel.clone(),
            stats: Arc::clone(&stats),
            congested: false,
        }));

        info!(
            session_id,
            local = %local_addr,
            remote = %remote,
            "data plane tunnel active"
        );

        let tunnel = Self {
            primitive,
            codec,
            session_id,
            local_addr,
            remote,
            max_frame_payload: options.max_frame_payload,
            closed: AtomicBool::new(false),
            cancel,
            drivers: tokio::sync::Mutex::new(vec![tick, output, receive]),
            stats,
        };
        Ok((tunnel, TunnelReceiver { rx: inbound_rx }))
    }

    /// Encode, frame, and submit one message.
    pub fn send(&self, message: &C::Down) -> TunnelResult<()> {
        self.send_payload(&self.codec.encode(message))
    }

    /// Frame and submit an already-encoded payload.
    ///
    /// The primitive is flushed right after submission, so the segment leaves
    /// without waiting for the next tick.
    pub fn send_payload(&self, payload: &[u8]) -> TunnelResult<()> {
        if self.is_closed() {
            return Err(TunnelError::ChannelClosed);
        }
        let frame = framing::encode(payload, self.max_frame_payload)?;

        {
            let mut guard = lock(&self.primitive);
            let primitive = guard.as_mut().ok_or(TunnelError::ChannelClosed)?;
            primitive.submit(&frame)?;
            primitive.flush()?;
        }

        self.stats.record_sent(frame.len());
        trace!(len = payload.len(), "frame submitted");
        Ok(())
    }

    /// Stop the drivers and release the primitive.
    ///
    /// Returns the first error a driver ended with. A second call returns
    /// `Ok(())` once the first has finished.
    pub async fn shutdown(&self) -> TunnelResult<()> {
        let mut drivers = self.drivers.lock().await;
        self.closed.store(true, Ordering::SeqCst);
        self.cancel.cancel();

        let mut first_error = None;
        for handle in drivers.drain(..) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(TunnelError::Driver(e.to_string())),
            };
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }

        if lock(&self.primitive).take().is_some() {
            info!(session_id = self.session_id, "data plane tunnel shut down");
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Check if shutdown has begun.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Conversation id shared with the peer.
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Local socket address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Peer address datagrams are sent to.
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// Current counters.
    pub fn stats(&self) -> TunnelStatsSnapshot {
        self.stats.snapshot()
    }
}

impl<C: MessageCodec, T: ReliableTransport> Drop for DataPlaneTunnel<C, T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn tick_driver<T: ReliableTransport>(
    primitive: SharedPrimitive<T>,
    clock: TickClock,
    period: Duration,
    cancel: CancellationToken,
) -> TunnelResult<()> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = interval.tick() => {}
        }

        let result = {
            let mut guard = lock(&primitive);
            match guard.as_mut() {
                Some(p) => p.tick(clock.now_ms()),
                None => return Ok(()),
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "tick failed");
        }
    }
}

async fn output_driver(
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
    mut outgoing: mpsc::UnboundedReceiver<Bytes>,
    cancel: CancellationToken,
    stats: Arc<TunnelStats>,
) -> TunnelResult<()> {
    loop {
        let datagram = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            next = outgoing.recv() => match next {
                Some(d) => d,
                None => return Ok(()),
            },
        };

        // A lost datagram is the primitive's to retransmit.
        match socket.send_to(&datagram, remote).await {
            Ok(_) => stats.record_datagram_out(),
            Err(e) if is_transient(&e) => debug!(error = %e, "datagram send refused"),
            Err(e) => warn!(error = %e, %remote, "datagram send failed"),
        }
    }
}

struct ReceiveDriver<C: MessageCodec, T> {
    primitive: SharedPrimitive<T>,
    socket: Arc<UdpSocket>,
    codec: C,
    reassembly: ReassemblyBuffer,
    inbound: mpsc::Sender<C::Up>,
    versions: VersionGate,
    cancel: CancellationToken,
    stats: Arc<TunnelStats>,
    congested: bool,
}

async fn receive_driver<C: MessageCodec, T: ReliableTransport>(
    mut ctx: ReceiveDriver<C, T>,
) -> TunnelResult<()> {
    let mut buf = vec![0u8; UDP_RECV_BUFFER_SIZE];
    let mut chunks = Vec::new();

    loop {
        let (len, from) = tokio::select! {
            _ = ctx.cancel.cancelled() => return Ok(()),
            received = ctx.socket.recv_from(&mut buf) => match received {
                Ok(r) => r,
                Err(e) if is_transient(&e) => {
                    debug!(error = %e, "transient receive error");
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "data plane receive failed");
                    return Err(e.into());
                }
            },
        };
        ctx.stats.record_datagram_in();

        let ingested = {
            let mut guard = lock(&ctx.primitive);
            let Some(primitive) = guard.as_mut() else {
                return Ok(());
            };
            let result = primitive.ingest(&buf[..len]);
            while let Some(chunk) = primitive.drain() {
                chunks.push(chunk);
            }
            result
        };
        if let Err(e) = ingested {
            debug!(%from, error = %e, "datagram rejected");
        }

        for chunk in chunks.drain(..) {
            if let Err(e) = ctx.reassembly.append(&chunk) {
                ctx.stats.record_overflow();
                error!(error = %e, "reassembly overflow, buffer reset");
                continue;
            }

            let out = framing::scan(ctx.reassembly.as_slice(), &ctx.codec);
            ctx.reassembly.consume_prefix(out.advance());
            ctx.stats
                .record_scan(out.messages.len(), out.decode_errors.len(), out.resync_skipped);
            if out.resync_skipped > 0 {
                debug!(skipped = out.resync_skipped, "resynchronized frame stream");
            }
            for e in &out.decode_errors {
                warn!(error = %e, "dropping undecodable frame");
            }

            for message in out.messages {
                if let Some(log) = message.peer_log() {
                    warn!(peer_log = log, "controller log");
                }

                let actual = message.protocol_major_version();
                if actual != ctx.versions.expected() {
                    ctx.stats.record_version_mismatch();
                }
                if let Err(mismatch) = ctx.versions.check(actual) {
                    error!(error = %mismatch, "closing data plane");
                    return Err(mismatch.into());
                }

                trace!("message decoded");
                // Never wait on the consumer: ACK processing depends on this loop.
                match ctx.inbound.try_send(message) {
                    Ok(()) => ctx.congested = false,
                    Err(TrySendError::Full(_)) => {
                        ctx.stats.record_inbound_dropped();
                        if !ctx.congested {
                            ctx.congested = true;
                            warn!("inbound queue full, dropping messages");
                        }
                    }
                    Err(TrySendError::Closed(_)) => trace!("receiver dropped, discarding message"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VersionMismatch;
    use crate::test_support::{TestCodec, TestDown, TestUp};
    use std::sync::atomic::AtomicUsize;
    use tokio::time::timeout;

    /// Wraps a primitive and counts calls that start while another is running.
    struct RecordingTransport {
        inner: KcpTransport,
        in_call: Arc<AtomicBool>,
        overlaps: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
        dropped: Arc<AtomicBool>,
    }

    #[derive(Clone, Default)]
    struct Recorder {
        in_call: Arc<AtomicBool>,
        overlaps: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
        dropped: Arc<AtomicBool>,
    }

    impl Recorder {
        fn wrap(&self, inner: KcpTransport) -> RecordingTransport {
            RecordingTransport {
                inner,
                in_call: Arc::clone(&self.in_call),
                overlaps: Arc::clone(&self.overlaps),
                calls: Arc::clone(&self.calls),
                dropped: Arc::clone(&self.dropped),
            }
        }
    }

    impl RecordingTransport {
        fn record<R>(&mut self, f: impl FnOnce(&mut KcpTransport) -> R) -> R {
            if self.in_call.swap(true, Ordering::SeqCst) {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            for _ in 0..64 {
                std::hint::spin_loop();
            }
            let result = f(&mut self.inner);
            self.in_call.store(false, Ordering::SeqCst);
            result
        }
    }

    impl ReliableTransport for RecordingTransport {
        fn submit(&mut self, data: &[u8]) -> TunnelResult<()> {
            self.record(|t| t.submit(data))
        }
        fn flush(&mut self) -> TunnelResult<()> {
            self.record(|t| t.flush())
        }
        fn ingest(&mut self, datagram: &[u8]) -> TunnelResult<()> {
            self.record(|t| t.ingest(datagram))
        }
        fn drain(&mut self) -> Option<Vec<u8>> {
            self.record(|t| t.drain())
        }
        fn tick(&mut self, now_ms: u32) -> TunnelResult<()> {
            self.record(|t| t.tick(now_ms))
        }
    }

    impl Drop for RecordingTransport {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    async fn loopback_sockets() -> (DataPlaneSocket, DataPlaneSocket) {
        let a = DataPlaneSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b = DataPlaneSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        (a, b)
    }

    fn message(version: u8, seq: u32) -> TestDown {
        let mut bytes = vec![version];
        bytes.extend_from_slice(&seq.to_le_bytes());
        bytes.extend_from_slice(&[0xAB; 27]);
        TestDown::Raw(bytes)
    }

    fn seq_of(up: &TestUp) -> u32 {
        u32::from_le_bytes(up.body[..4].try_into().unwrap())
    }

    async fn collect(rx: &mut TunnelReceiver<TestUp>, count: usize) -> Vec<u32> {
        let mut seqs = Vec::with_capacity(count);
        while seqs.len() < count {
            match rx.recv().await {
                Some(up) => seqs.push(seq_of(&up)),
                None => break,
            }
        }
        seqs
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_traffic_never_overlaps_primitive_calls() {
        const COUNT: u32 = 200;
        let (sock_a, sock_b) = loopback_sockets().await;
        let addr_a = sock_a.local_addr();
        let addr_b = sock_b.local_addr();
        let tuning = TunnelConfig::default();
        let recorder = Recorder::default();

        let wrap = recorder.clone();
        let (a, mut rx_a) = DataPlaneTunnel::activate_with(
            sock_a,
            addr_b,
            42,
            TestCodec,
            TunnelOptions::default(),
            |sink| Ok(wrap.wrap(KcpTransport::new(42, &tuning, sink)?)),
        )
        .unwrap();
        let (b, mut rx_b) = DataPlaneTunnel::activate(
            sock_b,
            addr_a,
            42,
            &tuning,
            TestCodec,
            TunnelOptions::default(),
        )
        .unwrap();
        let a = Arc::new(a);

        // A submits from another task while its drivers receive from B.
        let sender = {
            let a = Arc::clone(&a);
            tokio::spawn(async move {
                for seq in 0..COUNT {
                    a.send(&message(1, seq)).unwrap();
                    if seq % 16 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        };
        for seq in 0..COUNT {
            b.send(&message(1, seq)).unwrap();
        }

        let at_a = timeout(Duration::from_secs(10), collect(&mut rx_a, COUNT as usize))
            .await
            .unwrap();
        let at_b = timeout(Duration::from_secs(10), collect(&mut rx_b, COUNT as usize))
            .await
            .unwrap();
        sender.await.unwrap();

        let expected: Vec<u32> = (0..COUNT).collect();
        assert_eq!(at_a, expected);
        assert_eq!(at_b, expected);
        assert_eq!(recorder.overlaps.load(Ordering::SeqCst), 0);
        assert!(recorder.calls.load(Ordering::SeqCst) > 0);

        let stats = a.stats();
        assert_eq!(stats.frames_sent, u64::from(COUNT));
        assert_eq!(stats.frames_decoded, u64::from(COUNT));
        assert_eq!(stats.decode_errors, 0);

        a.shutdown().await.unwrap();
        b.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unread_receiver_does_not_stall_sends() {
        let (sock_a, sock_b) = loopback_sockets().await;
        let addr_a = sock_a.local_addr();
        let addr_b = sock_b.local_addr();
        let tuning = TunnelConfig::default();
        let small_queue = TunnelOptions {
            inbound_queue: 4,
            ..TunnelOptions::default()
        };

        // A's receiver is kept alive but never read.
        let (a, mut rx_a) =
            DataPlaneTunnel::activate(sock_a, addr_b, 11, &tuning, TestCodec, small_queue)
                .unwrap();
        let (b, mut rx_b) = DataPlaneTunnel::activate(
            sock_b,
            addr_a,
            11,
            &tuning,
            TestCodec,
            TunnelOptions::default(),
        )
        .unwrap();

        for seq in 0..400 {
            b.send(&message(1, seq)).unwrap();
        }
        timeout(Duration::from_secs(10), async {
            while a.stats().frames_decoded < 400 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        for seq in 0..300 {
            a.send(&message(1, seq)).unwrap();
        }
        let at_b = timeout(Duration::from_secs(10), collect(&mut rx_b, 300))
            .await
            .unwrap();
        assert_eq!(at_b, (0..300).collect::<Vec<u32>>());

        assert_eq!(a.stats().inbound_dropped, 396);
        assert_eq!(rx_a.try_recv().map(|up| seq_of(&up)), Ok(0));

        a.shutdown().await.unwrap();
        b.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_try_recv_distinguishes_empty_from_ended() {
        let (sock_a, sock_b) = loopback_sockets().await;
        let (tunnel, mut rx) = DataPlaneTunnel::activate(
            sock_a,
            sock_b.local_addr(),
            12,
            &TunnelConfig::default(),
            TestCodec,
            TunnelOptions::default(),
        )
        .unwrap();

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        tunnel.shutdown().await.unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_releases_primitive() {
        let (sock_a, sock_b) = loopback_sockets().await;
        let remote = sock_b.local_addr();
        let recorder = Recorder::default();
        let wrap = recorder.clone();

        let (tunnel, _rx) = DataPlaneTunnel::activate_with(
            sock_a,
            remote,
            9,
            TestCodec,
            TunnelOptions::default(),
            |sink| Ok(wrap.wrap(KcpTransport::new(9, &TunnelConfig::default(), sink)?)),
        )
        .unwrap();

        tunnel.send(&message(1, 0)).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        tunnel.shutdown().await.unwrap();
        assert!(tunnel.is_closed());
        assert!(recorder.dropped.load(Ordering::SeqCst));

        let calls = recorder.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(recorder.calls.load(Ordering::SeqCst), calls);

        tunnel.shutdown().await.unwrap();
        assert!(matches!(
            tunnel.send(&message(1, 1)),
            Err(TunnelError::ChannelClosed)
        ));
        drop(sock_b);
    }

    #[tokio::test]
    async fn test_oversized_payload_rejected() {
        let (sock_a, sock_b) = loopback_sockets().await;
        let options = TunnelOptions {
            max_frame_payload: 16,
            ..TunnelOptions::default()
        };
        let (tunnel, _rx) = DataPlaneTunnel::activate(
            sock_a,
            sock_b.local_addr(),
            3,
            &TunnelConfig::default(),
            TestCodec,
            options,
        )
        .unwrap();

        assert!(matches!(
            tunnel.send_payload(&[0u8; 17]),
            Err(TunnelError::Frame(_))
        ));
        assert!(tunnel.send_payload(&[1u8; 16]).is_ok());
        assert_eq!(tunnel.stats().frames_sent, 1);
        tunnel.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_strict_version_mismatch_closes_stream() {
        let (sock_a, sock_b) = loopback_sockets().await;
        let addr_a = sock_a.local_addr();
        let addr_b = sock_b.local_addr();
        let tuning = TunnelConfig::default();

        let strict = TunnelOptions {
            version_policy: VersionPolicy::Strict,
            ..TunnelOptions::default()
        };
        let (a, mut rx_a) =
            DataPlaneTunnel::activate(sock_a, addr_b, 5, &tuning, TestCodec, strict).unwrap();
        let (b, _rx_b) = DataPlaneTunnel::activate(
            sock_b,
            addr_a,
            5,
            &tuning,
            TestCodec,
            TunnelOptions::default(),
        )
        .unwrap();

        b.send(&message(1, 0)).unwrap();
        b.send(&message(2, 1)).unwrap();

        let first = timeout(Duration::from_secs(5), rx_a.recv()).await.unwrap();
        assert_eq!(first.map(|up| seq_of(&up)), Some(0));
        let closed = timeout(Duration::from_secs(5), rx_a.recv()).await.unwrap();
        assert!(closed.is_none());

        assert!(matches!(
            a.shutdown().await,
            Err(TunnelError::ProtocolVersionMismatch(VersionMismatch {
                expected: 1,
                actual: 2
            }))
        ));
        assert_eq!(a.stats().version_mismatches, 1);
        b.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_warn_policy_delivers_mismatched_version() {
        let (sock_a, sock_b) = loopback_sockets().await;
        let addr_a = sock_a.local_addr();
        let addr_b = sock_b.local_addr();
        let tuning = TunnelConfig::default();

        let (a, mut rx_a) = DataPlaneTunnel::activate(
            sock_a,
            addr_b,
            6,
            &tuning,
            TestCodec,
            TunnelOptions::default(),
        )
        .unwrap();
        let (b, _rx_b) = DataPlaneTunnel::activate(
            sock_b,
            addr_a,
            6,
            &tuning,
            TestCodec,
            TunnelOptions::default(),
        )
        .unwrap();

        b.send(&message(3, 7)).unwrap();
        // An empty payload fails to decode and is counted, not delivered.
        b.send(&TestDown::Raw(Vec::new())).unwrap();
        b.send(&message(1, 8)).unwrap();

        let first = timeout(Duration::from_secs(5), rx_a.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.version, 3);
        assert_eq!(seq_of(&first), 7);
        let second = timeout(Duration::from_secs(5), rx_a.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seq_of(&second), 8);

        let stats = a.stats();
        assert_eq!(stats.version_mismatches, 1);
        assert_eq!(stats.decode_errors, 1);
        a.shutdown().await.unwrap();
        b.shutdown().await.unwrap();
    }
}
