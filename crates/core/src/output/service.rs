use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::bridge::UNIVERSE_SIZE;
use crate::output::output_config::{OutputConfig, Protocol, MAX_FRAME_RATE_HZ};
use crate::output::transport::Transport;
use crate::protocol::{artnet, sacn};

/// Milliseconds between output frames at the given rate, truncated to
/// whole milliseconds (44 Hz -> 22 ms).
pub fn frame_interval_ms(frame_rate_hz: f64) -> u64 {
    (1000.0 / frame_rate_hz) as u64
}

struct ServiceState {
    config: Mutex<OutputConfig>,
    frames: Mutex<HashMap<u16, [u8; UNIVERSE_SIZE]>>,
    sequences: Mutex<HashMap<u16, u8>>,
    frames_sent: AtomicU64,
    running: AtomicBool,
}

impl ServiceState {
    fn next_sequence(&self, universe: u16, protocol: Protocol) -> u8 {
        let mut sequences = self.sequences.lock();
        let slot = sequences.entry(universe).or_insert(match protocol {
            Protocol::ArtNet => 1,
            Protocol::Sacn => 0,
        });
        let current = *slot;
        *slot = match (protocol, current) {
            (Protocol::ArtNet, 255) => 1,
            (Protocol::Sacn, 255) => 0,
            (_, value) => value + 1,
        };
        current
    }
}

/// Paces DMX transmission: encodes the current frame of every
/// universe and hands the packets to the transport at a fixed cadence.
///
/// DMX frames are state-replacing, not deltas, so per-packet send
/// failures are swallowed; the next scheduled frame supersedes the
/// lost one.
pub struct OutputService {
    state: Arc<ServiceState>,
    transport: Arc<dyn Transport>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl OutputService {
    pub fn new(config: OutputConfig, transport: Arc<dyn Transport>) -> Self {
        let mut config = config;
        config.frame_rate_hz = config.frame_rate_hz.clamp(1.0, MAX_FRAME_RATE_HZ);
        OutputService {
            state: Arc::new(ServiceState {
                config: Mutex::new(config),
                frames: Mutex::new(HashMap::new()),
                sequences: Mutex::new(HashMap::new()),
                frames_sent: AtomicU64::new(0),
                running: AtomicBool::new(false),
            }),
            transport,
            task: Mutex::new(None),
        }
    }

    // --- frame store ---------------------------------------------------

    /// Replace the whole frame store.
    pub fn set_frames(&self, frames: HashMap<u16, [u8; UNIVERSE_SIZE]>) {
        *self.state.frames.lock() = frames;
    }

    /// Replace a single universe's frame.
    pub fn set_universe(&self, universe: u16, data: [u8; UNIVERSE_SIZE]) {
        self.state.frames.lock().insert(universe, data);
    }

    pub fn clear_frames(&self) {
        self.state.frames.lock().clear();
    }

    // --- configuration -------------------------------------------------

    pub fn set_protocol(&self, protocol: Protocol) {
        let mut config = self.state.config.lock();
        if config.protocol != protocol {
            log::info!("Output protocol switched to {}", protocol.as_str());
            config.protocol = protocol;
            config.port = protocol.default_port();
        }
    }

    /// Set the target frame rate, clamped to the DMX512 ceiling.
    pub fn set_frame_rate(&self, frame_rate_hz: f64) {
        self.state.config.lock().frame_rate_hz = frame_rate_hz.clamp(1.0, MAX_FRAME_RATE_HZ);
    }

    // --- observability -------------------------------------------------

    /// Lifetime frame counter. Advances only when at least one packet
    /// was actually handed to the transport.
    pub fn frames_sent(&self) -> u64 {
        self.state.frames_sent.load(Ordering::Relaxed)
    }

    /// Next sequence number for a universe, if it has sent before.
    pub fn sequence(&self, universe: u16) -> Option<u8> {
        self.state.sequences.lock().get(&universe).copied()
    }

    // --- transmission --------------------------------------------------

    /// Encode and send one packet per universe with frame data.
    /// Returns how many packets reached the transport. The engine
    /// loop calls this every interval; hosts may call it directly to
    /// push a frame out of cadence.
    pub fn send_once(&self) -> usize {
        Self::transmit(&self.state, self.transport.as_ref())
    }

    fn transmit(state: &ServiceState, transport: &dyn Transport) -> usize {
        let config = state.config.lock().clone();
        let frames = state.frames.lock().clone();

        let mut sent = 0;
        for (universe, data) in &frames {
            let sequence = state.next_sequence(*universe, config.protocol);
            let packet = match config.protocol {
                Protocol::ArtNet => artnet::encode_art_dmx(sequence, 0, *universe, data),
                Protocol::Sacn => sacn::encode(
                    &config.cid,
                    &config.source_name,
                    config.priority,
                    sequence,
                    0,
                    *universe,
                    data,
                ),
            };
            match transport.send(&packet, config.destination(*universe), config.port) {
                Ok(()) => sent += 1,
                Err(err) => {
                    // Fire-and-forget: the next frame supersedes this one.
                    log::debug!("Send failed for universe {universe}: {err:#}");
                }
            }
        }
        if sent > 0 {
            state.frames_sent.fetch_add(1, Ordering::Relaxed);
        }
        sent
    }

    // --- loop control --------------------------------------------------

    /// Start the transmit loop. Idempotent; resets sequence and frame
    /// counters.
    pub fn start(&self) {
        if self.state.running.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.sequences.lock().clear();
        self.state.frames_sent.store(0, Ordering::Relaxed);

        let state = Arc::clone(&self.state);
        let transport = Arc::clone(&self.transport);
        let rate = state.config.lock().frame_rate_hz;
        log::info!("Output service started at {rate}Hz");
        let handle = tokio::spawn(async move {
            while state.running.load(Ordering::SeqCst) {
                let frame_started = Instant::now();
                Self::transmit(&state, transport.as_ref());

                let interval =
                    Duration::from_millis(frame_interval_ms(state.config.lock().frame_rate_hz));
                let spent = frame_started.elapsed();
                if spent < interval {
                    tokio::time::sleep(interval - spent).await;
                }
            }
            log::info!("Output service loop exited");
        });
        *self.task.lock() = Some(handle);
    }

    /// Stop scheduling further frames. Idempotent; an in-flight frame
    /// completes.
    pub fn stop(&self) {
        if !self.state.running.swap(false, Ordering::SeqCst) {
            return;
        }
        log::info!(
            "Output service stopping after {} frames",
            self.state.frames_sent.load(Ordering::Relaxed)
        );
        self.task.lock().take();
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }
}
