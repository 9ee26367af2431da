pub use beat::{BeatSource, BeatState, InternalClock};
pub use bridge::{convert_outputs, UNIVERSE_SIZE};
pub use color::{blend, lerp, BlendMode, Color};
pub use effect::effect::{
    effect_phase, Effect, EffectParams, EffectRegistry, FrameContext, Movement,
};
pub use effect::library::builtin_registry;
pub use engine::compositor::{
    build_frame, normalize_positions, Compositor, EffectLayer, FixtureOutput, FrameEvaluator,
    DEFAULT_TICK_INTERVAL,
};
pub use engine::triple_buffer::{triple_buffer, Reader, Writer};
pub use output::output_config::{
    OutputConfig, Protocol, SendMode, ARTNET_PORT, DEFAULT_FRAME_RATE_HZ, MAX_FRAME_RATE_HZ,
    SACN_PORT,
};
pub use output::service::{frame_interval_ms, OutputService};
pub use output::transport::{Transport, UdpTransport};

pub mod beat;
pub mod bridge;
pub mod color;
pub mod effect;
pub mod engine;
pub mod output;
pub mod protocol;
