//! End-to-end checks: effect stack -> compositor -> channel bridge ->
//! output service -> wire packets.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use chroma_core::protocol::{artnet, sacn};
use chroma_core::{
    builtin_registry, convert_outputs, BeatState, Color, Compositor, EffectLayer, EffectParams,
    InternalClock, OutputConfig, OutputService, Protocol, Transport, UNIVERSE_SIZE,
};
use chroma_fixtures::{Fixture, ProfileLibrary};

#[derive(Default)]
struct RecordingTransport {
    packets: Mutex<Vec<(Vec<u8>, IpAddr, u16)>>,
}

impl Transport for RecordingTransport {
    fn send(&self, data: &[u8], address: IpAddr, port: u16) -> anyhow::Result<()> {
        self.packets.lock().push((data.to_vec(), address, port));
        Ok(())
    }

    fn receive(&self, _buffer: &mut [u8], _timeout: Duration) -> anyhow::Result<usize> {
        anyhow::bail!("not used")
    }
}

fn rig() -> Vec<Fixture> {
    vec![
        Fixture::new(0, "par-left", "generic-rgb", 1, 1, 3).at([0.0, 0.0, 0.0]),
        Fixture::new(1, "par-right", "generic-rgb", 1, 4, 3).at([4.0, 0.0, 0.0]),
        Fixture::new(2, "spot", "shehds-led-spot-60w", 2, 1, 9).at([2.0, 3.0, 0.0]),
    ]
}

fn solid_stack(compositor: &Compositor, color: Color) {
    let registry = builtin_registry();
    let effect = registry.create("solid").unwrap();
    compositor.push_layer(EffectLayer::new(
        effect,
        EffectParams::new().set_color("color", color),
    ));
}

#[test]
fn frame_reaches_the_wire_as_artnet() {
    let compositor = Compositor::new(Arc::new(InternalClock::new(120.0)));
    compositor.update_fixtures(rig());
    solid_stack(&compositor, Color::new(1.0, 0.0, 0.5));
    compositor.render_tick(0.0, &BeatState::default());

    let frames = convert_outputs(
        &rig(),
        &ProfileLibrary::new(),
        &compositor.latest_outputs(),
    );
    assert_eq!(frames.len(), 2);

    let transport = Arc::new(RecordingTransport::default());
    let service = OutputService::new(
        OutputConfig::artnet(),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );
    service.set_frames(frames);
    assert_eq!(service.send_once(), 2);
    assert_eq!(service.frames_sent(), 1);

    let packets = transport.packets.lock();
    let universe_1 = packets
        .iter()
        .find_map(|(p, _, _)| artnet::decode_art_dmx(p).filter(|d| d.universe == 1))
        .unwrap();
    // Two RGB pars at addresses 1 and 4.
    assert_eq!(&universe_1.data[0..3], &[255, 0, 128]);
    assert_eq!(&universe_1.data[3..6], &[255, 0, 128]);

    let universe_2 = packets
        .iter()
        .find_map(|(p, _, _)| artnet::decode_art_dmx(p).filter(|d| d.universe == 2))
        .unwrap();
    // The spot has no RGB channels; its dimmer follows the brightest
    // component and its pan/tilt rest at the profile default.
    assert_eq!(universe_2.data[0], 128);
    assert_eq!(universe_2.data[1], 128);
    assert_eq!(universe_2.data[5], 255);
}

#[test]
fn protocol_switch_reframes_the_same_universes() {
    let transport = Arc::new(RecordingTransport::default());
    let service = OutputService::new(
        OutputConfig::sacn([9; 16]),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );
    let mut frames = HashMap::new();
    let mut data = [0u8; UNIVERSE_SIZE];
    data[0] = 200;
    frames.insert(260u16, data);
    service.set_frames(frames);
    service.send_once();

    {
        let packets = transport.packets.lock();
        let (packet, address, port) = &packets[0];
        assert_eq!(*port, 5568);
        assert_eq!(address.to_string(), "239.255.1.4");
        let decoded = sacn::decode(packet).unwrap();
        assert_eq!(decoded.universe, 260);
        assert_eq!(decoded.data[0], 200);
        assert!(sacn::is_valid_packet(packet));
    }

    service.set_protocol(Protocol::ArtNet);
    service.send_once();
    let packets = transport.packets.lock();
    let (packet, _, port) = packets.last().unwrap();
    assert_eq!(*port, 6454);
    let decoded = artnet::decode_art_dmx(packet).unwrap();
    assert_eq!(decoded.universe, 260);
    assert_eq!(decoded.data[0], 200);
}

#[test]
fn master_dimmer_blacks_out_the_whole_wire_frame() {
    let compositor = Compositor::new(Arc::new(InternalClock::new(120.0)));
    compositor.update_fixtures(rig());
    solid_stack(&compositor, Color::WHITE);
    compositor.set_master_dimmer(0.0);
    compositor.render_tick(0.0, &BeatState::default());

    let frames = convert_outputs(
        &rig(),
        &ProfileLibrary::new(),
        &compositor.latest_outputs(),
    );
    let universe_1 = frames.get(&1).unwrap();
    assert!(universe_1[..6].iter().all(|&b| b == 0));
}

#[tokio::test]
async fn both_loops_run_and_stop_cleanly() {
    let compositor = Compositor::new(Arc::new(InternalClock::new(120.0)));
    compositor.update_fixtures(rig());
    solid_stack(&compositor, Color::new(0.0, 1.0, 0.0));

    let transport = Arc::new(RecordingTransport::default());
    let service = OutputService::new(
        OutputConfig::artnet(),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );

    compositor.start();
    compositor.start();
    service.start();
    tokio::time::sleep(Duration::from_millis(60)).await;

    // The host side of the copy boundary: move the latest composite
    // into the output service's frame store.
    let frames = convert_outputs(
        &rig(),
        &ProfileLibrary::new(),
        &compositor.latest_outputs(),
    );
    service.set_frames(frames);
    tokio::time::sleep(Duration::from_millis(80)).await;

    compositor.stop();
    service.stop();
    assert!(!compositor.is_running());
    assert!(!service.is_running());

    assert!(service.frames_sent() > 0);
    let colors = compositor.latest_colors();
    assert_eq!(colors.len(), 3);
    assert_eq!(colors[0], Color::new(0.0, 1.0, 0.0));

    let packets = transport.packets.lock();
    assert!(packets.iter().any(|(p, _, _)| {
        artnet::decode_art_dmx(p)
            .map(|d| d.universe == 1 && d.data[1] == 255)
            .unwrap_or(false)
    }));
}
