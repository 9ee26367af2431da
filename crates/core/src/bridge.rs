use std::collections::HashMap;

use chroma_fixtures::{ChannelLayout, Fixture, ProfileLibrary};

use crate::engine::compositor::FixtureOutput;

/// One full DMX universe frame.
pub const UNIVERSE_SIZE: usize = 512;

fn level_byte(component: f64) -> u8 {
    (component * 255.0).round().clamp(0.0, 255.0) as u8
}

fn coarse_byte(normalized: f64) -> u8 {
    (normalized * 255.0).round().clamp(0.0, 255.0) as u8
}

fn fine_byte(normalized: f64) -> u8 {
    // 16-bit scale, low byte only. Independent of the coarse scaling.
    ((normalized * 65535.0).round().clamp(0.0, 65535.0) as u32 & 0xFF) as u8
}

/// Translate abstract per-fixture output into raw DMX bytes, one
/// 512-byte buffer per universe that has at least one mapped fixture.
///
/// A fixture whose profile id is missing from the library degrades to
/// a direct 3-channel RGB mapping at its start address; movement is
/// ignored for such fixtures.
pub fn convert_outputs(
    fixtures: &[Fixture],
    profiles: &ProfileLibrary,
    outputs: &[FixtureOutput],
) -> HashMap<u16, [u8; UNIVERSE_SIZE]> {
    let mut universes: HashMap<u16, [u8; UNIVERSE_SIZE]> = HashMap::new();

    for (index, fixture) in fixtures.iter().enumerate() {
        let output = match outputs.get(index) {
            Some(output) => output,
            None => continue,
        };
        let buffer = universes
            .entry(fixture.universe)
            .or_insert([0u8; UNIVERSE_SIZE]);
        // DMX addresses are 1-based.
        let base = fixture.start_address.saturating_sub(1) as usize;

        match profiles.layout(&fixture.profile_id) {
            Some(layout) => write_mapped(buffer, base, layout, output),
            None => {
                log::debug!(
                    "Unknown profile '{}' for fixture {}; falling back to direct RGB",
                    fixture.profile_id,
                    fixture.id
                );
                write_rgb_fallback(buffer, base, output);
            }
        }
    }

    universes
}

fn write_channel(buffer: &mut [u8; UNIVERSE_SIZE], base: usize, offset: u16, value: u8) {
    let index = base + offset as usize;
    if index < UNIVERSE_SIZE {
        buffer[index] = value;
    }
}

fn write_mapped(
    buffer: &mut [u8; UNIVERSE_SIZE],
    base: usize,
    layout: &ChannelLayout,
    output: &FixtureOutput,
) {
    let color = output.color;
    if let Some(offset) = layout.red {
        write_channel(buffer, base, offset, level_byte(color.r));
    }
    if let Some(offset) = layout.green {
        write_channel(buffer, base, offset, level_byte(color.g));
    }
    if let Some(offset) = layout.blue {
        write_channel(buffer, base, offset, level_byte(color.b));
    }
    // Brightness tracks the brightest color component so pure-dimmer
    // fixtures still follow color-only effects.
    if let Some(offset) = layout.dimmer {
        write_channel(buffer, base, offset, level_byte(color.luma_max()));
    }

    if let Some(offset) = layout.pan {
        let value = output
            .pan
            .map(coarse_byte)
            .unwrap_or_else(|| layout.default_for(offset));
        write_channel(buffer, base, offset, value);
    }
    if let Some(offset) = layout.pan_fine {
        let value = output
            .pan
            .map(fine_byte)
            .unwrap_or_else(|| layout.default_for(offset));
        write_channel(buffer, base, offset, value);
    }
    if let Some(offset) = layout.tilt {
        let value = output
            .tilt
            .map(coarse_byte)
            .unwrap_or_else(|| layout.default_for(offset));
        write_channel(buffer, base, offset, value);
    }
    if let Some(offset) = layout.tilt_fine {
        let value = output
            .tilt
            .map(fine_byte)
            .unwrap_or_else(|| layout.default_for(offset));
        write_channel(buffer, base, offset, value);
    }
    if let Some(offset) = layout.gobo {
        let value = output.gobo.unwrap_or_else(|| layout.default_for(offset));
        write_channel(buffer, base, offset, value);
    }
    if let Some(offset) = layout.strobe {
        let value = output
            .strobe_rate
            .map(coarse_byte)
            .unwrap_or_else(|| layout.default_for(offset));
        write_channel(buffer, base, offset, value);
    }
    if let Some(offset) = layout.zoom {
        let value = output
            .zoom
            .map(coarse_byte)
            .unwrap_or_else(|| layout.default_for(offset));
        write_channel(buffer, base, offset, value);
    }
}

fn write_rgb_fallback(buffer: &mut [u8; UNIVERSE_SIZE], base: usize, output: &FixtureOutput) {
    write_channel(buffer, base, 0, level_byte(output.color.r));
    write_channel(buffer, base, 1, level_byte(output.color.g));
    write_channel(buffer, base, 2, level_byte(output.color.b));
}

#[cfg(test)]
mod tests {
    use chroma_fixtures::FixtureProfile;

    use super::*;
    use crate::color::Color;

    fn output(color: Color) -> FixtureOutput {
        FixtureOutput {
            color,
            ..FixtureOutput::default()
        }
    }

    #[test]
    fn empty_input_yields_empty_map() {
        let map = convert_outputs(&[], &ProfileLibrary::new(), &[]);
        assert!(map.is_empty());
    }

    #[test]
    fn unknown_profile_falls_back_to_direct_rgb() {
        let fixtures = vec![Fixture::new(0, "mystery", "no-such-profile", 7, 10, 3)];
        let outputs = vec![FixtureOutput {
            color: Color::new(1.0, 0.5, 0.0),
            pan: Some(0.5),
            ..FixtureOutput::default()
        }];
        let map = convert_outputs(&fixtures, &ProfileLibrary::new(), &outputs);
        let buffer = map.get(&7).unwrap();
        assert_eq!(&buffer[9..12], &[255, 128, 0]);
        // Movement is ignored in fallback mode; nothing else written.
        assert!(buffer[..9].iter().all(|&b| b == 0));
        assert!(buffer[12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn dimmer_tracks_brightest_component() {
        let fixtures = vec![Fixture::new(0, "par", "shehds-rgbw-par", 1, 1, 8)];
        let outputs = vec![output(Color::new(0.2, 0.8, 0.4))];
        let map = convert_outputs(&fixtures, &ProfileLibrary::new(), &outputs);
        let buffer = map.get(&1).unwrap();
        // dimmer @0, r @1, g @2, b @3
        assert_eq!(buffer[0], level_byte(0.8));
        assert_eq!(buffer[1], level_byte(0.2));
        assert_eq!(buffer[2], level_byte(0.8));
        assert_eq!(buffer[3], level_byte(0.4));
    }

    #[test]
    fn pan_tilt_use_independent_coarse_and_fine_scalings() {
        let fixtures = vec![Fixture::new(0, "beam", "shehds-beam-230w-7r", 1, 1, 16)];
        let outputs = vec![FixtureOutput {
            color: Color::BLACK,
            pan: Some(0.5),
            tilt: Some(0.25),
            ..FixtureOutput::default()
        }];
        let map = convert_outputs(&fixtures, &ProfileLibrary::new(), &outputs);
        let buffer = map.get(&1).unwrap();
        assert_eq!(buffer[0], coarse_byte(0.5));
        assert_eq!(buffer[1], fine_byte(0.5));
        assert_eq!(buffer[2], coarse_byte(0.25));
        assert_eq!(buffer[3], fine_byte(0.25));
        // The two scalings disagree on purpose: coarse is x255, fine
        // is the low byte of x65535.
        assert_eq!(buffer[0], 128);
        assert_eq!(buffer[1], (32768u32 & 0xFF) as u8);
    }

    #[test]
    fn absent_movement_uses_profile_defaults() {
        let fixtures = vec![Fixture::new(0, "spot", "shehds-led-spot-60w", 1, 1, 9)];
        let outputs = vec![output(Color::new(0.0, 0.0, 1.0))];
        let map = convert_outputs(&fixtures, &ProfileLibrary::new(), &outputs);
        let buffer = map.get(&1).unwrap();
        // Pan/tilt default to mid travel in this profile.
        assert_eq!(buffer[0], 128);
        assert_eq!(buffer[1], 128);
        // Gobo has no default listed, so it rests at 0.
        assert_eq!(buffer[3], 0);
        // Dimmer follows blue.
        assert_eq!(buffer[5], 255);
    }

    #[test]
    fn fixtures_group_into_their_universes() {
        let fixtures = vec![
            Fixture::new(0, "a", "generic-rgb", 1, 1, 3),
            Fixture::new(1, "b", "generic-rgb", 2, 1, 3),
            Fixture::new(2, "c", "generic-rgb", 1, 100, 3),
        ];
        let outputs = vec![output(Color::WHITE); 3];
        let map = convert_outputs(&fixtures, &ProfileLibrary::new(), &outputs);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&1).unwrap()[99], 255);
    }

    #[test]
    fn writes_never_run_past_the_universe_end() {
        let mut profiles = ProfileLibrary::empty();
        profiles.insert(FixtureProfile {
            id: "generic-rgb".to_string(),
            ..FixtureProfile::default()
        });
        let fixtures = vec![Fixture::new(0, "edge", "missing", 1, 511, 3)];
        let outputs = vec![output(Color::WHITE)];
        let map = convert_outputs(&fixtures, &profiles, &outputs);
        let buffer = map.get(&1).unwrap();
        assert_eq!(buffer[510], 255);
        assert_eq!(buffer[511], 255);
        // Third channel would be slot 513; silently dropped.
    }
}
