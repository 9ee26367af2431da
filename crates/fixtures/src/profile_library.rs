use std::collections::HashMap;

use crate::{ChannelLayout, FixtureProfile};

/// Registry of fixture profiles keyed by profile id.
///
/// Constructed once and passed down by reference; never a global.
/// Note in the future we'll load these from disk.
pub struct ProfileLibrary {
    pub profiles: HashMap<String, FixtureProfile>,
}

impl ProfileLibrary {
    /// An empty library. Useful for tests and for hosts that patch in
    /// their own profiles.
    pub fn empty() -> Self {
        ProfileLibrary {
            profiles: HashMap::new(),
        }
    }

    pub fn new() -> Self {
        let mut library = ProfileLibrary::empty();

        library.insert(FixtureProfile {
            id: "generic-rgb".to_string(),
            manufacturer: "Generic".to_string(),
            model: "RGB PAR".to_string(),
            layout: ChannelLayout {
                red: Some(0),
                green: Some(1),
                blue: Some(2),
                channel_count: 3,
                ..ChannelLayout::default()
            },
        });

        library.insert(FixtureProfile {
            id: "shehds-rgbw-par".to_string(),
            manufacturer: "Shehds".to_string(),
            model: "LED Flat PAR 12x3W RGBW".to_string(),
            layout: ChannelLayout {
                dimmer: Some(0),
                red: Some(1),
                green: Some(2),
                blue: Some(3),
                strobe: Some(5),
                channel_count: 8,
                ..ChannelLayout::default()
            },
        });

        library.insert(FixtureProfile {
            id: "shehds-led-spot-60w".to_string(),
            manufacturer: "Shehds".to_string(),
            model: "LED Spot 60W Lighting".to_string(),
            layout: ChannelLayout {
                pan: Some(0),
                tilt: Some(1),
                gobo: Some(3),
                strobe: Some(4),
                dimmer: Some(5),
                channel_count: 9,
                // Park pan/tilt at mid travel when nothing drives them.
                defaults: vec![(0, 128), (1, 128)],
                ..ChannelLayout::default()
            },
        });

        library.insert(FixtureProfile {
            id: "shehds-beam-230w-7r".to_string(),
            manufacturer: "Shehds".to_string(),
            model: "Beam 230W 7R Moving Head".to_string(),
            layout: ChannelLayout {
                pan: Some(0),
                pan_fine: Some(1),
                tilt: Some(2),
                tilt_fine: Some(3),
                dimmer: Some(5),
                strobe: Some(6),
                gobo: Some(9),
                zoom: Some(11),
                channel_count: 16,
                defaults: vec![(0, 128), (2, 128)],
                ..ChannelLayout::default()
            },
        });

        library.insert(FixtureProfile {
            id: "shehds-led-wash-7x18w".to_string(),
            manufacturer: "Shehds".to_string(),
            model: "LED Wash 7x18W RGBWA+UV".to_string(),
            layout: ChannelLayout {
                pan: Some(0),
                tilt: Some(1),
                dimmer: Some(2),
                red: Some(3),
                green: Some(4),
                blue: Some(5),
                channel_count: 10,
                defaults: vec![(0, 128), (1, 128)],
                ..ChannelLayout::default()
            },
        });

        library
    }

    pub fn insert(&mut self, profile: FixtureProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    pub fn get(&self, profile_id: &str) -> Option<&FixtureProfile> {
        self.profiles.get(profile_id)
    }

    pub fn layout(&self, profile_id: &str) -> Option<&ChannelLayout> {
        self.profiles.get(profile_id).map(|p| &p.layout)
    }
}

impl Default for ProfileLibrary {
    fn default() -> Self {
        Self::new()
    }
}
