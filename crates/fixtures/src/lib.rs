use serde::{Deserialize, Serialize};

pub use profile_library::ProfileLibrary;

mod profile_library;

/// One addressable lighting unit in the rig.
///
/// Fixtures are owned by the patch layer and replaced wholesale; the
/// render core treats the list as read-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fixture {
    pub id: usize,
    pub name: String,
    pub profile_id: String,
    pub universe: u16,
    /// First DMX channel occupied by this fixture. DMX addresses are 1-based.
    pub start_address: u16,
    pub channel_count: u16,
    /// Physical position in the venue, metres, arbitrary origin.
    pub position: [f64; 3],
    pub group: Option<u32>,
}

impl Fixture {
    pub fn new(
        id: usize,
        name: &str,
        profile_id: &str,
        universe: u16,
        start_address: u16,
        channel_count: u16,
    ) -> Self {
        Fixture {
            id,
            name: name.to_string(),
            profile_id: profile_id.to_string(),
            universe,
            start_address,
            channel_count,
            position: [0.0; 3],
            group: None,
        }
    }

    pub fn at(mut self, position: [f64; 3]) -> Self {
        self.position = position;
        self
    }
}

/// Byte-offset map for one fixture type.
///
/// Offsets are relative to the fixture's start address. Only the
/// channels the physical fixture actually has are present; everything
/// else stays `None` and the bridge skips it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChannelLayout {
    pub pan: Option<u16>,
    pub pan_fine: Option<u16>,
    pub tilt: Option<u16>,
    pub tilt_fine: Option<u16>,
    pub dimmer: Option<u16>,
    pub red: Option<u16>,
    pub green: Option<u16>,
    pub blue: Option<u16>,
    pub gobo: Option<u16>,
    pub strobe: Option<u16>,
    pub zoom: Option<u16>,
    pub channel_count: u16,
    /// Resting byte for a channel when no effect drives it (home
    /// position for pan/tilt, open gobo, ...). Offsets not listed
    /// default to 0.
    pub defaults: Vec<(u16, u8)>,
}

impl ChannelLayout {
    pub fn default_for(&self, offset: u16) -> u8 {
        self.defaults
            .iter()
            .find(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    }
}

/// Profile metadata plus the channel layout the bridge consumes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FixtureProfile {
    pub id: String,
    pub manufacturer: String,
    pub model: String,
    pub layout: ChannelLayout,
}

impl std::fmt::Display for FixtureProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.manufacturer, self.model)
    }
}
