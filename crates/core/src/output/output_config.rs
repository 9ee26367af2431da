use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::protocol::sacn;

pub const ARTNET_PORT: u16 = 6454;
pub const SACN_PORT: u16 = 5568;

/// Practical DMX512 refresh ceiling; the service clamps to this.
pub const MAX_FRAME_RATE_HZ: f64 = 44.0;
pub const DEFAULT_FRAME_RATE_HZ: f64 = 40.0;

/// Wire protocol carrying the universes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[default]
    ArtNet,
    Sacn,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::ArtNet => "Art-Net",
            Protocol::Sacn => "sACN",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::ArtNet => ARTNET_PORT,
            Protocol::Sacn => SACN_PORT,
        }
    }
}

/// Where packets for a universe are aimed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendMode {
    Broadcast,
    Unicast(IpAddr),
    /// Per-universe sACN multicast groups (239.255.x.y).
    Multicast,
}

/// Output service configuration. Plain value handed in by the host;
/// nothing here touches disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    pub protocol: Protocol,
    pub mode: SendMode,
    pub port: u16,
    pub frame_rate_hz: f64,
    /// Source name advertised in sACN framing (max 63 bytes used).
    pub source_name: String,
    /// Component identifier for the sACN root layer.
    pub cid: [u8; 16],
    pub priority: u8,
}

impl OutputConfig {
    pub fn artnet() -> Self {
        OutputConfig {
            protocol: Protocol::ArtNet,
            mode: SendMode::Broadcast,
            port: ARTNET_PORT,
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            source_name: "ChromaDMX".to_string(),
            cid: [0; 16],
            priority: 100,
        }
    }

    pub fn sacn(cid: [u8; 16]) -> Self {
        OutputConfig {
            protocol: Protocol::Sacn,
            mode: SendMode::Multicast,
            port: SACN_PORT,
            cid,
            ..OutputConfig::artnet()
        }
    }

    pub fn with_unicast(mut self, destination: IpAddr) -> Self {
        self.mode = SendMode::Unicast(destination);
        self
    }

    /// Destination address for one universe's packets.
    pub fn destination(&self, universe: u16) -> IpAddr {
        match self.mode {
            SendMode::Unicast(address) => address,
            SendMode::Multicast => IpAddr::V4(sacn::multicast_address(universe)),
            SendMode::Broadcast => IpAddr::V4(Ipv4Addr::BROADCAST),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::artnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sacn_universes_map_to_their_multicast_group() {
        let config = OutputConfig::sacn([7; 16]);
        assert_eq!(config.destination(1).to_string(), "239.255.0.1");
        assert_eq!(config.destination(256).to_string(), "239.255.1.0");
    }

    #[test]
    fn unicast_overrides_the_group() {
        let target: IpAddr = "10.0.0.20".parse().unwrap();
        let config = OutputConfig::sacn([7; 16]).with_unicast(target);
        assert_eq!(config.destination(300), target);
    }

    #[test]
    fn artnet_defaults_to_broadcast() {
        let config = OutputConfig::artnet();
        assert_eq!(config.destination(0).to_string(), "255.255.255.255");
        assert_eq!(config.port, 6454);
    }
}
