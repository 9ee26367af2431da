//! Bit-exact sACN (E1.31) data packet encoding/decoding.
//!
//! Packets nest three layers: ACN root, E1.31 framing, and DMP. This
//! codec emits fixed-size 638-byte data packets (126-byte header plus
//! a full 512-slot property area) and decodes any structurally valid
//! buffer, returning `None` on the slightest mismatch.

use std::net::Ipv4Addr;

pub const PREAMBLE_SIZE: u16 = 0x0010;
pub const POSTAMBLE_SIZE: u16 = 0x0000;
/// "ASC-E1.17" NUL-padded to 12 bytes.
pub const ACN_IDENTIFIER: [u8; 12] = [
    0x41, 0x53, 0x43, 0x2d, 0x45, 0x31, 0x2e, 0x31, 0x37, 0x00, 0x00, 0x00,
];
pub const ROOT_VECTOR: u32 = 0x0000_0004;
pub const FRAMING_VECTOR: u32 = 0x0000_0002;
pub const DMP_VECTOR: u8 = 0x02;
pub const ADDRESS_TYPE: u8 = 0xa1;
pub const DMX_START_CODE: u8 = 0x00;

pub const PACKET_SIZE: usize = 638;
const HEADER_SIZE: usize = 126;

// PDU flags+length words: high nibble 0x7, low 12 bits the byte count
// from that layer to the end of the packet.
const ROOT_FLAGS_LENGTH: u16 = 0x7000 | (PACKET_SIZE as u16 - 16);
const FRAMING_FLAGS_LENGTH: u16 = 0x7000 | (PACKET_SIZE as u16 - 38);
const DMP_FLAGS_LENGTH: u16 = 0x7000 | (PACKET_SIZE as u16 - 115);

/// Decoded E1.31 data packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SacnPacket {
    pub cid: [u8; 16],
    pub source_name: String,
    pub priority: u8,
    pub sequence: u8,
    pub options: u8,
    pub universe: u16,
    pub data: Vec<u8>,
}

/// Encode a fixed 638-byte E1.31 data packet. `data` is capped at 512
/// slots; the property area beyond it stays zero.
pub fn encode(
    cid: &[u8; 16],
    source_name: &str,
    priority: u8,
    sequence: u8,
    options: u8,
    universe: u16,
    data: &[u8],
) -> Vec<u8> {
    let slot_count = data.len().min(512);
    let mut packet = vec![0u8; PACKET_SIZE];

    // Root layer
    packet[0..2].copy_from_slice(&PREAMBLE_SIZE.to_be_bytes());
    packet[2..4].copy_from_slice(&POSTAMBLE_SIZE.to_be_bytes());
    packet[4..16].copy_from_slice(&ACN_IDENTIFIER);
    packet[16..18].copy_from_slice(&ROOT_FLAGS_LENGTH.to_be_bytes());
    packet[18..22].copy_from_slice(&ROOT_VECTOR.to_be_bytes());
    packet[22..38].copy_from_slice(cid);

    // Framing layer
    packet[38..40].copy_from_slice(&FRAMING_FLAGS_LENGTH.to_be_bytes());
    packet[40..44].copy_from_slice(&FRAMING_VECTOR.to_be_bytes());
    let name_bytes = source_name.as_bytes();
    let name_len = name_bytes.len().min(63); // keep a trailing NUL
    packet[44..44 + name_len].copy_from_slice(&name_bytes[..name_len]);
    packet[108] = priority;
    // 109..111 reserved
    packet[111] = sequence;
    packet[112] = options;
    packet[113..115].copy_from_slice(&universe.to_be_bytes());

    // DMP layer
    packet[115..117].copy_from_slice(&DMP_FLAGS_LENGTH.to_be_bytes());
    packet[117] = DMP_VECTOR;
    packet[118] = ADDRESS_TYPE;
    packet[119..121].copy_from_slice(&0x0000u16.to_be_bytes()); // first property address
    packet[121..123].copy_from_slice(&0x0001u16.to_be_bytes()); // address increment
    packet[123..125].copy_from_slice(&(1 + slot_count as u16).to_be_bytes());
    packet[125] = DMX_START_CODE;
    packet[HEADER_SIZE..HEADER_SIZE + slot_count].copy_from_slice(&data[..slot_count]);

    packet
}

/// Cheap structural pre-filter: length, preamble, ACN identifier and
/// both vectors. Everything [`decode`] checks before touching fields.
pub fn is_valid_packet(buffer: &[u8]) -> bool {
    buffer.len() >= HEADER_SIZE
        && u16::from_be_bytes([buffer[0], buffer[1]]) == PREAMBLE_SIZE
        && buffer[4..16] == ACN_IDENTIFIER
        && u32::from_be_bytes([buffer[18], buffer[19], buffer[20], buffer[21]]) == ROOT_VECTOR
        && u32::from_be_bytes([buffer[40], buffer[41], buffer[42], buffer[43]]) == FRAMING_VECTOR
        && buffer[117] == DMP_VECTOR
}

pub fn decode(buffer: &[u8]) -> Option<SacnPacket> {
    if !is_valid_packet(buffer) {
        return None;
    }
    let property_count = u16::from_be_bytes([buffer[123], buffer[124]]) as usize;
    // First property is the DMX start code.
    let slot_count = property_count.checked_sub(1)?;
    if slot_count > 512 || buffer.len() < HEADER_SIZE + slot_count {
        return None;
    }

    let mut cid = [0u8; 16];
    cid.copy_from_slice(&buffer[22..38]);
    let name_field = &buffer[44..108];
    let name_end = name_field.iter().position(|&b| b == 0).unwrap_or(64);
    Some(SacnPacket {
        cid,
        source_name: String::from_utf8_lossy(&name_field[..name_end]).into_owned(),
        priority: buffer[108],
        sequence: buffer[111],
        options: buffer[112],
        universe: u16::from_be_bytes([buffer[113], buffer[114]]),
        data: buffer[HEADER_SIZE..HEADER_SIZE + slot_count].to_vec(),
    })
}

/// Multicast group for a universe: 239.255.hi.lo.
pub fn multicast_address(universe: u16) -> Ipv4Addr {
    Ipv4Addr::new(239, 255, ((universe >> 8) & 0xFF) as u8, (universe & 0xFF) as u8)
}
