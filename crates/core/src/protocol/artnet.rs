//! Bit-exact Art-Net packet encoding/decoding.
//!
//! Every message starts with the 8-byte "Art-Net\0" signature and a
//! little-endian opcode at offset 8; all messages except raw header
//! probes carry the big-endian protocol version (14). Decoders are
//! total: any structural violation yields `None`, which callers treat
//! as "not my packet".

/// 8-byte packet signature, including the terminating NUL.
pub const ARTNET_ID: [u8; 8] = *b"Art-Net\0";
pub const PROTOCOL_VERSION: u16 = 14;

pub const OP_POLL: u16 = 0x2000;
pub const OP_POLL_REPLY: u16 = 0x2100;
pub const OP_DMX: u16 = 0x5000;

const DMX_HEADER_LEN: usize = 18;
const POLL_LEN: usize = 14;
const POLL_REPLY_LEN: usize = 239;

pub fn has_valid_header(buffer: &[u8]) -> bool {
    buffer.len() >= 10 && buffer[..8] == ARTNET_ID
}

pub fn read_op_code(buffer: &[u8]) -> Option<u16> {
    if !has_valid_header(buffer) {
        return None;
    }
    Some(u16::from_le_bytes([buffer[8], buffer[9]]))
}

/// ArtDmx: one universe worth of channel data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtDmx {
    pub sequence: u8,
    pub physical: u8,
    /// 15-bit port address: net (high 7 bits) + sub-uni (low 8).
    pub universe: u16,
    pub data: Vec<u8>,
}

/// Encode an ArtDmx packet. Data is capped at 512 slots and
/// zero-padded to an even length, as the protocol requires.
pub fn encode_art_dmx(sequence: u8, physical: u8, universe: u16, data: &[u8]) -> Vec<u8> {
    let slot_count = data.len().min(512);
    let padded_len = slot_count + (slot_count & 1);

    let mut packet = Vec::with_capacity(DMX_HEADER_LEN + padded_len);
    packet.extend_from_slice(&ARTNET_ID);
    packet.extend_from_slice(&OP_DMX.to_le_bytes());
    packet.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    packet.push(sequence);
    packet.push(physical);
    packet.push((universe & 0xFF) as u8); // sub-uni
    packet.push(((universe >> 8) & 0x7F) as u8); // net
    packet.extend_from_slice(&(padded_len as u16).to_be_bytes());
    packet.extend_from_slice(&data[..slot_count]);
    if padded_len > slot_count {
        packet.push(0);
    }
    packet
}

pub fn decode_art_dmx(buffer: &[u8]) -> Option<ArtDmx> {
    if buffer.len() < DMX_HEADER_LEN {
        return None;
    }
    if read_op_code(buffer)? != OP_DMX {
        return None;
    }
    let sub_uni = buffer[14] as u16;
    let net = (buffer[15] & 0x7F) as u16;
    let length = u16::from_be_bytes([buffer[16], buffer[17]]) as usize;
    if buffer.len() < DMX_HEADER_LEN + length {
        return None;
    }
    Some(ArtDmx {
        sequence: buffer[12],
        physical: buffer[13],
        universe: (net << 8) | sub_uni,
        data: buffer[DMX_HEADER_LEN..DMX_HEADER_LEN + length].to_vec(),
    })
}

/// ArtPoll: discovery probe broadcast by controllers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArtPoll {
    pub flags: u8,
    pub diag_priority: u8,
}

pub fn encode_art_poll(poll: &ArtPoll) -> Vec<u8> {
    let mut packet = Vec::with_capacity(POLL_LEN);
    packet.extend_from_slice(&ARTNET_ID);
    packet.extend_from_slice(&OP_POLL.to_le_bytes());
    packet.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    packet.push(poll.flags);
    packet.push(poll.diag_priority);
    packet
}

pub fn decode_art_poll(buffer: &[u8]) -> Option<ArtPoll> {
    if buffer.len() < POLL_LEN {
        return None;
    }
    if read_op_code(buffer)? != OP_POLL {
        return None;
    }
    Some(ArtPoll {
        flags: buffer[12],
        diag_priority: buffer[13],
    })
}

/// ArtPollReply: a node describing itself in response to ArtPoll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtPollReply {
    pub ip: [u8; 4],
    pub port: u16,
    pub firmware: u16,
    pub net_switch: u8,
    pub sub_switch: u8,
    pub short_name: String,
    pub long_name: String,
    pub port_count: u8,
    pub sw_in: [u8; 4],
    pub sw_out: [u8; 4],
    pub style: u8,
    pub mac: [u8; 6],
    pub bind_ip: [u8; 4],
    pub status: u8,
}

impl ArtPollReply {
    /// Dotted-quad form of the node address.
    pub fn ip_string(&self) -> String {
        format!("{}.{}.{}.{}", self.ip[0], self.ip[1], self.ip[2], self.ip[3])
    }

    /// Colon-separated lowercase hex MAC.
    pub fn mac_string(&self) -> String {
        self.mac
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }
}

fn put_padded(packet: &mut [u8], offset: usize, text: &str, field_len: usize) {
    let bytes = text.as_bytes();
    // Leave at least one NUL terminator.
    let copy_len = bytes.len().min(field_len - 1);
    packet[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
}

fn read_padded(buffer: &[u8], offset: usize, field_len: usize) -> String {
    let field = &buffer[offset..offset + field_len];
    let end = field.iter().position(|&b| b == 0).unwrap_or(field_len);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

pub fn encode_art_poll_reply(reply: &ArtPollReply) -> Vec<u8> {
    let mut packet = vec![0u8; POLL_REPLY_LEN];
    packet[..8].copy_from_slice(&ARTNET_ID);
    packet[8..10].copy_from_slice(&OP_POLL_REPLY.to_le_bytes());
    packet[10..14].copy_from_slice(&reply.ip);
    packet[14..16].copy_from_slice(&reply.port.to_le_bytes());
    packet[16..18].copy_from_slice(&reply.firmware.to_be_bytes());
    packet[18] = reply.net_switch;
    packet[19] = reply.sub_switch;
    put_padded(&mut packet, 20, &reply.short_name, 17);
    put_padded(&mut packet, 37, &reply.long_name, 63);
    packet[100] = reply.port_count;
    packet[101..105].copy_from_slice(&reply.sw_in);
    packet[105..109].copy_from_slice(&reply.sw_out);
    packet[109] = reply.style;
    packet[110..116].copy_from_slice(&reply.mac);
    packet[116..120].copy_from_slice(&reply.bind_ip);
    packet[120] = reply.status;
    packet
}

pub fn decode_art_poll_reply(buffer: &[u8]) -> Option<ArtPollReply> {
    if buffer.len() < POLL_REPLY_LEN {
        return None;
    }
    if read_op_code(buffer)? != OP_POLL_REPLY {
        return None;
    }
    let mut reply = ArtPollReply {
        ip: [0; 4],
        port: u16::from_le_bytes([buffer[14], buffer[15]]),
        firmware: u16::from_be_bytes([buffer[16], buffer[17]]),
        net_switch: buffer[18],
        sub_switch: buffer[19],
        short_name: read_padded(buffer, 20, 17),
        long_name: read_padded(buffer, 37, 63),
        port_count: buffer[100],
        sw_in: [0; 4],
        sw_out: [0; 4],
        style: buffer[109],
        mac: [0; 6],
        bind_ip: [0; 4],
        status: buffer[120],
    };
    reply.ip.copy_from_slice(&buffer[10..14]);
    reply.sw_in.copy_from_slice(&buffer[101..105]);
    reply.sw_out.copy_from_slice(&buffer[105..109]);
    reply.mac.copy_from_slice(&buffer[110..116]);
    reply.bind_ip.copy_from_slice(&buffer[116..120]);
    Some(reply)
}
