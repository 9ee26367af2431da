pub mod artnet;
pub mod sacn;
