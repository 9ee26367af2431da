pub mod compositor;
pub mod triple_buffer;
