pub mod channel_mixer;
pub mod converter;
pub mod ring_buffer;
