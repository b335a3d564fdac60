//! Output generation

pub mod m3u;

pub use m3u::PlaylistRenderer;
