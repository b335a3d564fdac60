//! Source collaborators: fetching documents and parsing playlists and guides

pub mod fetch;
pub mod m3u;
pub mod xmltv;

pub use fetch::{DocumentKind, load_document};
pub use m3u::parse_playlist;
pub use xmltv::parse_epg;
