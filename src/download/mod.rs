//! Fetching remote media through yt-dlp

pub mod downloader;
pub mod niconico;
pub mod source;
pub mod youtube;
pub mod ytdlp;

pub use downloader::*;
pub use niconico::NicoNicoSource;
pub use source::*;
pub use youtube::YouTubeSource;
pub use ytdlp::{FormatSelection, YtDlp};
