#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSubtype {
    /// Raw planar YUV 4:2:0.
    I420,
    /// Annex-B H.264 access unit.
    H264,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    pub subtype: VideoSubtype,
    pub width: u32,
    pub height: u32,
    /// Set on encoded frames that start with an IDR picture.
    pub idr: bool,
}

impl VideoFormat {
    pub fn i420(width: u32, height: u32) -> Self {
        Self {
            subtype: VideoSubtype::I420,
            width,
            height,
            idr: false,
        }
    }

    pub fn h264(width: u32, height: u32) -> Self {
        Self {
            subtype: VideoSubtype::H264,
            width,
            height,
            idr: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Format carried by a pin or a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    /// Matches any other format. Used by pass-through pins.
    Common,
    Audio(AudioFormat),
    Video(VideoFormat),
}

impl MediaFormat {
    /// Pins connect when the main type agrees and, for video, the subtype too.
    /// Dimensions and the IDR flag are per-frame facts and never block a connection.
    pub fn is_compatible(&self, other: &MediaFormat) -> bool {
        match (self, other) {
            (MediaFormat::Common, _) | (_, MediaFormat::Common) => true,
            (MediaFormat::Audio(_), MediaFormat::Audio(_)) => true,
            (MediaFormat::Video(a), MediaFormat::Video(b)) => a.subtype == b.subtype,
            (MediaFormat::Audio(_), MediaFormat::Video(_))
            | (MediaFormat::Video(_), MediaFormat::Audio(_)) => false,
        }
    }

    pub fn as_video(&self) -> Option<&VideoFormat> {
        match self {
            MediaFormat::Video(v) => Some(v),
            MediaFormat::Common | MediaFormat::Audio(_) => None,
        }
    }
}
