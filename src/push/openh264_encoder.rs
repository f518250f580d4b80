use bytes::Bytes;
use openh264::{
    OpenH264API,
    encoder::{
        BitRate, Encoder, EncoderConfig, FrameRate, FrameType, RateControlMode, SpsPpsStrategy,
        UsageType,
    },
    formats::YUVBuffer,
};

use super::video_encoder::{EncodeError, EncodedFrame, VideoEncoder, VideoEncoderFactory};
use crate::media::{MediaFrame, VideoFormat, VideoSubtype};

/// Knobs for the software encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenH264Settings {
    pub target_fps: u32,
    pub target_bps: u32,
    /// Frames between periodic IDRs; 0 disables them.
    pub keyint: u32,
}

impl Default for OpenH264Settings {
    fn default() -> Self {
        Self {
            target_fps: 30,
            target_bps: 1_000_000,
            keyint: 60,
        }
    }
}

pub struct OpenH264Encoder {
    enc: Option<Encoder>,
    settings: OpenH264Settings,
    format: Option<VideoFormat>,
    force_idr: bool,
}

impl OpenH264Encoder {
    pub fn new(settings: OpenH264Settings) -> Self {
        Self {
            enc: None,
            settings,
            format: None,
            force_idr: false,
        }
    }

    /// Copies the three I420 planes into one tightly packed buffer, dropping
    /// any row padding.
    fn pack_i420(frame: &MediaFrame, width: usize, height: usize) -> Result<Vec<u8>, EncodeError> {
        let chroma_w = width.div_ceil(2);
        let chroma_h = height.div_ceil(2);
        let total = width * height + 2 * chroma_w * chroma_h;

        if let [single] = frame.planes() {
            return if single.data.len() >= total {
                Ok(single.data[..total].to_vec())
            } else {
                Err(EncodeError::InvalidFrame(format!(
                    "packed I420 needs {total} bytes, got {}",
                    single.data.len()
                )))
            };
        }

        let [y, u, v] = frame.planes() else {
            return Err(EncodeError::InvalidFrame(format!(
                "expected 1 or 3 planes, got {}",
                frame.planes().len()
            )));
        };
        let mut out = Vec::with_capacity(total);
        for (plane, w, h) in [(y, width, height), (u, chroma_w, chroma_h), (v, chroma_w, chroma_h)] {
            let stride = plane.stride.max(w);
            for row in 0..h {
                let start = row * stride;
                let Some(bytes) = plane.data.get(start..start + w) else {
                    return Err(EncodeError::InvalidFrame("plane shorter than stride * rows".into()));
                };
                out.extend_from_slice(bytes);
            }
        }
        Ok(out)
    }
}

impl VideoEncoder for OpenH264Encoder {
    fn start(&mut self, format: &VideoFormat) -> Result<(), EncodeError> {
        if format.width == 0 || format.height == 0 {
            return Err(EncodeError::InvalidFrame("zero-sized video format".into()));
        }
        let cfg = EncoderConfig::new()
            .usage_type(UsageType::CameraVideoRealTime)
            .max_frame_rate(FrameRate::from_hz(self.settings.target_fps as f32))
            .bitrate(BitRate::from_bps(self.settings.target_bps))
            .rate_control_mode(RateControlMode::Bitrate)
            // SPS/PPS with every keyframe so a receiver can join mid-stream.
            .sps_pps_strategy(SpsPpsStrategy::InAccessUnit)
            .intra_frame_period(self.settings.keyint.into());
        let enc = Encoder::with_api_config(OpenH264API::from_source(), cfg)
            .map_err(|e| EncodeError::Backend(e.to_string()))?;
        self.enc = Some(enc);
        self.format = Some(*format);
        Ok(())
    }

    fn encode(&mut self, frame: &MediaFrame) -> Result<Option<EncodedFrame>, EncodeError> {
        let (Some(enc), Some(configured)) = (self.enc.as_mut(), self.format) else {
            return Err(EncodeError::NotStarted);
        };
        let video = match frame.format.as_video() {
            Some(v) if v.subtype == VideoSubtype::I420 => *v,
            _ => return Err(EncodeError::InvalidFrame("not I420".into())),
        };
        let (width, height) = if video.width > 0 && video.height > 0 {
            (video.width as usize, video.height as usize)
        } else {
            (configured.width as usize, configured.height as usize)
        };

        let yuv = YUVBuffer::from_vec(Self::pack_i420(frame, width, height)?, width, height);
        if std::mem::take(&mut self.force_idr) {
            enc.force_intra_frame();
        }
        let bitstream = enc
            .encode(&yuv)
            .map_err(|e| EncodeError::Backend(e.to_string()))?;

        let idr = matches!(bitstream.frame_type(), FrameType::IDR | FrameType::I);
        let skipped = matches!(bitstream.frame_type(), FrameType::Skip);
        let data = bitstream.to_vec();
        if skipped || data.is_empty() {
            return Ok(None);
        }
        Ok(Some(EncodedFrame {
            data: Bytes::from(data),
            idr,
        }))
    }

    fn request_keyframe(&mut self) {
        self.force_idr = true;
    }

    fn stop(&mut self) {
        self.enc = None;
        self.format = None;
    }
}

/// Hands out an [`OpenH264Encoder`] with fixed settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenH264EncoderFactory {
    pub settings: OpenH264Settings,
}

impl VideoEncoderFactory for OpenH264EncoderFactory {
    fn create_encoder(&self) -> Result<Box<dyn VideoEncoder>, EncodeError> {
        Ok(Box::new(OpenH264Encoder::new(self.settings)))
    }
}
