use std::sync::Arc;

use super::video_encoder::VideoEncoder;
use crate::{
    log::log_sink::LogSink,
    media::{
        FrameEmitter, FrameOrigin, InPin, MediaError, MediaFormat, MediaFrame, MediaObject,
        OutPin, VideoFormat, VideoSubtype,
    },
    sink_debug, sink_warn,
};

/// Filter node: I420 in, Annex-B H.264 out.
///
/// Each encoded frame inherits the capture time of its input and gets an RTP
/// timestamp derived from it at the video clock rate.
pub struct H264EncoderFilter {
    encoder: Box<dyn VideoEncoder>,
    format: VideoFormat,
    clock_rate: u32,
    in_pins: Vec<InPin>,
    out_pins: Vec<OutPin>,
    frames_in: u64,
    frames_out: u64,
    logger: Arc<dyn LogSink>,
}

impl H264EncoderFilter {
    pub fn new(
        encoder: Box<dyn VideoEncoder>,
        input: VideoFormat,
        clock_rate: u32,
        logger: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            encoder,
            format: input,
            clock_rate,
            in_pins: vec![InPin::new(MediaFormat::Video(VideoFormat::i420(
                input.width,
                input.height,
            )))],
            out_pins: vec![OutPin::new(MediaFormat::Video(VideoFormat::h264(
                input.width,
                input.height,
            )))],
            frames_in: 0,
            frames_out: 0,
            logger,
        }
    }

    /// RTP timestamp for a capture time, wrapping like the 32-bit RTP field.
    pub fn rtp_timestamp(capture_time_ms: i64, clock_rate: u32) -> u32 {
        capture_time_ms.wrapping_mul(i64::from(clock_rate / 1000)) as u32
    }
}

impl MediaObject for H264EncoderFilter {
    fn name(&self) -> &str {
        "h264_encoder"
    }

    fn in_pins(&self) -> &[InPin] {
        &self.in_pins
    }

    fn out_pins(&self) -> &[OutPin] {
        &self.out_pins
    }

    fn start(&mut self) -> Result<(), MediaError> {
        self.frames_in = 0;
        self.frames_out = 0;
        self.encoder
            .start(&self.format)
            .map_err(|e| MediaError::Encoder(e.to_string()))?;
        // The receiver cannot decode anything before the first IDR.
        self.encoder.request_keyframe();
        Ok(())
    }

    fn stop(&mut self) {
        self.encoder.stop();
        sink_debug!(
            self.logger,
            "[H264EncoderFilter] stopped after {} in / {} out",
            self.frames_in,
            self.frames_out
        );
    }

    fn on_frame(&mut self, _origin: FrameOrigin, frame: Arc<MediaFrame>, out: &mut FrameEmitter) {
        match frame.format.as_video() {
            Some(v) if v.subtype == VideoSubtype::I420 => {}
            _ => {
                sink_warn!(self.logger, "[H264EncoderFilter] non-I420 frame dropped");
                return;
            }
        }
        self.frames_in += 1;

        let encoded = match self.encoder.encode(&frame) {
            Ok(Some(encoded)) => encoded,
            Ok(None) => return,
            Err(e) => {
                sink_warn!(self.logger, "[H264EncoderFilter] encode failed: {}", e);
                return;
            }
        };
        self.frames_out += 1;

        let (width, height) = frame
            .format
            .as_video()
            .map(|v| (v.width, v.height))
            .unwrap_or((self.format.width, self.format.height));
        let format = MediaFormat::Video(VideoFormat {
            idr: encoded.idr,
            ..VideoFormat::h264(width, height)
        });
        let out_frame = MediaFrame::packed(format, encoded.data)
            .with_capture_time(frame.capture_time_ms)
            .with_rtp_timestamp(Self::rtp_timestamp(frame.capture_time_ms, self.clock_rate));
        out.emit(0, Arc::new(out_frame));
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;
    use crate::push::video_encoder::{EncodeError, EncodedFrame};
    use bytes::Bytes;

    /// Emits a fixed access unit per frame, failing every third one.
    struct StubEncoder {
        calls: u32,
        keyframes: u32,
    }

    impl VideoEncoder for StubEncoder {
        fn start(&mut self, _f: &VideoFormat) -> Result<(), EncodeError> {
            Ok(())
        }
        fn encode(&mut self, _f: &MediaFrame) -> Result<Option<EncodedFrame>, EncodeError> {
            self.calls += 1;
            if self.calls % 3 == 0 {
                return Err(EncodeError::Backend("boom".into()));
            }
            Ok(Some(EncodedFrame {
                data: Bytes::from_static(&[0, 0, 0, 1, 0x65, 1, 2]),
                idr: self.calls == 1,
            }))
        }
        fn request_keyframe(&mut self) {
            self.keyframes += 1;
        }
        fn stop(&mut self) {}
    }

    fn i420(ms: i64) -> Arc<MediaFrame> {
        Arc::new(
            MediaFrame::packed(
                MediaFormat::Video(VideoFormat::i420(4, 2)),
                Bytes::from(vec![0u8; 12]),
            )
            .with_capture_time(ms),
        )
    }

    #[test]
    fn encodes_and_stamps_rtp_time() {
        let mut f = H264EncoderFilter::new(
            Box::new(StubEncoder { calls: 0, keyframes: 0 }),
            VideoFormat::i420(4, 2),
            90_000,
            Arc::new(NoopLogSink),
        );
        f.start().unwrap();

        let mut out = FrameEmitter::new();
        f.on_frame(FrameOrigin::Pin(0), i420(1_000), &mut out);
        let emitted = out.take();
        assert_eq!(emitted.len(), 1);
        let frame = &emitted[0].1;
        assert_eq!(frame.rtp_timestamp, 90_000_000);
        assert_eq!(frame.capture_time_ms, 1_000);
        assert!(frame.format.as_video().unwrap().idr);
        assert_eq!(frame.format.as_video().unwrap().subtype, VideoSubtype::H264);
    }

    #[test]
    fn encode_errors_drop_only_that_frame() {
        let mut f = H264EncoderFilter::new(
            Box::new(StubEncoder { calls: 0, keyframes: 0 }),
            VideoFormat::i420(4, 2),
            90_000,
            Arc::new(NoopLogSink),
        );
        f.start().unwrap();
        let mut out = FrameEmitter::new();
        for ms in 0..6 {
            f.on_frame(FrameOrigin::Pin(0), i420(ms), &mut out);
        }
        assert_eq!(out.take().len(), 4);
    }

    #[test]
    fn rtp_timestamp_wraps() {
        let ms = i64::from(u32::MAX) / 90 + 10;
        let ts = H264EncoderFilter::rtp_timestamp(ms, 90_000);
        assert_eq!(ts, (ms * 90) as u32);
    }
}
