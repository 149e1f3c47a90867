// SPDX-License-Identifier: GPL-3.0-only

//! Decoded video frames and packed pixel format conversion
//!
//! Decoders hand out frames in whatever packed layout GStreamer negotiated.
//! The virtual camera contract is tightly packed RGB, so every frame goes
//! through [`VideoFrame::to_rgb`] before it is sent.

use crate::errors::{BackendError, BackendResult};
use std::sync::Arc;

/// Packed pixel layouts produced by the decoders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// RGB24 - 3 bytes per pixel
    Rgb,
    /// BGR24 - 3 bytes per pixel, blue first
    Bgr,
    /// RGBA - 4 bytes per pixel with alpha
    Rgba,
    /// BGRA - 4 bytes per pixel, blue first
    Bgra,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }

    /// GStreamer video/x-raw format string
    pub fn to_gst_format_string(&self) -> &'static str {
        match self {
            Self::Rgb => "RGB",
            Self::Bgr => "BGR",
            Self::Rgba => "RGBA",
            Self::Bgra => "BGRA",
        }
    }

    /// Parse a GStreamer format string
    pub fn from_gst_format_string(format: &str) -> Option<Self> {
        match format {
            "RGB" => Some(Self::Rgb),
            "BGR" => Some(Self::Bgr),
            "RGBA" | "RGBx" => Some(Self::Rgba),
            "BGRA" | "BGRx" => Some(Self::Bgra),
            _ => None,
        }
    }

    /// Byte offsets of the red, green and blue components within one pixel
    fn rgb_offsets(&self) -> [usize; 3] {
        match self {
            Self::Rgb | Self::Rgba => [0, 1, 2],
            Self::Bgr | Self::Bgra => [2, 1, 0],
        }
    }
}

/// One decoded picture
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Pixel data, `stride * height` bytes
    pub data: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    pub format: PixelFormat,
}

impl VideoFrame {
    /// Wrap tightly packed pixel data
    pub fn packed(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data: Arc::from(data.into_boxed_slice()),
            width,
            height,
            stride: width * format.bytes_per_pixel() as u32,
            format,
        }
    }

    /// Size in bytes of a tightly packed RGB frame of these dimensions
    pub fn rgb_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Convert to tightly packed RGB
    ///
    /// Packed RGB input without row padding is returned without copying.
    pub fn to_rgb(&self) -> BackendResult<VideoFrame> {
        let width = self.width as usize;
        let height = self.height as usize;
        let stride = self.stride as usize;
        let bpp = self.format.bytes_per_pixel();
        let row_bytes = width * bpp;

        if stride < row_bytes || self.data.len() < stride * height.saturating_sub(1) + row_bytes {
            return Err(BackendError::FormatNotSupported(format!(
                "Frame data size {} too small for {}x{} {:?} (stride {})",
                self.data.len(),
                self.width,
                self.height,
                self.format,
                self.stride
            )));
        }

        if self.format == PixelFormat::Rgb && stride == row_bytes {
            return Ok(self.clone());
        }

        let [r, g, b] = self.format.rgb_offsets();
        let mut rgb = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            let row = &self.data[y * stride..y * stride + row_bytes];
            for pixel in row.chunks_exact(bpp) {
                rgb.push(pixel[r]);
                rgb.push(pixel[g]);
                rgb.push(pixel[b]);
            }
        }

        Ok(VideoFrame::packed(rgb, self.width, self.height, PixelFormat::Rgb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgr_to_rgb_swaps_channels() {
        let frame = VideoFrame::packed(vec![1, 2, 3, 4, 5, 6], 2, 1, PixelFormat::Bgr);
        let rgb = frame.to_rgb().unwrap();
        assert_eq!(&*rgb.data, &[3, 2, 1, 6, 5, 4]);
        assert_eq!(rgb.format, PixelFormat::Rgb);
        assert_eq!(rgb.stride, 6);
    }

    #[test]
    fn test_rgba_drops_alpha_and_padding() {
        // 1x2 frame with 2 bytes of row padding
        let data = vec![10, 20, 30, 255, 0, 0, 40, 50, 60, 255, 0, 0];
        let frame = VideoFrame {
            data: Arc::from(data.into_boxed_slice()),
            width: 1,
            height: 2,
            stride: 6,
            format: PixelFormat::Rgba,
        };
        let rgb = frame.to_rgb().unwrap();
        assert_eq!(&*rgb.data, &[10, 20, 30, 40, 50, 60]);
        assert_eq!(rgb.rgb_len(), 6);
    }

    #[test]
    fn test_packed_rgb_is_shared() {
        let frame = VideoFrame::packed(vec![0; 12], 2, 2, PixelFormat::Rgb);
        let rgb = frame.to_rgb().unwrap();
        assert!(Arc::ptr_eq(&frame.data, &rgb.data));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let frame = VideoFrame::packed(vec![0; 5], 2, 1, PixelFormat::Bgra);
        assert!(frame.to_rgb().is_err());
    }

    #[test]
    fn test_gst_format_strings() {
        assert_eq!(PixelFormat::from_gst_format_string("BGRx"), Some(PixelFormat::Bgra));
        assert_eq!(PixelFormat::from_gst_format_string("NV12"), None);
        for format in [PixelFormat::Rgb, PixelFormat::Bgr, PixelFormat::Rgba, PixelFormat::Bgra] {
            let name = format.to_gst_format_string();
            assert_eq!(PixelFormat::from_gst_format_string(name), Some(format));
        }
    }
}
