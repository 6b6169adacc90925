//! PNG decoding for uploaded images

use tiny_skia::{IntSize, Pixmap};

use crate::error::ClientError;

fn decode_error(reason: impl ToString) -> ClientError {
    ClientError::Decode {
        what: "image",
        reason: reason.to_string(),
    }
}

/// Decode PNG data into a premultiplied pixmap
pub fn decode_png(data: &[u8]) -> Result<Pixmap, ClientError> {
    let mut decoder = png::Decoder::new(data);
    // Palette and low bit depths expand to 8-bit channels
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(decode_error)?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).map_err(decode_error)?;
    let pixels = &buf[..info.buffer_size()];

    let rgba: Vec<u8> = match info.color_type {
        png::ColorType::Rgba => pixels.to_vec(),
        png::ColorType::Rgb => pixels
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        png::ColorType::GrayscaleAlpha => pixels
            .chunks_exact(2)
            .flat_map(|px| [px[0], px[0], px[0], px[1]])
            .collect(),
        png::ColorType::Grayscale => pixels.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        png::ColorType::Indexed => return Err(decode_error("unexpanded palette")),
    };

    from_straight_rgba(rgba, info.width, info.height)
}

/// Build a pixmap from straight (non-premultiplied) RGBA bytes
pub fn from_straight_rgba(mut rgba: Vec<u8>, width: u32, height: u32) -> Result<Pixmap, ClientError> {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }

    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| decode_error(format!("invalid size {width}x{height}")))?;
    Pixmap::from_vec(rgba, size).ok_or_else(|| decode_error("pixel buffer size mismatch"))
}
