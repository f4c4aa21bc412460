//! Frame conversion and transformation utilities.

use super::types::RawFrame;

/// Convert a nokhwa buffer to our RGB frame format.
///
/// Returns `None` if the conversion fails (unsupported format or corrupt data).
#[cfg(feature = "native-camera")]
pub fn convert_to_rgb(buffer: &nokhwa::Buffer) -> Option<RawFrame> {
    use nokhwa::pixel_format::RgbFormat;

    let decoded = buffer.decode_image::<RgbFormat>().ok()?;
    let resolution = buffer.resolution();

    Some(RawFrame {
        data: decoded.into_raw(),
        width: resolution.width(),
        height: resolution.height(),
        timestamp: std::time::Instant::now(),
    })
}

/// Mirror a frame horizontally (flip left-right).
///
/// A frame whose buffer does not match its dimensions is left untouched.
pub fn mirror_horizontal(frame: &mut RawFrame) {
    if !frame.is_well_formed() {
        log::debug!(
            "Not mirroring malformed frame ({} bytes for {}x{})",
            frame.data.len(),
            frame.width,
            frame.height
        );
        return;
    }
    let width = frame.width as usize;
    let height = frame.height as usize;
    let bpp = frame.bytes_per_pixel();

    for y in 0..height {
        let row_start = y * width * bpp;
        let row = &mut frame.data[row_start..row_start + width * bpp];

        for x in 0..width / 2 {
            let left = x * bpp;
            let right = (width - 1 - x) * bpp;
            for i in 0..bpp {
                row.swap(left + i, right + i);
            }
        }
    }
}
