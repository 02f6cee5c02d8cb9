//! Rendering a [`QrCode`] as text, SVG or a grayscale image.

use std::fs;
use std::path::Path;

use image::{ImageBuffer, Luma};
use tracing::debug;

use crate::error::Result;
use crate::qrcode::QrCode;

/// The quiet zone the standard asks for, in modules.
pub const DEFAULT_BORDER: u32 = 4;

/// Returns the symbol as lines of text, two characters per module so it looks square
/// in a terminal. Uses Unix newlines.
pub fn to_console_string(qr: &QrCode, border: u32) -> String {
    let border = border as i32;
    let mut result = String::new();
    for y in -border..qr.size() + border {
        for x in -border..qr.size() + border {
            let c: char = if qr.get_module(x, y) { '█' } else { ' ' };
            result.push(c);
            result.push(c);
        }
        result.push('\n');
    }
    result
}

/// Prints the given QrCode object to the console.
pub fn print_qr(qr: &QrCode) {
    println!("{}", to_console_string(qr, DEFAULT_BORDER));
}

/// Returns an SVG document for the symbol with `border` light modules around it.
///
/// Each horizontal run of dark modules becomes one rectangle in a single path. The
/// string always uses Unix newlines.
pub fn to_svg_string(qr: &QrCode, border: u32) -> String {
    let border = border as i32;
    let dimension = qr.size() + border * 2;
    let mut path: Vec<String> = Vec::new();
    for (y, row) in qr.rows().enumerate() {
        let mut x = 0;
        while x < row.len() {
            if !row[x] {
                x += 1;
                continue;
            }
            let run = row[x..].iter().take_while(|&&dark| dark).count();
            path.push(format!(
                "M{},{}h{run}v1h-{run}z",
                x as i32 + border,
                y as i32 + border
            ));
            x += run;
        }
    }
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n",
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" viewBox=\"0 0 {dim} {dim}\" stroke=\"none\">\n",
            "\t<rect width=\"100%\" height=\"100%\" fill=\"#FFFFFF\"/>\n",
            "\t<path d=\"{path}\" fill=\"#000000\"/>\n",
            "</svg>\n",
        ),
        dim = dimension,
        path = path.join(" "),
    )
}

/// Renders the symbol into a grayscale buffer, `scale` pixels per module, surrounded
/// by `border` light modules.
///
/// # Example
///
/// ```
/// use qrcore::{helper::to_image_buffer, EcLevel, QrCode};
///
/// let qr = QrCode::encode_text("Hello, World!", EcLevel::L).unwrap();
/// let img = to_image_buffer(&qr, 4, 1);
/// assert_eq!(img.dimensions(), (29, 29));
/// ```
pub fn to_image_buffer(qr: &QrCode, border: u32, scale: u32) -> ImageBuffer<Luma<u8>, Vec<u8>> {
    let scale = scale.max(1);
    let size = (qr.size() as u32 + 2 * border) * scale;
    let mut img = ImageBuffer::new(size, size);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let qr_x = (x / scale) as i32 - border as i32;
        let qr_y = (y / scale) as i32 - border as i32;
        *pixel = if qr.get_module(qr_x, qr_y) {
            Luma([0u8]) // Black
        } else {
            Luma([255u8]) // White
        };
    }

    img
}

/// Renders the symbol and writes it as a PNG file, creating missing parent directories.
///
/// # Errors
///
/// Returns [`QrError::Io`](crate::QrError::Io) if the directory cannot be created and
/// [`QrError::Image`](crate::QrError::Image) if the image cannot be written.
pub fn save_png(qr: &QrCode, path: impl AsRef<Path>, border: u32, scale: u32) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let img = to_image_buffer(qr, border, scale);
    img.save_with_format(path, image::ImageFormat::Png)?;
    debug!(path = %path.display(), width = img.width(), "Saved PNG");
    Ok(())
}
