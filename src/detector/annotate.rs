use std::io::Cursor;

use anyhow::Result;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use super::Detection;

// Border colors cycled by class id.
const PALETTE: [[u8; 3]; 6] = [
    [255, 140, 0],
    [100, 149, 237],
    [220, 20, 60],
    [50, 205, 50],
    [255, 215, 0],
    [186, 85, 211],
];

/// Draw a hollow box around every detection on a copy of the image.
pub fn draw_detections(image: &DynamicImage, detections: &[Detection]) -> RgbaImage {
    let mut canvas = image.to_rgba8();
    let (img_w, img_h) = (canvas.width() as i32, canvas.height() as i32);

    for detection in detections {
        let [r, g, b] = PALETTE[detection.class_id as usize % PALETTE.len()];
        let color = Rgba([r, g, b, 255]);

        let x = (detection.x1 as i32).clamp(0, img_w - 1);
        let y = (detection.y1 as i32).clamp(0, img_h - 1);
        let w = ((detection.x2 - detection.x1) as i32).clamp(1, img_w - x);
        let h = ((detection.y2 - detection.y1) as i32).clamp(1, img_h - y);

        // Two nested rects give a 2px border.
        draw_hollow_rect_mut(&mut canvas, Rect::at(x, y).of_size(w as u32, h as u32), color);
        if w > 2 && h > 2 {
            draw_hollow_rect_mut(
                &mut canvas,
                Rect::at(x + 1, y + 1).of_size((w - 2) as u32, (h - 2) as u32),
                color,
            );
        }
    }

    canvas
}

/// Encode an annotated image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image.clone()).write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
