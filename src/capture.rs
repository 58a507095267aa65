//! Frame capture module.
//! Uses `xcap` for cross-platform screenshots of the primary display and
//! crops to the configured board bounds; the crop is JPEG-encoded in memory
//! for upload. Also loads user-supplied image files, the upload path.
//! Permissions note: on macOS, grant "Screen & System Audio Recording"
//! permission to the terminal in System Settings > Privacy & Security.

use std::io::Cursor;
use std::time::Instant;
use std::{env, fs};

use anyhow::{Context, Result, bail};
use image::{DynamicImage, GenericImageView, ImageFormat};
use log::debug;
use xcap::Monitor;

use crate::config::CaptureBounds;

/// Grabs the primary monitor, crops to `bounds` and returns JPEG bytes.
/// Debug: set `DEBUG_CAPTURE=1` to save the crop to `screenshots/debug_board.png`.
pub fn grab_frame(bounds: CaptureBounds) -> Result<Vec<u8>> {
    let start = Instant::now();

    let monitors = Monitor::all().context("Failed to enumerate monitors")?;

    let primary_monitor = monitors.first().cloned().context("No monitors found")?;

    let screenshot_raw = primary_monitor.capture_image().context(
        "Failed to capture image. On macOS, ensure the terminal has Screen Recording \
         permission in System Settings > Privacy & Security",
    )?;

    let screenshot = DynamicImage::ImageRgba8(screenshot_raw);
    if screenshot.dimensions() == (0, 0) {
        bail!("Captured empty screenshot - possible permission issue or no display");
    }

    if bounds.width < 64 || bounds.height < 64 {
        bail!("Capture bounds too small for a chessboard (min ~64x64 pixels)");
    }

    let (screen_w, screen_h) = screenshot.dimensions();
    if bounds.x >= screen_w
        || bounds.y >= screen_h
        || bounds.x.saturating_add(bounds.width) > screen_w
        || bounds.y.saturating_add(bounds.height) > screen_h
    {
        bail!(
            "Crop bounds ({},{},{},{}) exceed screenshot dimensions {}x{}",
            bounds.x, bounds.y, bounds.width, bounds.height, screen_w, screen_h
        );
    }

    let cropped = screenshot.crop_imm(bounds.x, bounds.y, bounds.width, bounds.height);
    if env::var_os("DEBUG_CAPTURE").is_some() {
        fs::create_dir_all("screenshots")
            .context("Failed to create screenshots/ debug directory")?;
        cropped
            .save("screenshots/debug_board.png")
            .context("Failed to save debug board image to screenshots/")?;
    }

    let encoded = encode_jpeg(&cropped)?;
    debug!("capture + crop + encode latency: {:?}", start.elapsed());
    Ok(encoded)
}

/// In-memory JPEG encoding. JPEG has no alpha channel, so the frame is
/// flattened to RGB first.
pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .context("Failed to encode frame as JPEG")?;
    Ok(buffer.into_inner())
}

/// Reads an image file picked by the user; the bytes are uploaded as-is.
pub fn load_image_file(path: &str) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read image file {}", path))
}
