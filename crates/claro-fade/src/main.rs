//! Generate a fade comparison image: original on the left, enhanced
//! pipeline output on the right, with a smooth linear blend.

use std::path::PathBuf;

use clap::Parser;
use claro_pipeline::{PipelineConfig, PixelBuffer};
use image::{Rgba, RgbaImage};

/// Generate a fade comparison image: original on the left, enhanced
/// frame on the right, blended smoothly.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input image path.
    input: PathBuf,

    /// Output image path (PNG recommended).
    #[arg(short, long)]
    output: PathBuf,

    /// Center point of the fade gradient as "X,Y" percentages of image
    /// width and height (e.g. "40,40" shifts the 50/50 blend point to
    /// 40% from the left and 40% from the top).
    #[arg(long, value_name = "X,Y", default_value = "50,50")]
    fade_center: String,

    /// Clockwise rotation of the fade gradient direction in degrees.
    /// 0 = horizontal left-to-right, 90 = top-to-bottom.
    #[arg(long, value_name = "DEG", default_value_t = 0.0)]
    fade_angle: f64,
}

// ---------------------------------------------------------------------------
// Fade parameters
// ---------------------------------------------------------------------------

/// Controls the direction, position, and orientation of the blend gradient.
struct FadeParams {
    /// Center of the fade as fractions (0.0–1.0) of image width / height.
    center_x: f64,
    center_y: f64,
    /// Clockwise rotation angle in radians.
    angle_rad: f64,
}

impl FadeParams {
    /// Parse `--fade-center "X,Y"` (percentages) and `--fade-angle` (degrees).
    fn parse(center: &str, angle_deg: f64) -> Result<Self, String> {
        let (x_str, y_str) = center
            .split_once(',')
            .ok_or_else(|| format!("fade-center must be 'X,Y', got: '{center}'"))?;

        let x_pct: f64 = x_str
            .trim()
            .parse()
            .map_err(|e| format!("invalid fade-center X '{x_str}': {e}"))?;
        let y_pct: f64 = y_str
            .trim()
            .parse()
            .map_err(|e| format!("invalid fade-center Y '{y_str}': {e}"))?;

        Ok(Self {
            center_x: x_pct / 100.0,
            center_y: y_pct / 100.0,
            angle_rad: angle_deg.to_radians(),
        })
    }
}

// ---------------------------------------------------------------------------
// Image blending
// ---------------------------------------------------------------------------

/// Blend two RGBA images along a directed linear gradient.
///
/// The gradient is centred on `fade.center_x/y` (as fractions of the image
/// dimensions) and rotated by `fade.angle_rad` clockwise. `t = 0.5` falls
/// exactly on the centre point; the gradient extends symmetrically to the
/// farthest image corner in each direction.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend_images(original: &RgbaImage, enhanced: &RgbaImage, fade: &FadeParams) -> RgbaImage {
    let (width, height) = original.dimensions();
    let mut output = RgbaImage::new(width, height);

    let w = f64::from(width);
    let h = f64::from(height);
    let cx = fade.center_x * w;
    let cy = fade.center_y * h;
    let cos_a = fade.angle_rad.cos();
    let sin_a = fade.angle_rad.sin();

    // Project the four image corners onto the gradient axis (relative to
    // the centre) and find the symmetric half-extent so that t = 0.5 at
    // the centre point.
    let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)];
    let mut half_extent: f64 = 0.0;
    for &(x, y) in &corners {
        let proj = (x - cx).mul_add(cos_a, (y - cy) * sin_a);
        half_extent = half_extent.max(proj.abs());
    }

    let inv_extent = if half_extent > f64::EPSILON {
        0.5 / half_extent
    } else {
        0.0
    };

    for y_px in 0..height {
        for x_px in 0..width {
            let proj = (f64::from(x_px) - cx).mul_add(cos_a, (f64::from(y_px) - cy) * sin_a);
            let t = proj.mul_add(inv_extent, 0.5).clamp(0.0, 1.0);

            let orig = original.get_pixel(x_px, y_px);
            let enh = enhanced.get_pixel(x_px, y_px);

            let blend = |o: u8, e: u8| -> u8 {
                let val = f64::from(o).mul_add(1.0 - t, f64::from(e) * t);
                val.round().clamp(0.0, 255.0) as u8
            };

            output.put_pixel(
                x_px,
                y_px,
                Rgba([
                    blend(orig[0], enh[0]),
                    blend(orig[1], enh[1]),
                    blend(orig[2], enh[2]),
                    blend(orig[3], enh[3]),
                ]),
            );
        }
    }
    output
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    eprintln!("Reading image from {}", args.input.display());
    let original = image::open(&args.input)?.into_rgba8();

    eprintln!("Enhancing with default pipeline configuration...");
    let frame = PixelBuffer::from_image(original.clone())?;
    let result = claro_pipeline::enhance(frame, &PipelineConfig::default())?;

    eprintln!(
        "Quality: brightness {:.1}%, contrast {:.1}%, sharpness {:.1}%, noise {:.1}%",
        result.quality.brightness,
        result.quality.contrast,
        result.quality.sharpness,
        result.quality.noise,
    );
    for advisory in &result.quality.recommendations {
        eprintln!("  advisory: {advisory}");
    }

    let fade = FadeParams::parse(&args.fade_center, args.fade_angle)
        .map_err(|e| format!("--fade-center / --fade-angle: {e}"))?;

    eprintln!(
        "Fade center: ({:.0}%, {:.0}%), angle: {:.1}°",
        fade.center_x * 100.0,
        fade.center_y * 100.0,
        args.fade_angle,
    );

    eprintln!("Blending images...");
    let enhanced = result.buffer.into_image();
    let blended = blend_images(&original, &enhanced, &fade);

    eprintln!("Saving to {}", args.output.display());
    blended.save(&args.output)?;

    eprintln!("Done.");
    Ok(())
}
