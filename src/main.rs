use anyhow::{anyhow, bail, Context};
use clap::Parser;
use egui::{pos2, vec2};
use mockup_studio::layers::parse_hex_color;
use mockup_studio::project::{AssetLoader, FileAssetLoader};
use mockup_studio::{
    DragTarget, EditorSession, FilterKind, FontFamily, HandleType, OverlayPatch, TextPatch,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Headless mockup compositor: adjust, crop and decorate an image, then
/// write the flattened result as PNG.
#[derive(Parser, Debug)]
#[command(name = "mockup-studio", version)]
struct Args {
    /// Base image (PNG, JPEG or BMP).
    input: PathBuf,

    /// Where to write the flattened PNG.
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Width the image is laid out at; layer and crop coordinates are in
    /// this space. Defaults to the native width.
    #[arg(long)]
    display_width: Option<f32>,

    #[arg(long, default_value_t = 100.0)]
    brightness: f32,
    #[arg(long, default_value_t = 100.0)]
    contrast: f32,
    #[arg(long, default_value_t = 100.0)]
    saturation: f32,
    #[arg(long, default_value_t = 0.0)]
    sepia: f32,
    #[arg(long, default_value_t = 0.0)]
    grayscale: f32,
    #[arg(long, default_value_t = 0.0)]
    blur: f32,
    #[arg(long, default_value_t = 0.0)]
    hue_rotate: f32,

    /// Crop box as `x,y,w,h` in display coordinates.
    #[arg(long, value_name = "X,Y,W,H")]
    crop: Option<String>,

    /// Text layer content; `\n` starts a new line.
    #[arg(long)]
    text: Option<String>,
    /// Text position as `x,y`.
    #[arg(long, value_name = "X,Y")]
    text_pos: Option<String>,
    #[arg(long)]
    font_size: Option<f32>,
    #[arg(long)]
    font: Option<FontFamily>,
    /// Text color as `#rrggbb`.
    #[arg(long)]
    color: Option<String>,

    /// Image to place as an overlay layer.
    #[arg(long)]
    overlay: Option<PathBuf>,
    /// Overlay position as `x,y`.
    #[arg(long, value_name = "X,Y")]
    overlay_pos: Option<String>,
    #[arg(long)]
    overlay_width: Option<f32>,
    #[arg(long, default_value_t = 1.0)]
    overlay_opacity: f32,
}

fn parse_numbers<const N: usize>(value: &str) -> anyhow::Result<[f32; N]> {
    let parts: Vec<f32> = value
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("invalid number list '{}'", value))?;
    parts
        .try_into()
        .map_err(|_| anyhow!("expected {} comma-separated numbers, got '{}'", N, value))
}

fn run(args: Args) -> anyhow::Result<()> {
    let loader = FileAssetLoader;
    let base = loader
        .load(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    let mut session = EditorSession::new(base);

    if let Some(width) = args.display_width {
        let (w, h) = session.native_size();
        session.set_display_size(vec2(width, width * h as f32 / w as f32))?;
    }

    for (kind, value) in [
        (FilterKind::Brightness, args.brightness),
        (FilterKind::Contrast, args.contrast),
        (FilterKind::Saturation, args.saturation),
        (FilterKind::Sepia, args.sepia),
        (FilterKind::Grayscale, args.grayscale),
        (FilterKind::Blur, args.blur),
        (FilterKind::HueRotate, args.hue_rotate),
    ] {
        session.set_filter(kind, value);
    }

    if let Some(crop) = &args.crop {
        let [x, y, w, h] = parse_numbers::<4>(crop)?;
        session.begin_crop();
        let start = session
            .tool()
            .crop()
            .map(|c| c.rect())
            .context("crop mode did not start")?;
        // Move the box to the requested origin, then pull its far corner.
        session.begin_drag(DragTarget::Crop, HandleType::Move, start.min)?;
        session.drag_to(pos2(x, y))?;
        session.end_drag();
        let moved = session.tool().crop().map(|c| c.rect()).context("crop mode ended")?;
        session.begin_drag(DragTarget::Crop, HandleType::SouthEast, moved.max)?;
        session.drag_to(pos2(x + w, y + h))?;
        session.end_drag();
        session.apply_crop()?;
    }

    if let Some(path) = &args.overlay {
        let source = loader
            .load(path)
            .with_context(|| format!("Failed to load overlay {}", path.display()))?;
        let id = session.add_overlay(&source)?;
        let mut patch = OverlayPatch {
            opacity: Some(args.overlay_opacity),
            ..Default::default()
        };
        if let Some(pos) = &args.overlay_pos {
            let [x, y] = parse_numbers::<2>(pos)?;
            patch.position = Some(pos2(x, y));
        }
        if let Some(width) = args.overlay_width {
            let aspect = session
                .layers()
                .overlay(id)
                .map(|o| o.aspect_ratio)
                .unwrap_or(1.0);
            patch.size = Some(vec2(width, width / aspect));
        }
        session.update_overlay(id, patch)?;
    }

    if let Some(content) = &args.text {
        let id = session.add_text();
        let color = match &args.color {
            Some(hex) => {
                let color = parse_hex_color(hex)
                    .with_context(|| format!("invalid color '{}'", hex))?;
                Some(color)
            }
            None => None,
        };
        let position = match &args.text_pos {
            Some(pos) => {
                let [x, y] = parse_numbers::<2>(pos)?;
                Some(pos2(x, y))
            }
            None => None,
        };
        session.update_text(
            id,
            TextPatch {
                content: Some(content.replace("\\n", "\n")),
                color,
                font_size: args.font_size,
                font: args.font,
                position,
            },
        )?;
    }

    session.flatten_layers()?;
    let out = session.current();
    if out.width() == 0 || out.height() == 0 {
        bail!("result is empty");
    }
    std::fs::write(&args.output, out.bytes())
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    log::info!(
        "Wrote {} ({}x{})",
        args.output.display(),
        out.width(),
        out.height()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
