//! The run coordinator: script, images, overlays, outputs, in that order.
//!
//! Slides are processed strictly in carousel order. A slide whose fallback
//! chain is exhausted is recorded as failed and the run continues; partial
//! output with an honest record beats an aborted run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{Local, Utc};

use crate::config::Config;
use crate::formatter;
use crate::orchestrator::Orchestrator;
use crate::overlay::TextOverlayRenderer;
use crate::types::{
    FIRST_PRODUCT_SLIDE, OverlayStatus, RunMetadata, Slide, SlideRecord, SlideRole, SlideScript,
};
use crate::utils::{sanitize_filename, slugify, validate_image_file};

mod context;

pub use context::PipelineContext;

/// What the run produced, for the caller and the exit code.
#[derive(Debug)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    /// Slides with a finished image.
    pub generated: usize,
    /// Positions whose fallback chain was exhausted.
    pub failed: Vec<u8>,
    pub duration: Duration,
}

/// Runs the whole pipeline for `config`. Validation and context construction
/// happen before any model call, so configuration mistakes fail fast.
pub async fn launch(config: &Config) -> Result<RunSummary> {
    config.validate()?;
    let ctx = PipelineContext::new(config.clone())?;
    run(&ctx).await
}

async fn run(ctx: &PipelineContext) -> Result<RunSummary> {
    let config = &ctx.config;
    let started = Instant::now();
    let created_at = Utc::now();

    println!("🚀 Starting carousel run for {}", config.request.product);
    println!("📦 Product model: {}", config.product_model);

    let script = ctx.script_generator.generate(&config.request).await?;

    let reference = prepare_reference(config);
    let mut slides = build_slides(script, reference.is_some());

    let run_name = format!(
        "{}_vsl_{}",
        slugify(&config.request.product),
        Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = config.output_path.join(&run_name);
    let work_dir = config.work_path.join(&run_name);
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create output directory: {}", run_dir.display()))?;
    fs::create_dir_all(&work_dir)
        .with_context(|| format!("Failed to create work directory: {}", work_dir.display()))?;

    let overlay = if config.skip_text_overlay {
        println!("⏭️  Skipping text overlays");
        None
    } else {
        Some(&ctx.overlay)
    };

    let records = produce_slides(
        &ctx.orchestrator,
        overlay,
        &mut slides,
        reference.as_deref(),
        &work_dir,
        &run_dir,
    )
    .await?;

    let duration = started.elapsed();
    let failed: Vec<u8> = records
        .iter()
        .filter(|r| r.failed)
        .map(|r| r.position)
        .collect();
    let generated = records.len() - failed.len();

    let metadata = RunMetadata {
        product: config.request.product.clone(),
        brand: config.request.brand.clone(),
        price: config.request.price,
        currency: config.request.currency.clone(),
        category: config.request.category.clone(),
        product_model: config.product_model.to_string(),
        format_mode: config.format_mode.to_string(),
        created_at,
        duration_secs: duration.as_secs_f64(),
        slide_count: records.len(),
        slides: records,
    };
    write_outputs(&run_dir, &metadata)?;

    if failed.is_empty() {
        println!(
            "🎉 Carousel complete: {} slides in {:.1}s → {}",
            generated,
            duration.as_secs_f64(),
            run_dir.display()
        );
    } else {
        eprintln!(
            "⚠️  Carousel finished with {} failed slide(s): {:?} → {}",
            failed.len(),
            failed,
            run_dir.display()
        );
    }

    Ok(RunSummary {
        output_dir: run_dir,
        generated,
        failed,
        duration,
    })
}

/// Resolves, sanitizes, and formats the product reference photo. Returns
/// `None` when no usable photo exists; the run then renders every slide as a
/// scene slide.
fn prepare_reference(config: &Config) -> Option<PathBuf> {
    let configured = config.request.product_image.as_ref()?;

    let mut path = configured.clone();
    if !path.exists() {
        println!("📸 Looking for product image: {}", path.display());
        match find_similar_file(&path) {
            Some(found) => {
                println!("🔍 Found similar file: {}", found.display());
                path = found;
            }
            None => {
                eprintln!("⚠️  Product image not found: {}", path.display());
                return None;
            }
        }
    }

    // Spaces and punctuation in the filename break downstream tooling.
    let sanitized = sanitize_filename(&path);
    if sanitized != path {
        println!(
            "🔧 Sanitizing filename: {} → {}",
            path.display(),
            sanitized.display()
        );
        match fs::rename(&path, &sanitized) {
            Ok(()) => path = sanitized,
            Err(e) => eprintln!("⚠️  Could not rename file: {}", e),
        }
    }

    if !validate_image_file(&path) {
        eprintln!(
            "⚠️  Product image is not a usable JPEG/PNG: {}",
            path.display()
        );
        return None;
    }

    println!("📐 Formatting product image to 9:16 ({})...", config.format_mode);
    match formatter::format_to_portrait(&path, config.format_mode) {
        Ok(formatted) => {
            println!("✅ Product image formatted: {}", formatted.display());
            Some(formatted)
        }
        Err(e) => {
            eprintln!("⚠️  Could not format image, using it as-is: {}", e);
            Some(path)
        }
    }
}

/// Case- and whitespace-insensitive lookup of `target` in its parent
/// directory. Catches photos saved as "My Product.JPG" and the like.
fn find_similar_file(target: &Path) -> Option<PathBuf> {
    let parent = target.parent()?;
    let wanted = normalize_name(&target.file_name()?.to_string_lossy());

    let entries = fs::read_dir(parent).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if normalize_name(&name.to_string_lossy()) == wanted {
            return Some(entry.path());
        }
    }
    None
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Assigns slide roles: the closing slides show the product itself, but only
/// when a reference photo is available to show.
pub fn build_slides(script: Vec<SlideScript>, has_reference: bool) -> Vec<Slide> {
    script
        .into_iter()
        .map(|s| {
            let role = if has_reference && s.position >= FIRST_PRODUCT_SLIDE {
                SlideRole::Product
            } else {
                SlideRole::Scene
            };
            Slide::from_script(s, role)
        })
        .collect()
}

/// Generates and finishes every slide in order, writing the numbered final
/// images into `run_dir` and returning the per-slide records.
pub async fn produce_slides(
    orchestrator: &Orchestrator,
    overlay: Option<&TextOverlayRenderer>,
    slides: &mut [Slide],
    reference: Option<&Path>,
    work_dir: &Path,
    run_dir: &Path,
) -> Result<Vec<SlideRecord>> {
    let mut records = Vec::with_capacity(slides.len());

    for slide in slides.iter_mut() {
        let outcome = orchestrator
            .generate_slide(slide, reference, work_dir)
            .await;
        let backend = outcome.backend.map(|id| id.to_string());

        if let Some(raw) = &outcome.image_path {
            let final_path = run_dir.join(format!("slide_{:02}.jpg", slide.position));
            slide.overlay = finish_slide(overlay, raw, &slide.caption, &final_path).await?;
            slide.image_path = Some(final_path);
        } else {
            slide.failed = true;
        }

        records.push(SlideRecord {
            position: slide.position,
            role: slide.role,
            caption: slide.caption.clone(),
            image_prompt: slide.image_prompt.clone(),
            backend,
            attempts: outcome.attempts,
            overlay: slide.overlay,
            failed: slide.failed,
        });
    }

    Ok(records)
}

/// Burns the caption onto `raw`, or copies it through untouched when
/// overlays are off. An overlay failure keeps the raw image rather than
/// discarding a finished generation.
async fn finish_slide(
    overlay: Option<&TextOverlayRenderer>,
    raw: &Path,
    caption: &str,
    final_path: &Path,
) -> Result<OverlayStatus> {
    let Some(renderer) = overlay else {
        copy_through(raw, final_path)?;
        return Ok(OverlayStatus::Skipped);
    };

    match renderer.render(raw, caption, final_path).await {
        Ok(()) => Ok(OverlayStatus::Applied),
        Err(e) => {
            eprintln!("⚠️  Overlay failed, keeping raw image: {}", e);
            copy_through(raw, final_path)?;
            Ok(OverlayStatus::Failed)
        }
    }
}

fn copy_through(raw: &Path, final_path: &Path) -> Result<()> {
    fs::copy(raw, final_path).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            raw.display(),
            final_path.display()
        )
    })?;
    Ok(())
}

/// Writes the run record and the human-readable script transcript.
fn write_outputs(run_dir: &Path, metadata: &RunMetadata) -> Result<()> {
    let metadata_path = run_dir.join("metadata.json");
    let json = serde_json::to_string_pretty(metadata).context("Failed to serialize metadata")?;
    fs::write(&metadata_path, json)
        .with_context(|| format!("Failed to write {}", metadata_path.display()))?;

    let script_path = run_dir.join("script.txt");
    fs::write(&script_path, render_script_text(metadata))
        .with_context(|| format!("Failed to write {}", script_path.display()))?;
    Ok(())
}

/// Plain-text transcript of the run for reviewing the carousel without
/// opening the JSON record.
pub fn render_script_text(metadata: &RunMetadata) -> String {
    let mut text = format!(
        "VSL Script for {}\n{}\n\nProduct: {}\nBrand: {}\nPrice: {} {:.2}\nCategory: {}\nProduct Model: {}\nFormat Mode: {}\n\nSLIDES:\n",
        metadata.product,
        "=".repeat(50),
        metadata.product,
        if metadata.brand.is_empty() { "N/A" } else { &metadata.brand },
        metadata.currency,
        metadata.price,
        metadata.category,
        metadata.product_model,
        metadata.format_mode,
    );

    for slide in &metadata.slides {
        text.push_str(&format!(
            "\nSlide {} ({}):\nScript: {}\nImage Prompt: {}\n---\n",
            slide.position, slide.role, slide.caption, slide.image_prompt
        ));
    }

    text.push_str(&format!(
        "\nUPLOAD INSTRUCTIONS:\n1. Upload slides in order (slide_01.jpg, slide_02.jpg, ...)\n2. Use the TikTok Shop carousel format\n3. Monitor engagement and adjust posting strategy as needed\n\nCreated: {}\n",
        metadata.created_at.to_rfc3339()
    ));
    text
}
