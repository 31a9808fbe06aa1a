//! Burns TikTok-style captions onto slides with FFmpeg's drawtext filter.
//!
//! The renderer fails closed: a missing binary or a non-zero FFmpeg exit is an
//! error, never a silently corrupt image. The run coordinator decides what to
//! do with a slide whose overlay failed.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result, bail};

use crate::config::OverlayConfig;

const FALLBACK_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

/// Strips characters that break FFmpeg's drawtext argument parsing.
pub fn sanitize_caption(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\'' | '"' | '[' | ']' => None,
            ':' | '=' | '-' => Some(' '),
            c => Some(c),
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Greedy word wrap at a fixed character threshold. A single word longer than
/// the threshold stays on its own line rather than being split.
pub fn wrap_caption(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate_len = if current.is_empty() {
            word.len()
        } else {
            current.len() + 1 + word.len()
        };

        if candidate_len <= max_chars {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else if current.is_empty() {
            lines.push(word.to_string());
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Vertical anchor for the text block. Longer captions shift upward so the
/// last line stays clear of the bottom edge.
pub fn anchor_factor(line_count: usize, base: f64) -> f64 {
    if line_count > 6 {
        (base - (line_count - 6) as f64 * 0.03).max(0.40)
    } else if line_count > 4 {
        base - 0.02
    } else {
        base
    }
}

pub struct TextOverlayRenderer {
    config: OverlayConfig,
}

impl TextOverlayRenderer {
    pub fn new(config: OverlayConfig) -> Self {
        Self { config }
    }

    /// Verifies that FFmpeg is invocable. Called once at startup when
    /// overlays are enabled; a missing tool is a configuration error.
    pub fn probe(&self) -> Result<()> {
        let status = std::process::Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| {
                format!(
                    "FFmpeg not found at '{}'; install it or pass --skip-text-overlay",
                    self.config.ffmpeg_path.display()
                )
            })?;
        if !status.success() {
            bail!("FFmpeg probe exited with {}", status);
        }
        Ok(())
    }

    fn font_file(&self) -> PathBuf {
        if self.config.font_path.exists() {
            self.config.font_path.clone()
        } else {
            PathBuf::from(FALLBACK_FONT)
        }
    }

    /// One drawtext filter per wrapped line, stacked from the shared anchor.
    fn build_filter(&self, lines: &[String]) -> String {
        let font = self.font_file();
        let pixels_per_line = self.config.font_size + self.config.line_spacing;
        let start_y = anchor_factor(lines.len(), self.config.y_anchor);

        lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let offset = i as u32 * pixels_per_line;
                format!(
                    "drawtext=fontfile='{}':text='{}':fontcolor=white:fontsize={}:x=(w-text_w)/2:y=(h*{:.2})-(text_h/2)+{}:borderw={}:bordercolor=black:shadowx=2:shadowy=2:shadowcolor=black",
                    font.display(),
                    line,
                    self.config.font_size,
                    start_y,
                    offset,
                    self.config.outline_width,
                )
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Renders `caption` onto `image`, writing the composited result to
    /// `output`.
    pub async fn render(&self, image: &Path, caption: &str, output: &Path) -> Result<()> {
        let lines = wrap_caption(&sanitize_caption(caption), self.config.max_chars_per_line);
        if lines.is_empty() {
            bail!("Caption is empty after sanitizing");
        }
        let filter = self.build_filter(&lines);

        let result = tokio::process::Command::new(&self.config.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(image)
            .arg("-vf")
            .arg(&filter)
            .arg("-q:v")
            .arg("2")
            .arg(output)
            .output()
            .await
            .with_context(|| {
                format!("Failed to spawn '{}'", self.config.ffmpeg_path.display())
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            bail!(
                "FFmpeg exited with {}: {}",
                result.status,
                stderr.trim().lines().last().unwrap_or("no output")
            );
        }
        Ok(())
    }
}
