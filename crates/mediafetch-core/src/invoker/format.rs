//! Format selection expressions passed to the tool's `-f` flag.

use crate::job_db::QualitySelector;

/// Best audio-only stream, preferring m4a, falling back to any best stream.
pub const AUDIO_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio/best";

/// Primary expression plus fallback chain for a video quality.
///
/// Capped tiers keep the exact height ceiling in every alternative so a
/// fallback never exceeds the requested resolution.
pub fn video_format_selector(quality: QualitySelector) -> String {
    match quality {
        QualitySelector::Best => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
        QualitySelector::Worst => {
            "worstvideo[ext=mp4]+worstaudio[ext=m4a]/worst[ext=mp4]/worst".to_string()
        }
        QualitySelector::Max1080 | QualitySelector::Max720 | QualitySelector::Max480 => {
            let h = quality.height_ceiling().unwrap_or(1080);
            format!(
                "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best[height<={h}]"
            )
        }
    }
}
