use std::path::Path;

use crate::probe::StreamDescriptor;

/// How many times the video segment must repeat to cover the audio track.
///
/// Clamped to a minimum of one pass: a video as long as (or longer than)
/// the audio, or degenerate duration data, means no looping is needed.
pub fn loops_count(video: &StreamDescriptor, audio: &StreamDescriptor) -> u32 {
    if video.duration <= 0.0 {
        return 1;
    }
    let count = (audio.duration / video.duration).floor();
    if count.is_finite() && count >= 1.0 {
        count as u32
    } else {
        1
    }
}

/// Concat-demuxer manifest: one `file '<path>'` line per repetition, no
/// trailing newline after the final entry. Paths are normalized to forward
/// slashes regardless of host convention; the demuxer's own mini-syntax
/// chokes on backslashes.
///
/// Listing the repetitions in a file rather than on the command line is what
/// keeps a 0.5s clip paired with minutes of audio from blowing past OS
/// argument-length limits.
pub fn manifest_contents(ts_path: &Path, loops: u32) -> String {
    let normalized = ts_path.to_string_lossy().replace('\\', "/");
    let line = format!("file '{normalized}'");
    vec![line; loops as usize].join("\n")
}
