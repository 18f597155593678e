//! Segment rows recorded in the corpus `Dataset` table.

/// Speaker recorded when the transcription stage could not attribute one.
///
/// The upstream pipeline was inconsistent here (`0` at one call site, "the
/// current speaker" at another); every call site in this crate routes
/// through this constant instead.
pub const DEFAULT_SPEAKER_ID: u32 = 0;

/// One transcribed audio segment, keyed to its parent `Audio` row.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Remote path of the segment audio file.
    pub file_path: String,
    /// Transcript produced by the ASR stage.
    pub text: String,
    pub audio_id: u64,
    pub segment_num: u32,
    /// Raw sample frames; stored in the schema's `audio_lenght` column.
    pub frames: u64,
    pub duration: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub speaker_id: u32,
}

impl Segment {
    /// A missing `speaker_id` records [`DEFAULT_SPEAKER_ID`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file_path: impl Into<String>,
        text: impl Into<String>,
        audio_id: u64,
        segment_num: u32,
        frames: u64,
        duration: f64,
        start_time: f64,
        end_time: f64,
        speaker_id: Option<u32>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            text: text.into(),
            audio_id,
            segment_num,
            frames,
            duration,
            start_time,
            end_time,
            speaker_id: speaker_id.unwrap_or(DEFAULT_SPEAKER_ID),
        }
    }
}
