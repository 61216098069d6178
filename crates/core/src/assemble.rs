use crate::error::SearchError;
use crate::highlight::{HighlightTags, Highlighter};
use crate::locator::{locate, match_kind, MatchKind};
use crate::models::{Match, MatchIndex, TranscriptDocument, TranscriptSentence, VideoResult};
use tracing::warn;

pub fn snippet_text(
    transcript: &[TranscriptSentence],
    index: MatchIndex,
    query_words: &[String],
) -> Option<String> {
    let sentence = transcript.get(index)?;

    match (match_kind(transcript, index, query_words), transcript.get(index + 1)) {
        (Some(MatchKind::Boundary), Some(next)) => Some(format!("{} {}", sentence.text, next.text)),
        _ => Some(sentence.text.clone()),
    }
}

pub fn assemble(
    indices: &[MatchIndex],
    transcript: &[TranscriptSentence],
    query_words: &[String],
) -> Result<Vec<Match>, SearchError> {
    let highlighter = Highlighter::new(query_words, HighlightTags::default())?;
    assemble_with(indices, transcript, query_words, &highlighter)
}

pub fn assemble_with(
    indices: &[MatchIndex],
    transcript: &[TranscriptSentence],
    query_words: &[String],
    highlighter: &Highlighter,
) -> Result<Vec<Match>, SearchError> {
    indices
        .iter()
        .map(|&index| {
            let text = snippet_text(transcript, index, query_words).ok_or_else(|| {
                SearchError::InvalidInput {
                    video_id: String::new(),
                    details: format!(
                        "match index {index} is outside a transcript of {} sentences",
                        transcript.len()
                    ),
                }
            })?;

            Ok(Match {
                snippet: highlighter.highlight(&text),
                timestamp: transcript[index].start,
            })
        })
        .collect()
}

pub fn build_video_result(
    document: &TranscriptDocument,
    query_words: &[String],
    highlighter: &Highlighter,
) -> Result<Option<VideoResult>, SearchError> {
    let transcript = document.sentences()?;
    let indices = locate(&transcript, query_words);
    if indices.is_empty() {
        return Ok(None);
    }

    let matches = assemble_with(&indices, &transcript, query_words, highlighter).map_err(
        |error| match error {
            SearchError::InvalidInput { details, .. } => SearchError::InvalidInput {
                video_id: document.id.clone(),
                details,
            },
            other => other,
        },
    )?;

    Ok(Some(VideoResult {
        video_id: document.id.clone(),
        title: document.title.clone(),
        channel_id: document.channel_id.clone(),
        channel_name: document.channel_name.clone(),
        duration: document.duration,
        upload_date: document.upload_date,
        matches,
    }))
}

// Videos with malformed transcript data are logged and skipped.
pub fn collect_video_results(
    documents: &[TranscriptDocument],
    query_words: &[String],
    highlighter: &Highlighter,
) -> Result<Vec<VideoResult>, SearchError> {
    let mut results = Vec::new();

    for document in documents {
        match build_video_result(document, query_words, highlighter) {
            Ok(Some(result)) => {
                tracing::debug!(
                    video_id = %result.video_id,
                    matches = result.matches.len(),
                    "video matched"
                );
                results.push(result);
            }
            Ok(None) => {}
            Err(SearchError::InvalidInput { video_id, details }) => {
                warn!(video_id = %video_id, reason = %details, "skipping video");
            }
            Err(error) => return Err(error),
        }
    }

    Ok(results)
}
