use crate::error::SearchError;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UrlKind {
    Video,
    Playlist,
    Channel,
}

#[derive(Debug, Clone)]
pub struct UrlPatterns {
    pub video: &'static str,
    pub playlist: &'static str,
    pub channel: &'static str,
}

impl Default for UrlPatterns {
    fn default() -> Self {
        Self {
            // The id may not start with any letter of "playlist" or "channel",
            // which keeps playlist and channel paths out of the video branch.
            video: r"^((?:https?:)?//)?((?:www|m)\.)?((?:youtube\.com|youtu.be))(/(?:[\w\-]+\?v=|embed/|v/)?)([\w\-&&[^playistchne|]][\w\-]*)(\S+)?$",
            playlist: r"^((?:https?:)?//)?((?:www|m)\.)?(youtube\.com)/(.*)[&|?](list=[\w\-]+)(&index=[0-9]*)?(&si=[\w\-]+)?$",
            channel: r"^((?:https?:)?//)?((?:www|m)\.)?(youtube\.com)/(((c/)?[\w\-.]+)|(@[\w\-.]{3,30})|(channel/[\w\-]+))(\?si=[\w\-]+)?(/videos|/featured)?$",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UrlClassifier {
    video: Regex,
    playlist: Regex,
    channel: Regex,
}

impl UrlClassifier {
    pub fn new(patterns: &UrlPatterns) -> Result<Self, SearchError> {
        Ok(Self {
            video: Regex::new(patterns.video)?,
            playlist: Regex::new(patterns.playlist)?,
            channel: Regex::new(patterns.channel)?,
        })
    }

    pub fn classify(&self, url: &str) -> Result<UrlKind, SearchError> {
        let url = url.trim();

        if self.video.is_match(url) {
            Ok(UrlKind::Video)
        } else if self.playlist.is_match(url) {
            Ok(UrlKind::Playlist)
        } else if self.channel.is_match(url) {
            Ok(UrlKind::Channel)
        } else {
            Err(SearchError::InvalidUrl(url.to_string()))
        }
    }
}

pub fn classify_url(url: &str) -> Result<UrlKind, SearchError> {
    UrlClassifier::new(&UrlPatterns::default())?.classify(url)
}
