use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Catalog records
// ---------------------------------------------------------------------------
//
// Serialized in camelCase: this is the wire format the browser client
// consumes and the pre-generated snapshot persists.

/// A top-level course: one storage prefix and its videos.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub name: String,
    pub path: String,
    pub videos: Vec<Video>,
}

/// A logical asset group: one video object plus its subtitle and transcript
/// siblings, unified by shared base filename.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub name: String,
    pub video_url: String,
    pub vtt_urls: BTreeMap<String, String>,
    pub srt_urls: BTreeMap<String, String>,
    pub txt_urls: BTreeMap<String, String>,
    pub transcript: String,
    /// Language codes accumulated from both subtitle maps. A language
    /// present in both VTT and SRT form appears twice; downstream consumers
    /// have historically relied on the raw list, so it is not deduplicated.
    pub available_languages: Vec<String>,
}
