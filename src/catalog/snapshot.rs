use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::Course;

// ---------------------------------------------------------------------------
// Pre-generated catalog snapshot
// ---------------------------------------------------------------------------

/// Persisted catalog produced by the offline pre-generation pass.
///
/// The server seeds its catalog cache from this file at startup to avoid
/// paying the full listing cost before the first request. URLs inside were
/// signed with the long pre-generation expiry and subtitle references are
/// absolute (they include the serving host).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub generated_at: DateTime<Utc>,
    pub bucket_name: String,
    pub courses: Vec<Course>,
}

impl CatalogSnapshot {
    pub fn new(bucket_name: impl Into<String>, courses: Vec<Course>) -> Self {
        Self {
            generated_at: Utc::now(),
            bucket_name: bucket_name.into(),
            courses,
        }
    }

    /// Load a snapshot from disk. Absence or corruption is an `Err` the
    /// caller downgrades to "no snapshot, rebuild live".
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data = tokio::fs::read(path.as_ref()).await?;
        let snapshot: CatalogSnapshot = serde_json::from_slice(&data)?;
        Ok(snapshot)
    }

    /// Write the snapshot as pretty-printed JSON.
    pub async fn write(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path.as_ref(), json).await?;
        Ok(())
    }

    pub fn video_count(&self) -> usize {
        self.courses.iter().map(|c| c.videos.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::Video;
    use std::collections::BTreeMap;

    fn sample() -> CatalogSnapshot {
        CatalogSnapshot::new(
            "course-media",
            vec![Course {
                name: "Physics 101".to_string(),
                path: "Physics 101/".to_string(),
                videos: vec![Video {
                    name: "intro".to_string(),
                    video_url: "https://signed.example/intro.mp4".to_string(),
                    vtt_urls: BTreeMap::from([(
                        "en".to_string(),
                        "https://host/api/vtt/Physics 101/intro.en.vtt".to_string(),
                    )]),
                    srt_urls: BTreeMap::new(),
                    txt_urls: BTreeMap::new(),
                    transcript: String::new(),
                    available_languages: vec!["en".to_string()],
                }],
            }],
        )
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pre-generated-urls.json");

        let snapshot = sample();
        snapshot.write(&path).await.unwrap();

        let loaded = CatalogSnapshot::load(&path).await.unwrap();
        assert_eq!(loaded.bucket_name, "course-media");
        assert_eq!(loaded.courses.len(), 1);
        assert_eq!(loaded.video_count(), 1);
        assert_eq!(loaded.courses[0].videos[0].name, "intro");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        assert!(CatalogSnapshot::load("does-not-exist.json").await.is_err());
    }

    #[test]
    fn serializes_in_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("generatedAt").is_some());
        assert!(json.get("bucketName").is_some());
        let video = &json["courses"][0]["videos"][0];
        assert!(video.get("videoUrl").is_some());
        assert!(video.get("vttUrls").is_some());
        assert!(video.get("availableLanguages").is_some());
    }
}
