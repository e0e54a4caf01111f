use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::core::error::CatalogError;
use crate::storage::signer::UrlSigner;
use crate::storage::ObjectStore;

use super::keys::{self, FolderRole};
use super::model::{Course, Video};

// ---------------------------------------------------------------------------
// Catalog builder
// ---------------------------------------------------------------------------

/// Assembles `Course` records from a flat object listing.
///
/// Video and transcript assets get signed storage URLs; subtitle assets get
/// references to the subtitle-proxy endpoints so format conversion can be
/// applied at serve time.
pub struct CatalogBuilder<S> {
    store: Arc<S>,
    signer: Arc<UrlSigner<S>>,
    /// Base URL prefixed onto subtitle-proxy references.
    base_url: String,
    sign_expiry_secs: u64,
}

/// Per-base-name accumulator filled during the single listing pass.
#[derive(Debug, Default)]
struct AssetGroup {
    video: Option<String>,
    vtt: BTreeMap<String, String>,
    srt: BTreeMap<String, String>,
    txt: BTreeMap<String, String>,
}

impl<S: ObjectStore> CatalogBuilder<S> {
    pub fn new(
        store: Arc<S>,
        signer: Arc<UrlSigner<S>>,
        base_url: impl Into<String>,
        sign_expiry_secs: u64,
    ) -> Self {
        Self {
            store,
            signer,
            base_url: base_url.into(),
            sign_expiry_secs,
        }
    }

    /// Build every course in the bucket. A failed course is logged and
    /// excluded; only a failed top-level listing aborts the whole build.
    pub async fn build_all(&self) -> Result<Vec<Course>, CatalogError> {
        let prefixes = self
            .store
            .list_course_prefixes()
            .await
            .map_err(CatalogError::Listing)?;

        info!(course_count = prefixes.len(), "building course catalog");

        let courses = join_all(prefixes.iter().map(|name| self.build_course(name))).await;

        let mut built = Vec::with_capacity(courses.len());
        for (name, result) in prefixes.iter().zip(courses) {
            match result {
                Ok(course) => built.push(course),
                Err(e) => {
                    error!(course = %name, error = %e, "course build failed, excluding from catalog");
                }
            }
        }

        Ok(built)
    }

    /// Build a single course from the listing under its prefix.
    pub async fn build_course(&self, course_name: &str) -> Result<Course, CatalogError> {
        let prefix = format!("{}/", course_name);
        let listing = self
            .store
            .list_objects(&prefix)
            .await
            .map_err(CatalogError::Listing)?;

        let groups = group_assets(course_name, listing.iter().map(|o| o.key.as_str()));

        // Resolve every video record concurrently; URL signing and the
        // transcript fetch for one record also run concurrently.
        let videos = join_all(
            groups
                .into_iter()
                .map(|(base_name, group)| self.resolve_video(course_name, base_name, group)),
        )
        .await;

        Ok(Course {
            name: course_name.to_string(),
            path: prefix,
            videos: videos.into_iter().flatten().collect(),
        })
    }

    /// Turn one asset group into a `Video` record. Returns `None` when the
    /// record is unusable: no video object, or its URL cannot be signed.
    async fn resolve_video(
        &self,
        course_name: &str,
        base_name: String,
        group: AssetGroup,
    ) -> Option<Video> {
        let video_key = group.video?;

        let (video_url, txt_urls, transcript) = futures::join!(
            self.signer.sign(&video_key, self.sign_expiry_secs),
            self.sign_transcript_urls(&group.txt),
            self.fetch_transcript(group.txt.get("en"))
        );

        let video_url = match video_url {
            Ok(url) => url,
            Err(e) => {
                warn!(key = %video_key, error = %e, "failed to sign video URL, dropping record");
                return None;
            }
        };

        let mut available_languages = Vec::new();
        let vtt_urls = self.proxy_urls("vtt", course_name, &group.vtt, &mut available_languages);
        let srt_urls = self.proxy_urls("srt", course_name, &group.srt, &mut available_languages);

        Some(Video {
            name: base_name,
            video_url,
            vtt_urls,
            srt_urls,
            txt_urls,
            transcript,
            available_languages,
        })
    }

    /// Subtitle assets are served through the proxy endpoints rather than by
    /// signed storage URL, so conversion can happen at serve time.
    fn proxy_urls(
        &self,
        endpoint: &str,
        course_name: &str,
        keys: &BTreeMap<String, String>,
        available_languages: &mut Vec<String>,
    ) -> BTreeMap<String, String> {
        keys.iter()
            .map(|(lang, key)| {
                let file_name = key.rsplit('/').next().unwrap_or(key);
                available_languages.push(lang.clone());
                (
                    lang.clone(),
                    format!(
                        "{}/api/{}/{}/{}",
                        self.base_url, endpoint, course_name, file_name
                    ),
                )
            })
            .collect()
    }

    async fn sign_transcript_urls(
        &self,
        txt: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let signed = join_all(txt.iter().map(|(lang, key)| async move {
            match self.signer.sign(key, self.sign_expiry_secs).await {
                Ok(url) => Some((lang.clone(), url)),
                Err(e) => {
                    warn!(key = %key, error = %e, "failed to sign transcript URL, skipping");
                    None
                }
            }
        }))
        .await;

        signed.into_iter().flatten().collect()
    }

    /// Fetch the English transcript body for inline embedding. Failure never
    /// fails the course build; the record just carries an empty transcript.
    async fn fetch_transcript(&self, key: Option<&String>) -> String {
        let Some(key) = key else {
            return String::new();
        };
        match self.store.get_object(key).await {
            Ok(output) => String::from_utf8_lossy(&output.body).into_owned(),
            Err(e) => {
                warn!(key = %key, error = %e, "failed to load transcript");
                String::new()
            }
        }
    }
}

/// One pass over the listing: split each key into `{folder}/{filename}`,
/// role-dispatch it into the accumulator for its base name.
fn group_assets<'a>(
    course_name: &str,
    keys: impl Iterator<Item = &'a str>,
) -> BTreeMap<String, AssetGroup> {
    let mut groups: BTreeMap<String, AssetGroup> = BTreeMap::new();

    for key in keys {
        let mut parts = key.splitn(3, '/');
        let (Some(_course), Some(folder), Some(file_name)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        // Folder-marker keys end in '/' and have no filename.
        if file_name.is_empty() || file_name.contains('/') {
            continue;
        }

        let base = keys::base_name(file_name).to_string();
        let group = groups.entry(base).or_default();

        match keys::classify_folder(folder) {
            FolderRole::Video => {
                group.video = Some(key.to_string());
            }
            FolderRole::Subtitle(hint) => {
                let Some(format) = keys::subtitle_format(hint, file_name) else {
                    warn!(course = %course_name, key, "unknown subtitle format, skipping");
                    continue;
                };
                let lang = keys::extract_language_code(file_name).to_string();
                match format {
                    crate::subtitle::SubtitleFormat::Vtt => {
                        group.vtt.insert(lang, key.to_string());
                    }
                    crate::subtitle::SubtitleFormat::Srt => {
                        group.srt.insert(lang, key.to_string());
                    }
                }
            }
            FolderRole::Transcript => {
                let lang = keys::extract_language_code(file_name).to_string();
                group.txt.insert(lang, key.to_string());
            }
            FolderRole::Unknown => {
                debug!(course = %course_name, key, folder, "unrecognized folder, skipping");
            }
        }
    }

    groups
}
