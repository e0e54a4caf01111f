use crate::subtitle::SubtitleFormat;

// ---------------------------------------------------------------------------
// Key parser
// ---------------------------------------------------------------------------
//
// Pure functions over object keys. The bucket layout convention is
// `{course}/{folder}/{filename}[.{lang}].{ext}`, with the folder name
// (case-insensitive) determining the asset role. None of these functions
// can fail; unrecognized input falls through to a default.

/// What a folder name says about the objects inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderRole {
    Video,
    Subtitle(SubtitleHint),
    Transcript,
    Unknown,
}

/// Subtitle format as hinted by the folder name. Generic folders
/// (`subtitles`, `subs`) defer to the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleHint {
    Vtt,
    Srt,
    FromExtension,
}

/// Classify a folder name against the fixed vocabulary, case-insensitively.
/// Callers must skip `Unknown` entries without error.
pub fn classify_folder(folder: &str) -> FolderRole {
    match folder.to_ascii_lowercase().as_str() {
        "video" => FolderRole::Video,
        "vtt" => FolderRole::Subtitle(SubtitleHint::Vtt),
        "srt" => FolderRole::Subtitle(SubtitleHint::Srt),
        "subtitles" | "subs" => FolderRole::Subtitle(SubtitleHint::FromExtension),
        "txt" => FolderRole::Transcript,
        _ => FolderRole::Unknown,
    }
}

/// Extract the language code from a filename: the segment between the last
/// two dots when it is 2–3 characters long (`lesson1.es.vtt` → `es`),
/// defaulting to `en` otherwise.
pub fn extract_language_code(file_name: &str) -> &str {
    let parts: Vec<&str> = file_name.split('.').collect();
    if parts.len() >= 2 {
        let candidate = parts[parts.len() - 2];
        if is_language_tag(candidate) {
            return candidate;
        }
    }
    "en"
}

/// Strip the final extension, then a trailing 2–3 character dot-suffix
/// (treated as a language tag rather than part of the title).
///
/// A title that legitimately ends in a short dotted token is mis-parsed
/// ("Intro to C.ab.mp4" loses the "ab"). Known limitation of the filename
/// convention, kept as-is.
pub fn base_name(file_name: &str) -> &str {
    let stem = match file_name.rfind('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    };

    if let Some(idx) = stem.rfind('.') {
        if is_language_tag(&stem[idx + 1..]) {
            return &stem[..idx];
        }
    }
    stem
}

/// Resolve the subtitle format for a file given its folder hint, sniffing
/// the extension for generic subtitle folders. `None` means the file is not
/// a recognized subtitle and should be skipped.
pub fn subtitle_format(hint: SubtitleHint, file_name: &str) -> Option<SubtitleFormat> {
    match hint {
        SubtitleHint::Vtt => Some(SubtitleFormat::Vtt),
        SubtitleHint::Srt => Some(SubtitleFormat::Srt),
        SubtitleHint::FromExtension => {
            let extension = file_name.rsplit('.').next()?.to_ascii_lowercase();
            match extension.as_str() {
                "vtt" => Some(SubtitleFormat::Vtt),
                "srt" => Some(SubtitleFormat::Srt),
                _ => None,
            }
        }
    }
}

fn is_language_tag(segment: &str) -> bool {
    (2..=3).contains(&segment.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_code_from_suffixed_filename() {
        assert_eq!(extract_language_code("lesson1.es.vtt"), "es");
        assert_eq!(extract_language_code("COMM 200 1.fra.srt"), "fra");
    }

    #[test]
    fn language_code_defaults_to_english() {
        assert_eq!(extract_language_code("lesson1.vtt"), "en");
        assert_eq!(extract_language_code("lesson1"), "en");
        assert_eq!(extract_language_code("My Lecture.part1.mp4"), "en");
    }

    #[test]
    fn base_name_strips_extension_and_language_suffix() {
        assert_eq!(base_name("COMM 200 1.es.vtt"), "COMM 200 1");
        assert_eq!(base_name("intro.mp4"), "intro");
        assert_eq!(base_name("lecture"), "lecture");
    }

    #[test]
    fn base_name_keeps_long_dotted_segments() {
        // "part1" is 5 chars, not a language tag.
        assert_eq!(base_name("My Lecture.part1.mp4"), "My Lecture.part1");
    }

    #[test]
    fn classify_folder_is_case_insensitive() {
        assert_eq!(classify_folder("Video"), FolderRole::Video);
        assert_eq!(
            classify_folder("VTT"),
            FolderRole::Subtitle(SubtitleHint::Vtt)
        );
        assert_eq!(
            classify_folder("Srt"),
            FolderRole::Subtitle(SubtitleHint::Srt)
        );
        assert_eq!(
            classify_folder("Subtitles"),
            FolderRole::Subtitle(SubtitleHint::FromExtension)
        );
        assert_eq!(
            classify_folder("subs"),
            FolderRole::Subtitle(SubtitleHint::FromExtension)
        );
        assert_eq!(classify_folder("TXT"), FolderRole::Transcript);
    }

    #[test]
    fn unrecognized_folders_are_unknown() {
        assert_eq!(classify_folder("thumbnails"), FolderRole::Unknown);
        assert_eq!(classify_folder(""), FolderRole::Unknown);
    }

    #[test]
    fn subtitle_format_sniffs_extension_for_generic_folders() {
        assert_eq!(
            subtitle_format(SubtitleHint::FromExtension, "intro.en.VTT"),
            Some(SubtitleFormat::Vtt)
        );
        assert_eq!(
            subtitle_format(SubtitleHint::FromExtension, "intro.en.srt"),
            Some(SubtitleFormat::Srt)
        );
        assert_eq!(subtitle_format(SubtitleHint::FromExtension, "intro.ass"), None);
    }

    #[test]
    fn subtitle_format_trusts_specific_folders() {
        // A vtt folder wins over the extension; layout convention, not sniffed.
        assert_eq!(
            subtitle_format(SubtitleHint::Vtt, "intro.en.srt"),
            Some(SubtitleFormat::Vtt)
        );
    }
}
