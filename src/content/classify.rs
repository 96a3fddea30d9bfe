//! Content-type classification.

/// Coarse category of a MIME part, decided by its primary type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    Text,
    Multipart,
    Image,
    Audio,
    Video,
    Application,
    Unknown,
}

impl ContentClass {
    /// Parts of this class are persisted by the attachment sink.
    pub fn is_attachment(self) -> bool {
        matches!(
            self,
            Self::Image | Self::Audio | Self::Video | Self::Application
        )
    }
}

/// Classify a content-type string such as `"image/png; name=a.png"`.
///
/// Only the primary token before the first `/` is considered, compared
/// case-insensitively.
pub fn classify(content_type: &str) -> ContentClass {
    let primary = content_type
        .split(['/', ';'])
        .next()
        .unwrap_or("")
        .trim();

    match primary.to_ascii_lowercase().as_str() {
        "text" => ContentClass::Text,
        "multipart" => ContentClass::Multipart,
        "image" => ContentClass::Image,
        "audio" => ContentClass::Audio,
        "video" => ContentClass::Video,
        "application" => ContentClass::Application,
        _ => ContentClass::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_primary_types() {
        assert_eq!(classify("text/plain"), ContentClass::Text);
        assert_eq!(classify("multipart/alternative"), ContentClass::Multipart);
        assert_eq!(classify("image/jpeg"), ContentClass::Image);
        assert_eq!(classify("audio/ogg"), ContentClass::Audio);
        assert_eq!(classify("video/mp4"), ContentClass::Video);
        assert_eq!(classify("application/pdf"), ContentClass::Application);
    }

    #[test]
    fn test_case_insensitive_with_parameters() {
        assert_eq!(classify("IMAGE/PNG; name=\"a.png\""), ContentClass::Image);
        assert_eq!(classify(" Text/HTML"), ContentClass::Text);
    }

    #[test]
    fn test_unknown_types() {
        assert_eq!(classify("message/rfc822"), ContentClass::Unknown);
        assert_eq!(classify(""), ContentClass::Unknown);
        assert_eq!(classify("garbage"), ContentClass::Unknown);
    }

    #[test]
    fn test_is_attachment() {
        assert!(ContentClass::Image.is_attachment());
        assert!(ContentClass::Application.is_attachment());
        assert!(!ContentClass::Text.is_attachment());
        assert!(!ContentClass::Unknown.is_attachment());
    }
}
