//! Input acceptability checks for files and meeting links.
//!
//! Pure predicates, no side effects. The link check is a containment
//! heuristic, not a URL parser.

use crate::config::ValidationConfig;

#[derive(Debug, Clone)]
pub struct ValidationRules {
    allowed_extensions: Vec<String>,
    max_file_size_bytes: u64,
    link_domain_marker: String,
    link_join_marker: String,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}

impl ValidationRules {
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            max_file_size_bytes: config.max_file_size_bytes(),
            link_domain_marker: config.link_domain_marker.clone(),
            link_join_marker: config.link_join_marker.clone(),
        }
    }

    /// True iff the extension is allowed and the size is within the configured cap.
    pub fn is_acceptable_file(&self, name: &str, size_bytes: u64) -> bool {
        self.has_allowed_extension(name) && size_bytes <= self.max_file_size_bytes
    }

    /// True iff the trimmed link is non-empty and contains both markers.
    pub fn is_acceptable_meeting_link(&self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }

        url.contains(&self.link_domain_marker) && url.contains(&self.link_join_marker)
    }

    /// Human-readable reason a file was rejected, if it was.
    pub fn file_rejection_reason(&self, name: &str, size_bytes: u64) -> Option<String> {
        if !self.has_allowed_extension(name) {
            return Some(format!(
                "unsupported file type '{}' (allowed: {})",
                name,
                self.allowed_extensions.join(", ")
            ));
        }
        if size_bytes > self.max_file_size_bytes {
            return Some(format!(
                "file '{}' is {} bytes, limit is {} bytes",
                name, size_bytes, self.max_file_size_bytes
            ));
        }
        None
    }

    fn has_allowed_extension(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_lowercase();
                self.allowed_extensions.iter().any(|allowed| *allowed == ext)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_accepts_supported_audio_within_limit() {
        let rules = ValidationRules::default();
        assert!(rules.is_acceptable_file("standup.wav", 5 * MB));
        assert!(rules.is_acceptable_file("Standup.MP3", 1));
        assert!(rules.is_acceptable_file("call.m4a", 100 * MB));
    }

    #[test]
    fn test_rejects_oversized_or_unknown_files() {
        let rules = ValidationRules::default();
        assert!(!rules.is_acceptable_file("call.m4a", 100 * MB + 1));
        assert!(!rules.is_acceptable_file("notes.txt", 10));
        assert!(!rules.is_acceptable_file("wav", 10));
        assert!(rules.file_rejection_reason("notes.txt", 10).is_some());
        assert!(rules.file_rejection_reason("a.wav", 10).is_none());
    }

    #[test]
    fn test_size_limit_is_configuration() {
        let config = ValidationConfig {
            max_file_size_mb: 10,
            ..ValidationConfig::default()
        };
        let rules = ValidationRules::from_config(&config);
        assert!(rules.is_acceptable_file("a.wav", 10 * MB));
        assert!(!rules.is_acceptable_file("a.wav", 10 * MB + 1));
    }

    #[test]
    fn test_meeting_link_heuristic() {
        let rules = ValidationRules::default();
        assert!(rules.is_acceptable_meeting_link("https://us02web.zoom.us/j/123456789"));
        assert!(rules.is_acceptable_meeting_link("  https://zoom.us/j/1?pwd=x  "));
        assert!(!rules.is_acceptable_meeting_link("https://notzoom.com/x"));
        assert!(!rules.is_acceptable_meeting_link("https://zoom.us/meeting/1"));
        assert!(!rules.is_acceptable_meeting_link("   "));
    }
}
