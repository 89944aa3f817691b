use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use url::Url;

/// Used when a URL carries no usable extension.
pub const DEFAULT_EXTENSION: &str = ".wav";

/// Sanitize a title into a path segment valid on every supported OS.
/// Falls back to `fallback` when nothing usable remains.
pub fn sanitize_filename(title: &str, fallback: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect();

    let trimmed = replaced.trim_end_matches([' ', '.', '_']);

    if trimmed.chars().all(|c| c.is_whitespace() || c == '.') {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Claim the first free `base + ext`, `base (1) + ext`, `base (2) + ext`, ...
/// in `dir` by creating it empty. The placeholder holds the name until the
/// real content replaces it, so consecutive calls never return the same path.
pub fn uniquify(dir: &Path, base: &str, ext: &str) -> io::Result<PathBuf> {
    let mut candidate = dir.join(format!("{}{}", base, ext));
    let mut counter = 1u32;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                candidate = dir.join(format!("{} ({}){}", base, counter, ext));
                counter += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// True when `path` is absent or still the empty placeholder left by [`uniquify`].
pub fn is_placeholder(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.len() == 0,
        Err(e) => e.kind() == io::ErrorKind::NotFound,
    }
}

/// Remove a placeholder that never received content. Files with content are left alone.
pub fn release_placeholder(path: &Path) {
    if path.is_file() && is_placeholder(path) {
        let _ = std::fs::remove_file(path);
    }
}

/// Extension (dot included) of the last path segment of `url`.
pub fn extension_from_url(url: &str) -> String {
    let file_name = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .unwrap_or_default(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .unwrap_or_default()
            .to_string(),
    };

    match file_name.rfind('.') {
        Some(idx) => {
            let ext = &file_name[idx..];
            if ext.len() > 1 && ext.len() <= 6 {
                ext.to_string()
            } else {
                DEFAULT_EXTENSION.to_string()
            }
        }
        None => DEFAULT_EXTENSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "444radio-generation";

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test/file", FALLBACK), "test_file");
        assert_eq!(sanitize_filename("My Beat", FALLBACK), "My Beat");
        assert_eq!(sanitize_filename("a\\b:c*d?e\"f<g>h|i", FALLBACK), "a_b_c_d_e_f_g_h_i");
    }

    #[test]
    fn test_sanitize_never_leaves_reserved_chars() {
        let titles = ["<<>>", "x:/y", "what?*", "\"quoted\" | piped", "dir\\name\\"];
        for title in titles {
            let out = sanitize_filename(title, FALLBACK);
            assert!(
                !out.contains(['\\', '/', ':', '*', '?', '"', '<', '>', '|']),
                "{:?} -> {:?}",
                title,
                out
            );
        }
    }

    #[test]
    fn test_sanitize_trims_trailing_junk() {
        assert_eq!(sanitize_filename("song. . _", FALLBACK), "song");
        assert_eq!(sanitize_filename("what?", FALLBACK), "what");
        assert_eq!(sanitize_filename("  lead", FALLBACK), "  lead");
    }

    #[test]
    fn test_sanitize_fallback() {
        for title in ["", "   ", "...", " . . ", "???", "\t"] {
            assert_eq!(sanitize_filename(title, FALLBACK), FALLBACK, "{:?}", title);
        }
    }

    #[test]
    fn test_uniquify_counts_collisions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("My Beat.wav"), b"x").unwrap();
        std::fs::write(dir.path().join("My Beat (1).wav"), b"x").unwrap();
        std::fs::write(dir.path().join("My Beat (2).wav"), b"x").unwrap();

        assert_eq!(
            uniquify(dir.path(), "My Beat", ".wav").unwrap(),
            dir.path().join("My Beat (3).wav")
        );
        // Existing files are never touched.
        assert_eq!(std::fs::read(dir.path().join("My Beat.wav")).unwrap(), b"x");
    }

    #[test]
    fn test_uniquify_twice_yields_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let first = uniquify(dir.path(), "My Beat", ".wav").unwrap();
        let second = uniquify(dir.path(), "My Beat", ".wav").unwrap();

        assert_eq!(first, dir.path().join("My Beat.wav"));
        assert_eq!(second, dir.path().join("My Beat (1).wav"));
        assert!(is_placeholder(&first));
        assert!(is_placeholder(&second));
    }

    #[test]
    fn test_release_placeholder_keeps_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let reserved = uniquify(dir.path(), "take", ".mp3").unwrap();
        let real = dir.path().join("real.mp3");
        std::fs::write(&real, b"data").unwrap();

        release_placeholder(&reserved);
        release_placeholder(&real);

        assert!(!reserved.exists());
        assert!(real.exists());
        assert!(!is_placeholder(&real));
        assert!(is_placeholder(&reserved));
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(extension_from_url("https://x/y.mp3"), ".mp3");
        assert_eq!(extension_from_url("https://x/cover.png?sig=abc.def"), ".png");
        assert_eq!(extension_from_url("https://x/stream"), ".wav");
        assert_eq!(extension_from_url("https://x/file.toolongext"), ".wav");
        assert_eq!(extension_from_url("https://x/file."), ".wav");
        assert_eq!(extension_from_url("not a url/clip.flac"), ".flac");
    }
}
