//! Browse-graphic file name matching

use std::path::Path;

/// Extensions accepted for a browse graphic, in preference order
pub const BROWSE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

const BROWSE_TERM: &str = "browse";

fn extension(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|e| e.to_str())
}

/// Whether a file name looks like a browse graphic (`*browse*.png` etc.)
pub fn is_browse_graphic(name: &str) -> bool {
    let Some(ext) = extension(name) else {
        return false;
    };
    let stem_len = name.len() - ext.len() - 1;
    name[..stem_len].contains(BROWSE_TERM) && BROWSE_EXTENSIONS.contains(&ext)
}

/// Pick the browse graphic among the names of one directory.
///
/// Extensions are tried in [`BROWSE_EXTENSIONS`] order; within one extension
/// the lexically first name wins.
pub fn find_browse_file<S: AsRef<str>>(names: &[S]) -> Option<String> {
    BROWSE_EXTENSIONS.iter().find_map(|wanted| {
        names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| is_browse_graphic(name) && extension(name) == Some(*wanted))
            .min()
            .map(str::to_string)
    })
}

/// Browse type written to the record: the upper-cased extension
pub fn browse_type(name: &str) -> Option<String> {
    extension(name).map(str::to_uppercase)
}

/// Shorten a caption to at most `max` characters, marking the cut with `...`
pub fn truncate_caption(caption: &str, max: usize) -> String {
    if caption.chars().count() <= max {
        return caption.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = caption.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_browse_graphic() {
        assert!(is_browse_graphic("FireIsland_browse.png"));
        assert!(is_browse_graphic("browse.jpeg"));
        assert!(!is_browse_graphic("FireIsland_browse.tif"));
        assert!(!is_browse_graphic("FireIsland.png"));
        assert!(!is_browse_graphic("image.png.browse"));
        assert!(!is_browse_graphic("browse"));
    }

    #[test]
    fn test_find_browse_file_prefers_extension_order() {
        let names = ["z_browse.gif", "b_browse.jpg", "a_browse.jpg", "data.xml"];
        assert_eq!(find_browse_file(&names).as_deref(), Some("a_browse.jpg"));

        let names = ["z_browse.gif", "y_browse.png"];
        assert_eq!(find_browse_file(&names).as_deref(), Some("y_browse.png"));

        let names: [&str; 0] = [];
        assert_eq!(find_browse_file(&names), None);
    }

    #[test]
    fn test_browse_type() {
        assert_eq!(browse_type("a_browse.jpeg").as_deref(), Some("JPEG"));
    }

    #[test]
    fn test_truncate_caption() {
        assert_eq!(truncate_caption("short", 80), "short");
        assert_eq!(truncate_caption("abcdefghij", 8), "abcde...");
    }
}
