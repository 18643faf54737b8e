//! Path sanitization
//!
//! Every path arriving over the wire goes through [`sanitize`] before any
//! lookup: whitespace is trimmed and the path is lexically cleaned
//! (repeated separators collapsed, `.` and `..` resolved, trailing
//! separator stripped), with a degenerate result mapping to `/`.
//!
//! Callers check for the empty string *before* sanitizing: an empty path is
//! an illegal argument, while junk like `"////"` sanitizes to the root.

/// Clean a wire path for lookup.
pub fn sanitize(raw: &str) -> String {
    let cleaned = clean(raw.trim());
    if cleaned == "." { "/".to_string() } else { cleaned }
}

/// Lexically shortest equivalent of `path`; `"."` when nothing remains.
fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let rooted = path.starts_with('/');

    let mut kept: Vec<&str> = Vec::new();
    // ".." segments that escape a relative path survive at the front.
    let mut updots = 0usize;
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if !kept.is_empty() {
                    kept.pop();
                } else if !rooted {
                    updots += 1;
                }
            }
            other => kept.push(other),
        }
    }

    let mut parts: Vec<&str> = Vec::with_capacity(updots + kept.len());
    parts.extend(std::iter::repeat_n("..", updots));
    parts.extend(kept);
    let body = parts.join("/");

    if rooted {
        if body.is_empty() {
            "/".to_string()
        } else {
            format!("/{body}")
        }
    } else if body.is_empty() {
        ".".to_string()
    } else {
        body
    }
}

/// Parent of a cleaned path: `/a/b` → `/a`, `/a` → `/`, a bare segment → `.`.
pub fn parent(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// Non-empty segments of a cleaned path, root first.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_collapses_and_trims() {
        assert_eq!(sanitize("////"), "/");
        assert_eq!(sanitize("/a//b/"), "/a/b");
        assert_eq!(sanitize(" /x.txt "), "/x.txt");
        assert_eq!(sanitize("/a/./b"), "/a/b");
        assert_eq!(sanitize("/a/../b"), "/b");
        assert_eq!(sanitize("."), "/");
        assert_eq!(sanitize("/.."), "/");
        assert_eq!(sanitize(""), "/");
    }

    #[test]
    fn test_sanitize_keeps_relative_escapes() {
        assert_eq!(sanitize("a/b"), "a/b");
        assert_eq!(sanitize("a/.."), "/");
        assert_eq!(sanitize("a/../../b"), "../b");
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("/a/b"), "/a");
        assert_eq!(parent("/a"), "/");
        assert_eq!(parent("/"), "/");
        assert_eq!(parent("a"), ".");
    }

    #[test]
    fn test_segments() {
        let parts: Vec<&str> = segments("/a/b/c").collect();
        assert_eq!(parts, vec!["a", "b", "c"]);
        assert_eq!(segments("/").count(), 0);
    }
}
