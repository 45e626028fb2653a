//! Lexical path cleaning.
//!
//! Plan 9 style `Clean`: returns the shortest path lexically equivalent to
//! the input. The filesystem is never consulted, so the result may disagree
//! with what the kernel would resolve when symlinks are involved.

const SEPARATOR: char = '/';

/// Clean `path` lexically.
///
/// Repeatedly, until nothing changes:
///
/// 1. collapse repeated separators,
/// 2. drop `.` elements,
/// 3. drop each inner `..` together with the non-`..` element before it,
/// 4. for rooted paths, drop `..` elements at the start.
///
/// Rootedness is preserved. A path that cancels out entirely becomes `.`
/// (or `/` when rooted).
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with(SEPARATOR);
    let mut current = path.to_string();

    loop {
        let mut parts: Vec<&str> = Vec::new();
        for part in current
            .split(SEPARATOR)
            .filter(|p| !p.is_empty() && *p != ".")
        {
            if part == ".." && !parts.is_empty() && parts.last() != Some(&"..") {
                parts.pop();
            } else {
                parts.push(part);
            }
        }

        if rooted {
            let leading = parts.iter().take_while(|p| **p == "..").count();
            parts.drain(..leading);
        }

        let next = if parts.is_empty() {
            ".".to_string()
        } else {
            parts.join("/")
        };

        if next == current {
            break;
        }
        current = next;
    }

    if rooted {
        if current == "." {
            return "/".to_string();
        }
        return format!("/{}", current);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    const VECTORS: &[(&str, &str)] = &[
        ("abc", "abc"),
        ("abc/def", "abc/def"),
        ("a/b/c", "a/b/c"),
        (".", "."),
        ("..", ".."),
        ("../..", "../.."),
        ("../../abc", "../../abc"),
        ("/abc", "/abc"),
        ("/", "/"),
        ("", "."),
        ("abc/", "abc"),
        ("abc/def/", "abc/def"),
        ("a/b/c/", "a/b/c"),
        ("./", "."),
        ("../", ".."),
        ("../../", "../.."),
        ("/abc/", "/abc"),
        ("abc//def//ghi", "abc/def/ghi"),
        ("//abc", "/abc"),
        ("///abc", "/abc"),
        ("//abc//", "/abc"),
        ("abc//", "abc"),
        ("abc/./def", "abc/def"),
        ("/./abc/def", "/abc/def"),
        ("abc/.", "abc"),
        ("abc/def/ghi/../jkl", "abc/def/jkl"),
        ("abc/def/../ghi/../jkl", "abc/jkl"),
        ("abc/def/..", "abc"),
        ("abc/def/../..", "."),
        ("/abc/def/../..", "/"),
        ("abc/def/../../..", ".."),
        ("/abc/def/../../..", "/"),
        ("abc/def/../../../ghi/jkl/../../../mno", "../../mno"),
        ("/../abc", "/abc"),
        ("abc/./../def", "def"),
        ("abc//./../def", "def"),
        ("abc/../../././../def", "../../def"),
        ("abc/.//def/", "abc/def"),
        ("/./../abc/def", "/abc/def"),
        ("a/../../b", "../b"),
    ];

    #[test]
    fn test_clean_reference_vectors() {
        for (input, expected) in VECTORS {
            assert_eq!(clean(input), *expected, "clean({:?})", input);
        }
    }

    #[test]
    fn test_clean_is_idempotent() {
        for (input, _) in VECTORS {
            let once = clean(input);
            assert_eq!(clean(&once), once, "clean(clean({:?}))", input);
        }
    }

    #[test]
    fn test_clean_preserves_rootedness() {
        for (input, _) in VECTORS {
            assert_eq!(
                clean(input).starts_with('/'),
                input.starts_with('/'),
                "rootedness of {:?}",
                input
            );
        }
    }

    #[test]
    fn test_clean_root_cannot_escape() {
        assert_eq!(clean("/../../../etc/passwd"), "/etc/passwd");
        assert_eq!(clean("/a/../../b/../../c"), "/c");
    }
}
