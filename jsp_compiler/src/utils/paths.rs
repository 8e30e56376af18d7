//! Context-relative path handling

/// Classification of a tag library URI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriType {
    /// `scheme:...`
    Absolute,
    /// `/...`
    RootRelative,
    /// anything else, resolved against the referring page
    Relative,
}

pub fn uri_type(uri: &str) -> UriType {
    if uri.starts_with('/') {
        return UriType::RootRelative;
    }
    match uri.find(':') {
        Some(colon) if colon > 0 && !uri[..colon].contains('/') => {
            let scheme = &uri[..colon];
            let valid = scheme
                .chars()
                .enumerate()
                .all(|(i, c)| c.is_ascii_alphabetic() || (i > 0 && (c.is_ascii_digit() || "+-.".contains(c))));
            if valid {
                UriType::Absolute
            } else {
                UriType::Relative
            }
        }
        _ => UriType::Relative,
    }
}

/// Collapse `.` and `..` segments and duplicate separators.
///
/// Returns `None` when the path climbs above the context root.
pub fn normalize(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    let mut result = String::with_capacity(path.len() + 1);
    for segment in &segments {
        result.push('/');
        result.push_str(segment);
    }
    if result.is_empty() {
        result.push('/');
    } else if path.ends_with('/') {
        result.push('/');
    }
    Some(result)
}

/// Directory part of a context-relative file path, including the trailing `/`
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "/",
    }
}

/// Resolve a reference made from `base_file` to a normalized context path
pub fn resolve(base_file: &str, reference: &str) -> Option<String> {
    if reference.starts_with('/') {
        normalize(reference)
    } else {
        normalize(&format!("{}{}", parent_dir(base_file), reference))
    }
}

/// File name without directory or extension
pub fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

pub fn has_suffix(path: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| path.ends_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_classification() {
        assert_eq!(uri_type("http://example.com/tags"), UriType::Absolute);
        assert_eq!(uri_type("urn:jsptagdir:/WEB-INF/tags"), UriType::Absolute);
        assert_eq!(uri_type("/WEB-INF/my.tld"), UriType::RootRelative);
        assert_eq!(uri_type("my.tld"), UriType::Relative);
        assert_eq!(uri_type("dir/x:y.tld"), UriType::Relative);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a/./b/../c").as_deref(), Some("/a/c"));
        assert_eq!(normalize("//a//b/").as_deref(), Some("/a/b/"));
        assert_eq!(normalize("/").as_deref(), Some("/"));
        assert_eq!(normalize("/a/../../b"), None);
    }

    #[test]
    fn test_resolve_relative_reference() {
        assert_eq!(
            resolve("/shop/cart/view.jsp", "../header.jspf").as_deref(),
            Some("/shop/header.jspf")
        );
        assert_eq!(
            resolve("/shop/view.jsp", "/WEB-INF/footer.jspf").as_deref(),
            Some("/WEB-INF/footer.jspf")
        );
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("/WEB-INF/tags/util/price.tag"), "price");
        assert_eq!(file_stem("noext"), "noext");
    }
}
