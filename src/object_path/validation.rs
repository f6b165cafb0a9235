/// Test if `path` is a valid object path.
///
/// The root `/` is valid on its own. Any other path is a sequence of
/// `/`-prefixed elements, each non-empty and made up of `[A-Za-z0-9_]`, with
/// no trailing `/`.
pub(super) fn validate(path: &str) -> bool {
    if path == "/" {
        return true;
    }

    let Some(elements) = path.strip_prefix('/') else {
        return false;
    };

    elements.split('/').all(|element| {
        !element.is_empty()
            && element
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    })
}
