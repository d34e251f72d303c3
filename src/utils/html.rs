use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization: safe tags (<b>, <p>, ...) survive,
/// dangerous tags (<script>, <iframe>) and attributes (onclick) are
/// stripped. Round descriptions and question content are admin-entered
/// rich text rendered in every participant's browser, so they pass
/// through here before being persisted.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
