/// Lowercases and trims a question so that trivially different spellings share a cache key.
pub fn normalize_question(question: &str) -> String {
    question.to_lowercase().trim().to_string()
}

/// Cache key for a question: hex MD5 of its normalized form.
///
/// MD5 is used as a fast general-purpose digest here, not for any security property.
pub fn question_fingerprint(question: &str) -> String {
    format!("{:x}", md5::compute(normalize_question(question).as_bytes()))
}
