use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Characters accepted as the "special character" of a password.
pub const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// validate_username
///
/// 3 to 32 characters, starting with a letter, made of ASCII letters, digits and underscores.
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.is_empty() {
        return Err("Username is required");
    }
    let len = username.chars().count();
    if len < 3 {
        return Err("Username must be at least 3 characters long");
    }
    if len > 32 {
        return Err("Username must be at most 32 characters long");
    }
    if !username.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err("Username must start with a letter");
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("Username can only contain letters, numbers, and underscores");
    }
    Ok(())
}

/// validate_password
///
/// Enforces the password policy used by registration, user creation and password changes.
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.is_empty() {
        return Err("Password is required");
    }
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number");
    }
    if !password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)) {
        return Err("Password must contain at least one special character");
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("Email is required");
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err("Invalid email format");
    }
    Ok(())
}

/// sanitize_input
///
/// Parses `text` as an HTML fragment and keeps only its text: every tag is removed,
/// `<script>`/`<style>` together with their contents, and `&`, `<`, `>` are escaped.
/// A `<` that does not open a tag is kept as `&lt;`.
pub fn sanitize_input(text: &str) -> String {
    ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(text)
        .to_string()
}

static SLUG_DROPPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid slug regex"));
static SLUG_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s-]+").expect("valid slug regex"));

/// slugify
///
/// Subject ids are derived from the subject name and used as a path segment, so only
/// word characters survive; runs of spaces and dashes collapse into one `-`.
/// Returns an empty string when nothing is left.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let kept = SLUG_DROPPED.replace_all(&lowered, "");
    SLUG_SEPARATOR
        .replace_all(kept.trim(), "-")
        .trim_matches('-')
        .to_string()
}

