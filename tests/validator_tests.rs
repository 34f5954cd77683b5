use learning_platform::validators::{
    sanitize_input, slugify, validate_email, validate_password, validate_username,
};

#[test]
fn test_username_rules() {
    assert!(validate_username("alice_01").is_ok());
    assert!(validate_username("abc").is_ok());
    assert!(validate_username(&format!("a{}", "b".repeat(31))).is_ok());

    assert_eq!(validate_username(""), Err("Username is required"));
    assert_eq!(
        validate_username("ab"),
        Err("Username must be at least 3 characters long")
    );
    assert_eq!(
        validate_username(&"a".repeat(33)),
        Err("Username must be at most 32 characters long")
    );
    assert_eq!(
        validate_username("1alice"),
        Err("Username must start with a letter")
    );
    assert_eq!(
        validate_username("alice-b"),
        Err("Username can only contain letters, numbers, and underscores")
    );
}

#[test]
fn test_password_policy() {
    assert!(validate_password("Str0ng!pass").is_ok());

    assert_eq!(validate_password(""), Err("Password is required"));
    assert_eq!(
        validate_password("Sh0rt!"),
        Err("Password must be at least 8 characters long")
    );
    assert_eq!(
        validate_password("lowercase1!"),
        Err("Password must contain at least one uppercase letter")
    );
    assert_eq!(
        validate_password("UPPERCASE1!"),
        Err("Password must contain at least one lowercase letter")
    );
    assert_eq!(
        validate_password("NoDigits!!"),
        Err("Password must contain at least one number")
    );
    assert_eq!(
        validate_password("NoSpecial12"),
        Err("Password must contain at least one special character")
    );
}

#[test]
fn test_email_format() {
    assert!(validate_email("learner@example.org").is_ok());
    assert!(validate_email("first.last+tag@sub.example.co").is_ok());

    assert_eq!(validate_email(""), Err("Email is required"));
    assert_eq!(validate_email("no-at-sign"), Err("Invalid email format"));
    assert_eq!(validate_email("a@b.c"), Err("Invalid email format"));
}

#[test]
fn test_sanitize_strips_tags_then_escapes() {
    assert_eq!(sanitize_input("<script>alert(1)</script>Intro"), "Intro");
    assert_eq!(
        sanitize_input("<b>Tom & \"Jerry\"</b>"),
        "Tom &amp; \"Jerry\""
    );
    assert_eq!(sanitize_input("it's 3 > 2"), "it's 3 &gt; 2");
    assert_eq!(
        sanitize_input("<a href=\"javascript:x()\">Algebra</a> <img src=x onerror=y>"),
        "Algebra "
    );
}

#[test]
fn test_sanitize_keeps_comparisons_in_prose() {
    assert_eq!(sanitize_input("1 < 2 and 3 > 0"), "1 &lt; 2 and 3 &gt; 0");
    assert_eq!(sanitize_input("x <= y"), "x &lt;= y");
}

#[test]
fn test_slugify() {
    assert_eq!(slugify("Intro To Rust"), "intro-to-rust");
    assert_eq!(slugify("  Algebra "), "algebra");
    assert_eq!(slugify("Data  Structures - Part_2"), "data-structures-part_2");
}

#[test]
fn test_slugify_drops_url_delimiters() {
    assert_eq!(slugify("C++ / C#"), "c-c");
    assert_eq!(slugify("What is Rust?"), "what-is-rust");
    assert_eq!(slugify("50% off & more"), "50-off-more");
    assert_eq!(slugify("#?/"), "");
}
