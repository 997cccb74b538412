//! Syntax rules for group names and entry titles.

use crate::archive::ARCHIVE_GROUP;
use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

static GROUP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?-u:\w)+( (?-u:\w)+)*$").expect("group name pattern"));

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Za-z$\-_.+!*'(),;/?:@=&]+$").expect("title pattern")
});

/// Word characters separated by single spaces, and not the archive group.
pub fn valid_group_name(name: &str) -> bool {
    name != ARCHIVE_GROUP && GROUP_NAME.is_match(name)
}

pub fn valid_title(name: &str) -> bool {
    TITLE.is_match(name)
}

/// Check a submitted identifier, reporting the first problem found.
pub fn validate_identifier(group: &str, title: &str) -> Result<(), ValidationError> {
    if group == ARCHIVE_GROUP {
        return Err(ValidationError::ReservedGroup(group.to_string()));
    }
    if !valid_group_name(group) {
        return Err(ValidationError::InvalidGroup(group.to_string()));
    }
    if !valid_title(title) {
        return Err(ValidationError::InvalidTitle(title.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_names() {
        assert!(valid_group_name("network"));
        assert!(valid_group_name("home network"));
        assert!(valid_group_name("Pauls_Stuff 2"));

        assert!(!valid_group_name(""));
        assert!(!valid_group_name("a/b"));
        assert!(!valid_group_name(" web"));
        assert!(!valid_group_name("web "));
        assert!(!valid_group_name("home  network"));
        assert!(!valid_group_name("café"));
        assert!(!valid_group_name(ARCHIVE_GROUP));
    }

    #[test]
    fn titles() {
        assert!(valid_title("google.com"));
        assert!(valid_title("$+dream"));
        assert!(valid_title("https://example.com/a?b=c&d=e"));

        assert!(!valid_title(""));
        assert!(!valid_title("#"));
        assert!(!valid_title("a b"));
        assert!(!valid_title("tab\there"));
        assert!(!valid_title("bell\u{7}"));
        assert!(!valid_title("web|google.com|20240101000000"));
    }

    #[test]
    fn reserved_group_reported_before_syntax() {
        assert_eq!(
            validate_identifier(ARCHIVE_GROUP, "x"),
            Err(ValidationError::ReservedGroup(ARCHIVE_GROUP.to_string()))
        );
        assert_eq!(
            validate_identifier("web", "#"),
            Err(ValidationError::InvalidTitle("#".to_string()))
        );
        assert_eq!(
            validate_identifier("", "x"),
            Err(ValidationError::InvalidGroup(String::new()))
        );
        assert_eq!(validate_identifier("web", "netflix"), Ok(()));
    }
}
