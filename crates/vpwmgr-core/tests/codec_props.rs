use proptest::prelude::*;
use vpwmgr_core::path::{decode, encode, CollectionId, EntryPath};
use vpwmgr_core::validate::{valid_group_name, valid_title};

proptest! {
    #[test]
    fn prop_decode_inverts_encode(segment in "\\PC*") {
        prop_assert_eq!(decode(&encode(&segment)), segment);
    }

    #[test]
    fn prop_encoded_segments_have_no_separator(segment in "\\PC*") {
        prop_assert!(!encode(&segment).contains('/'));
    }

    #[test]
    fn prop_valid_titles_stay_in_one_key_segment(
        title in "[0-9A-Za-z$_.+!*'(),;/?:@=&-]{1,24}",
    ) {
        prop_assert!(valid_title(&title));
        let path = EntryPath::new(CollectionId::Personal("alice".into()), "web", title.as_str());
        let key = path.key();
        let last = key.rsplit('/').next().unwrap();
        prop_assert_eq!(decode(last), title);
    }

    #[test]
    fn prop_group_names_reject_slashes(left in "[a-z]{1,8}", right in "[a-z]{1,8}") {
        let name = format!("{left}/{right}");
        prop_assert!(!valid_group_name(&name));
    }
}
