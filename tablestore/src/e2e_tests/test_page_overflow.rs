//! Inserts spill onto a new page once the last page is full.

use crate::storage::{HEADER_SIZE, PAGE_SIZE, PageLookup};
use crate::testing::{TestStore, user};

#[test]
fn test_overflow_allocates_next_page() {
    let store = TestStore::new();
    let users = store.users();
    let name = "n".repeat(1000);

    let mut page_count = users.stats().expect("stats").page_count;
    let mut overflowed_at = None;
    for id in 1..=10 {
        users.insert(&user(id, &name, 1)).expect("insert");
        let after = users.stats().expect("stats").page_count;
        if after != page_count {
            assert_eq!(after, page_count + 1);
            let metadata = users.metadata().expect("metadata");
            assert_eq!(metadata.page_for(id), PageLookup::Page(after));
            overflowed_at = Some(id);
            break;
        }
        page_count = after;
    }

    // Roughly 1 KiB records: four do not fit in one 4 KiB page.
    assert_eq!(overflowed_at, Some(4));
    for id in 1..=3 {
        assert_eq!(
            users.metadata().expect("metadata").page_for(id),
            PageLookup::Page(0)
        );
    }

    let len = std::fs::metadata(users.path()).expect("stat").len();
    assert_eq!(len, (HEADER_SIZE + 2 * PAGE_SIZE) as u64);
}

#[test]
fn test_many_pages_stay_readable() {
    let store = TestStore::new();
    let users = store.users();
    let name = "m".repeat(500);

    for id in 0..40 {
        users.insert(&user(id, &name, id)).expect("insert");
    }

    let stats = users.stats().expect("stats");
    assert!(stats.page_count >= 4);
    for id in 0..40 {
        assert_eq!(users.get(id).expect("get")["age"], id.to_string());
    }
    let ids: Vec<_> = users
        .scan()
        .expect("scan")
        .iter()
        .filter_map(crate::record::Record::id)
        .collect();
    assert_eq!(ids, (0..40).collect::<Vec<_>>());
}
