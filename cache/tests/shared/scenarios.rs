use std::{cell::Cell, collections::BTreeMap};

use cache::{Store, TagId, TagRef, TaggedCache};
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use super::{Fixture, assert_blank, assert_read};

#[derive(Serialize, Clone)]
struct Owner {
    kind: &'static str,
    id: u64,
}

pub fn reads_and_writes_a_key_with_tags<S: Store, V: Fixture>(cache: &TaggedCache<S>) {
    cache.write("foo", &V::sample(), "baz", None).unwrap();

    assert_read(cache, "foo", &V::sample());
}

pub fn deletes_a_key_if_tag_is_deleted<S: Store, V: Fixture>(cache: &TaggedCache<S>) {
    cache.write("foo", &V::sample(), "baz", None).unwrap();
    cache.delete_tag("baz").unwrap();

    assert_blank::<S, V>(cache, "foo");
}

pub fn reads_a_key_if_another_tag_was_deleted<S: Store, V: Fixture>(cache: &TaggedCache<S>) {
    cache.write("foo", &V::sample(), "baz", None).unwrap();
    cache.delete_tag("fu").unwrap();

    assert_read(cache, "foo", &V::sample());
}

pub fn reads_and_writes_if_multiple_tags_given<S: Store, V: Fixture>(cache: &TaggedCache<S>) {
    cache
        .write("foo", &V::sample(), ["baz", "kung"], None)
        .unwrap();

    assert_read(cache, "foo", &V::sample());
}

pub fn deletes_a_key_if_one_of_tags_is_deleted<S: Store, V: Fixture>(cache: &TaggedCache<S>) {
    cache
        .write("foo", &V::sample(), ["baz", "kung"], None)
        .unwrap();
    cache.delete_tag("kung").unwrap();

    assert_blank::<S, V>(cache, "foo");
}

pub fn reads_and_writes_a_key_if_versioned_tag_given<S: Store, V: Fixture>(
    cache: &TaggedCache<S>,
) {
    let version = |v: i32| TagRef::try_from(BTreeMap::from([("baz", v)])).unwrap();

    cache.write("foo", &V::sample(), version(1), None).unwrap();
    assert_read(cache, "foo", &V::sample());

    cache.delete_tag(version(2)).unwrap();
    assert_read(cache, "foo", &V::sample());

    cache.delete_tag(version(1)).unwrap();
    assert_blank::<S, V>(cache, "foo");
}

pub fn reads_and_writes_a_key_if_timestamps_given_as_tags<S: Store, V: Fixture>(
    cache: &TaggedCache<S>,
) {
    let now = OffsetDateTime::now_utc();
    let tag1 = now - Duration::days(1);
    let tag2 = now - Duration::days(2);

    cache.write("foo", &V::sample(), [tag1, tag2], None).unwrap();
    assert_read(cache, "foo", &V::sample());

    cache.delete_tag(tag1).unwrap();
    assert_blank::<S, V>(cache, "foo");
}

pub fn reads_and_writes_a_key_if_objects_given_as_tags<S: Store, V: Fixture>(
    cache: &TaggedCache<S>,
) {
    let user = Owner { kind: "user", id: 1 };
    let team = Owner { kind: "team", id: 1 };

    let tags = TagRef::objects(&[user, team]).unwrap();
    cache.write("foo", &V::sample(), tags, None).unwrap();
    assert_read(cache, "foo", &V::sample());

    // a fresh value with the same content names the same tag
    let same_team = TagId::of(&Owner { kind: "team", id: 1 }).unwrap();
    cache.delete_tag(same_team).unwrap();
    assert_blank::<S, V>(cache, "foo");
}

pub fn reads_multiple_keys_with_tags_check<S: Store, V: Fixture>(cache: &TaggedCache<S>) {
    cache.write("foo", &V::sample(), "bar", None).unwrap();
    cache.write("bar", &V::sample(), "baz", None).unwrap();

    assert_read(cache, "foo", &V::sample());
    assert_read(cache, "bar", &V::sample());

    cache.delete_tag("bar").unwrap();

    assert_blank::<S, V>(cache, "foo");
    assert_read(cache, "bar", &V::sample());

    let values = cache.read_multi::<V>(&["foo", "bar", "missing"]).unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values["foo"], None);
    assert_eq!(values["bar"], Some(V::sample()));
    assert_eq!(values["missing"], None);
}

pub fn fetches_key_with_tag_check<S: Store, V: Fixture>(cache: &TaggedCache<S>) {
    cache.write("foo", &V::sample(), "bar", None).unwrap();

    let produced = Cell::new(false);
    let fetched = cache
        .fetch("foo", None, None, || {
            produced.set(true);
            V::other()
        })
        .unwrap();
    assert_eq!(fetched, V::sample());
    assert!(!produced.get());
    assert_eq!(cache.read::<V>("foo").unwrap(), Some(V::sample()));

    cache.delete_tag("bar").unwrap();
    assert_eq!(cache.read::<V>("foo").unwrap(), None);

    let fetched = cache
        .fetch("foo", Some("bar".into()), None, V::sample)
        .unwrap();
    assert_eq!(fetched, V::sample());
    assert_read(cache, "foo", &V::sample());

    cache.delete_tag("bar").unwrap();
    assert_blank::<S, V>(cache, "foo");
}

pub fn fetches_untagged_key_immune_to_tag_deletion<S: Store, V: Fixture>(
    cache: &TaggedCache<S>,
) {
    let fetched = cache.fetch("foo", None, None, V::other).unwrap();
    assert_eq!(fetched, V::other());

    cache.delete_tag("bar").unwrap();

    assert_read(cache, "foo", &V::other());
}

pub fn repeated_reads_agree<S: Store, V: Fixture>(cache: &TaggedCache<S>) {
    cache.write("foo", &V::sample(), "baz", None).unwrap();
    for _ in 0..3 {
        assert_read(cache, "foo", &V::sample());
    }

    cache.delete_tag("baz").unwrap();
    for _ in 0..3 {
        assert_blank::<S, V>(cache, "foo");
    }
}

pub fn overwrites_replace_tags<S: Store, V: Fixture>(cache: &TaggedCache<S>) {
    cache.write("foo", &V::sample(), "baz", None).unwrap();
    cache.write("foo", &V::other(), "kung", None).unwrap();

    cache.delete_tag("baz").unwrap();
    assert_read(cache, "foo", &V::other());

    cache.delete_tag("kung").unwrap();
    assert_blank::<S, V>(cache, "foo");
}
