use std::sync::Arc;

use record_relations::{
    AssociationOptions, AssociationsExt, InMemoryRecordStore, RecordError, RecordType,
    RecordsExt, SequenceProvider,
};
use serde_json::json;

use crate::support::{
    album_cover, albums_and_photos, albums_and_photos_with_uuids, photo_album, ALBUM_UUID,
    PHOTO_UUID,
};

#[test]
fn parent_and_singleton_at_once_with_uuids() {
    let store = albums_and_photos_with_uuids();
    album_cover(&store);

    let albums = store.records("Album");
    let mut album = albums.new_record().unwrap();
    albums
        .load(
            &mut album,
            json!({"name": "Beautiful album", "photo": {"name": "Beautiful photo"}}),
        )
        .unwrap();

    assert_eq!(album.id(), Some(ALBUM_UUID));
    let photo = store.one(&album, "photo").unwrap().get().unwrap().unwrap();
    assert_eq!(photo.id(), Some(PHOTO_UUID));
    assert_eq!(photo.get_str("name"), Some("Beautiful photo"));
    assert_eq!(photo.get_str("album_id"), Some(ALBUM_UUID));
}

#[test]
fn parent_and_collection_at_once_with_uuids() {
    let store = albums_and_photos_with_uuids();
    photo_album(&store);

    let albums = store.records("Album");
    let mut album = albums.new_record().unwrap();
    albums
        .load(
            &mut album,
            json!({
                "name": "Beautiful album",
                "photos": [
                    {"name": "Beautiful photo 1"},
                    {"id": "2", "name": "Beautiful photo 2"}
                ]
            }),
        )
        .unwrap();

    assert_eq!(album.id(), Some(ALBUM_UUID));
    let photos = store.many(&album, "photos").unwrap();
    let first = photos.first().unwrap().unwrap();
    assert_eq!(first.id(), Some(PHOTO_UUID));
    assert_eq!(first.get_str("name"), Some("Beautiful photo 1"));
    assert_eq!(photos.last().unwrap().unwrap().id(), Some("2"));
    assert_eq!(photos.count().unwrap(), 2);
}

#[test]
fn every_nested_child_gets_its_own_id() {
    let store = InMemoryRecordStore::new();
    store
        .define(
            RecordType::new("Album", ["name"]).with_identifiers(SequenceProvider::new("album-")),
        )
        .unwrap();
    store
        .define(
            RecordType::new("Photo", ["name"])
                .with_identifiers(SequenceProvider::with_ids("photo-", ["first"])),
        )
        .unwrap();
    photo_album(&store);

    let album = store
        .records("Album")
        .create(json!({"photos": [{"name": "a"}, {"name": "b"}, {"name": "c"}]}))
        .unwrap();

    let ids: Vec<String> = store
        .many(&album, "photos")
        .unwrap()
        .all()
        .unwrap()
        .iter()
        .filter_map(|photo| photo.id().map(str::to_string))
        .collect();
    assert_eq!(album.id(), Some("album-1"));
    assert_eq!(ids, ["first", "photo-1", "photo-2"]);
}

#[test]
fn shared_provider_serves_several_types() {
    let provider = Arc::new(SequenceProvider::new("id-"));
    let store = InMemoryRecordStore::new();
    store
        .define(RecordType::new("Album", ["name"]).with_shared_identifiers(provider.clone()))
        .unwrap();
    store
        .define(RecordType::new("Photo", ["name"]).with_shared_identifiers(provider))
        .unwrap();
    photo_album(&store);

    let album = store
        .records("Album")
        .create(json!({"photos": [{"name": "a"}]}))
        .unwrap();
    let photo = store.many(&album, "photos").unwrap().first().unwrap().unwrap();

    assert_eq!(album.id(), Some("id-1"));
    assert_eq!(photo.id(), Some("id-2"));
}

#[test]
fn nested_data_waits_for_the_first_save() {
    let store = albums_and_photos();
    album_cover(&store);
    store
        .has_many("Album", "photos", "Photo", AssociationOptions::foreign_key("gallery_id"))
        .unwrap();

    let albums = store.records("Album");
    let mut album = albums.new_record().unwrap();
    albums
        .load(
            &mut album,
            json!({
                "name": "Draft",
                "photo": {"name": "Cover"},
                "photos": [{"name": "Inside"}]
            }),
        )
        .unwrap();

    assert!(album.id().is_none());
    assert_eq!(store.records("Photo").count().unwrap(), 0);
    assert_eq!(store.many(&album, "photos").unwrap().count().unwrap(), 0);

    albums.save(&mut album).unwrap();

    let cover = store.one(&album, "photo").unwrap().get().unwrap().unwrap();
    assert_eq!(cover.get_str("name"), Some("Cover"));
    let inside = store.many(&album, "photos").unwrap().first().unwrap().unwrap();
    assert_eq!(inside.get_str("name"), Some("Inside"));
    assert_eq!(inside.get_str("gallery_id"), album.id());
}

#[test]
fn belongs_to_resolves_before_the_owner_has_an_id() {
    let store = albums_and_photos();
    photo_album(&store);

    let photos = store.records("Photo");
    let photo = photos
        .build(json!({"name": "Loose", "album": {"name": "Made on the way"}}))
        .unwrap();

    assert!(photo.id().is_none());
    assert!(!photo.has_staged());
    let album = store.records("Album").first().unwrap().unwrap();
    assert_eq!(photo.get_str("album_id"), album.id());
}

#[test]
fn numeric_ids_are_read_as_strings() {
    let store = albums_and_photos();
    photo_album(&store);

    store.records("Album").create(json!({"id": 5})).unwrap();
    let photo = store.records("Photo").create(json!({"album": 5})).unwrap();

    let album = store.one(&photo, "album").unwrap().get().unwrap().unwrap();
    assert_eq!(album.id(), Some("5"));
}

#[test]
fn invalid_payloads_are_rejected() {
    let store = albums_and_photos();
    photo_album(&store);
    store
        .has_one("Album", "photo", "Photo", AssociationOptions::default())
        .unwrap();

    let albums = store.records("Album");
    for data in [
        json!({"photos": {"name": "not a list"}}),
        json!({"photos": [1, 2]}),
        json!({"photo": "p"}),
        json!("not an object"),
    ] {
        assert!(matches!(
            albums.create(data),
            Err(RecordError::InvalidPayload { .. })
        ));
    }
    assert!(matches!(
        store.records("Photo").create(json!({"album": true})),
        Err(RecordError::InvalidPayload { .. })
    ));
    assert_eq!(albums.count().unwrap(), 0);
}

#[test]
fn invalid_grandchild_leaves_nothing_behind() {
    let store = albums_and_photos();
    photo_album(&store);

    let err = store
        .records("Album")
        .create(json!({
            "id": "1",
            "photos": [{"id": "a", "name": "ok"}, {"id": "b", "album": true}]
        }))
        .unwrap_err();

    assert!(matches!(err, RecordError::InvalidPayload { .. }));
    assert_eq!(store.records("Album").count().unwrap(), 0);
    assert_eq!(store.records("Photo").count().unwrap(), 0);
}
