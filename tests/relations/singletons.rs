use record_relations::{AssociationsExt, RecordError, RecordStore, RecordsExt};
use serde_json::json;

use crate::support::{album_cover, albums_and_photos, photo_album};

#[test]
fn belongs_to_follows_the_key() {
    let store = albums_and_photos();
    photo_album(&store);

    assert_eq!(store.schema("Photo").unwrap().attributes(), ["name", "album_id"]);

    let album = store
        .records("Album")
        .create(json!({"name": "First Album"}))
        .unwrap();
    let photo = store.records("Photo").create(json!({"album": album})).unwrap();
    let photo2 = store.records("Photo").create(json!({})).unwrap();

    let related = store.one(&photo, "album").unwrap().get().unwrap().unwrap();
    assert_eq!(related.id(), album.id());
    assert_eq!(related.get_str("name"), Some("First Album"));
    assert!(store.one(&photo2, "album").unwrap().get().unwrap().is_none());
    assert_eq!(store.records("Album").count().unwrap(), 1);
}

#[test]
fn associates_an_existing_singleton() {
    let store = albums_and_photos();
    album_cover(&store);

    let album = store
        .records("Album")
        .create(json!({"id": "1", "name": "Beautiful album"}))
        .unwrap();
    let photo = store
        .records("Photo")
        .create(json!({"id": "2", "name": "Beautiful photo"}))
        .unwrap();

    let cover = store.one(&album, "photo").unwrap();
    cover.set(&photo).unwrap();

    let current = cover.get().unwrap().unwrap();
    assert_eq!(current.id(), Some("2"));
    assert_eq!(current.get_str("album_id"), Some("1"));
    assert_eq!(current.get_str("name"), Some("Beautiful photo"));
}

#[test]
fn creates_a_nested_singleton() {
    let store = albums_and_photos();
    album_cover(&store);

    let album = store
        .records("Album")
        .create(json!({
            "name": "Beautiful album",
            "photo": {"name": "Beautiful photo"},
            "id": "1"
        }))
        .unwrap();

    let current = store.one(&album, "photo").unwrap().get().unwrap().unwrap();
    assert_eq!(current.get_str("album_id"), Some("1"));
    assert_eq!(current.get_str("name"), Some("Beautiful photo"));

    let owner = store.one(&current, "album").unwrap().get().unwrap().unwrap();
    assert_eq!(owner, album);
}

#[test]
fn nested_null_clears_the_singleton() {
    let store = albums_and_photos();
    album_cover(&store);

    let albums = store.records("Album");
    let mut album = albums
        .create(json!({"id": "1", "photo": {"id": "p", "name": "Cover"}}))
        .unwrap();
    assert!(store.one(&album, "photo").unwrap().get().unwrap().is_some());

    albums.load(&mut album, json!({"photo": null})).unwrap();

    assert!(store.one(&album, "photo").unwrap().get().unwrap().is_none());
    assert!(store.records("Photo").exists("p").unwrap());
}

#[test]
fn reassigning_keeps_the_previous_holder_key() {
    let store = albums_and_photos();
    album_cover(&store);

    let album = store.records("Album").create(json!({"id": "1"})).unwrap();
    let cover = store.one(&album, "photo").unwrap();
    let old = cover.create(json!({"id": "old", "name": "Old"})).unwrap();
    let new = store
        .records("Photo")
        .create(json!({"id": "new", "name": "New"}))
        .unwrap();

    cover.set(&new).unwrap();

    assert_eq!(cover.get().unwrap().unwrap().id(), Some("new"));
    let old = store.records("Photo").find(old.id().unwrap()).unwrap().unwrap();
    assert_eq!(old.get_str("album_id"), Some("1"));
}

#[test]
fn belongs_to_set_and_clear() {
    let store = albums_and_photos();
    photo_album(&store);

    let album = store.records("Album").create(json!({"id": "1"})).unwrap();
    let photo = store.records("Photo").create(json!({"id": "p"})).unwrap();
    let relation = store.one(&photo, "album").unwrap();

    let owner = relation.set(&album).unwrap();
    assert_eq!(owner.get_str("album_id"), Some("1"));
    assert_eq!(relation.get().unwrap(), Some(album.clone()));
    assert_eq!(store.many(&album, "photos").unwrap().count().unwrap(), 1);

    relation.clear().unwrap();
    assert!(relation.get().unwrap().is_none());
    assert_eq!(store.many(&album, "photos").unwrap().count().unwrap(), 0);
}

#[test]
fn accessor_must_match_association_shape() {
    let store = albums_and_photos();
    photo_album(&store);

    let album = store.records("Album").create(json!({})).unwrap();
    assert!(matches!(
        store.one(&album, "photos"),
        Err(RecordError::AccessorMismatch { .. })
    ));
    assert!(matches!(
        store.one(&album, "cover"),
        Err(RecordError::UnknownAssociation { .. })
    ));
}

#[test]
fn unsaved_photo_is_assigned_after_its_first_save() {
    let store = albums_and_photos();
    photo_album(&store);

    let album = store.records("Album").create(json!({"id": "1"})).unwrap();
    let photos = store.records("Photo");
    let mut draft = photos.new_record().unwrap();

    let err = store.one(&draft, "album").unwrap().set(&album).unwrap_err();
    assert_eq!(err, RecordError::UnassignedId("Photo".into()));
    assert_eq!(photos.count().unwrap(), 0);

    photos.save(&mut draft).unwrap();
    store.one(&draft, "album").unwrap().set(&album).unwrap();

    assert_eq!(photos.count().unwrap(), 1);
    let stored = photos.find(draft.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.get_str("album_id"), Some("1"));
    assert_eq!(store.one(&draft, "album").unwrap().get().unwrap(), Some(album));
}

#[test]
fn has_one_on_stale_copy_keeps_saved_attributes() {
    let store = albums_and_photos();
    album_cover(&store);

    let album = store.records("Album").create(json!({"id": "1"})).unwrap();
    let stale = store
        .records("Photo")
        .create(json!({"id": "2", "name": "Before"}))
        .unwrap();
    let mut renamed = stale.clone();
    renamed.set("name", "After");
    store.records("Photo").update(&renamed).unwrap();

    store.one(&album, "photo").unwrap().set(&stale).unwrap();

    let current = store.one(&album, "photo").unwrap().get().unwrap().unwrap();
    assert_eq!(current.get_str("name"), Some("After"));
    assert_eq!(current.get_str("album_id"), Some("1"));
}
