// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use friends_map_core::preferences::{
    read_value, reset_all, write_value, PreferenceUpdate, Preferences, Settings,
};
use friends_map_core::storage::{FileStorage, KeyValueStorage, STORAGE_FILE_NAME};
use friends_map_core::{MapKind, Theme};
use std::sync::Arc;

#[test]
fn test_round_trip_through_fresh_store() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join(STORAGE_FILE_NAME);

    {
        let storage = FileStorage::open(&path);
        write_value(&storage, "lastSearch", &"beijing".to_string())?;
        let mut settings = Settings::open(Arc::new(storage));
        settings.set_theme(Theme::Dark);
        settings.update_preference(PreferenceUpdate::MapType(MapKind::China));
        settings.update_preference(PreferenceUpdate::Language("en-US".to_string()));
    }

    // A new handle reads only what reached the file.
    let storage = FileStorage::open(&path);
    assert_eq!(
        read_value(&storage, "lastSearch", String::new()),
        "beijing"
    );
    let settings = Settings::open(Arc::new(storage));
    assert_eq!(settings.theme(), Theme::Dark);
    assert_eq!(settings.preferences().map_type, MapKind::China);
    assert_eq!(settings.preferences().language, "en-US");
    assert!(settings.preferences().auto_save);

    Ok(())
}

#[test]
fn test_unset_key_returns_default() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let storage = FileStorage::open(temp_dir.path().join(STORAGE_FILE_NAME));

    assert_eq!(read_value(&storage, "missing", 42u64), 42);
    let settings = Settings::open(Arc::new(storage));
    assert_eq!(settings.preferences(), &Preferences::default());
    assert_eq!(settings.theme(), Theme::Light);
    Ok(())
}

#[test]
fn test_reset_clears_every_key() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join(STORAGE_FILE_NAME);

    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::open(&path));
    let mut settings = Settings::open(Arc::clone(&storage));
    settings.set_theme(Theme::Dark);
    settings.update_preference(PreferenceUpdate::AutoSave(false));
    storage.set_item("someOtherApp", "\"kept?\"")?;

    assert!(reset_all(storage.as_ref(), true)?);
    drop(settings);

    let reopened = FileStorage::open(&path);
    assert!(reopened.keys()?.is_empty());
    assert_eq!(read_value(&reopened, "someOtherApp", String::from("gone")), "gone");

    let fresh = Settings::open(Arc::new(reopened));
    assert_eq!(fresh.theme(), Theme::Light);
    assert!(fresh.preferences().auto_save);
    Ok(())
}

#[test]
fn test_second_process_change_is_synced() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join(STORAGE_FILE_NAME);

    let mut watcher = Settings::open(Arc::new(FileStorage::open(&path)));
    let mut writer = Settings::open(Arc::new(FileStorage::open(&path)));

    writer.set_theme(Theme::Dark);
    assert_eq!(watcher.theme(), Theme::Light);
    assert!(watcher.sync());
    assert_eq!(watcher.theme(), Theme::Dark);
    Ok(())
}

#[test]
fn test_interleaved_processes_keep_each_others_keys() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join(STORAGE_FILE_NAME);

    let mut cli = Settings::open(Arc::new(FileStorage::open(&path)));
    let mut gui = Settings::open(Arc::new(FileStorage::open(&path)));

    // No poll between the two writes.
    cli.set_theme(Theme::Dark);
    gui.remember_map(MapKind::China);

    let fresh = Settings::open(Arc::new(FileStorage::open(&path)));
    assert_eq!(fresh.theme(), Theme::Dark);
    assert_eq!(fresh.preferences().map_type, MapKind::China);

    assert!(gui.sync());
    assert_eq!(gui.theme(), Theme::Dark);
    assert_eq!(gui.preferences().theme, Theme::Dark);
    assert_eq!(gui.preferences().map_type, MapKind::China);
    Ok(())
}
