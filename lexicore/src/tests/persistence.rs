use std::fs;
use std::path::Path;

use tempfile::tempdir;

use crate::dictionary::lexicon::trie::Trie;
use crate::dictionary::*;
use crate::errors::LexiconError;
use crate::format::{Container, HEADER_LEN};

fn saved_store(path: &Path) -> DictionaryStore {
    let mut store = DictionaryStore::new(StoreConfig::default());
    store
        .init([
            PropertyDef::new("pos", PropType::Short),
            PropertyDef::new("gloss", PropType::String),
        ])
        .unwrap();
    store.insert("apple", 100, &[1]).unwrap();
    store.insert("banana", 20, &[1, 2]).unwrap();
    store.set_prop("apple", "pos", &5i16.to_le_bytes()).unwrap();
    store.set_prop("banana", "gloss", b"a long yellow fruit").unwrap();
    store.build().unwrap();
    store.save(path).unwrap();
    store
}

fn assert_invalid_format(path: &Path) {
    match DictionaryStore::open(path, 'r') {
        Err(LexiconError::InvalidFormat(_)) => (),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("a broken file was accepted"),
    }
}

#[test]
fn test_corrupted_payload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("d.dict");
    saved_store(&path);

    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x5A;
    bytes[HEADER_LEN + 3] ^= 0x01;
    fs::write(&path, &bytes).unwrap();
    assert_invalid_format(&path);
}

#[test]
fn test_truncated_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("d.dict");
    saved_store(&path);

    let bytes = fs::read(&path).unwrap();
    for len in [0, 7, HEADER_LEN - 1, HEADER_LEN, bytes.len() - 1] {
        fs::write(&path, &bytes[..len]).unwrap();
        assert_invalid_format(&path);
    }
}

#[test]
fn test_version_bumped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("d.dict");
    saved_store(&path);

    let mut bytes = fs::read(&path).unwrap();
    bytes[8..12].copy_from_slice(&(DICTIONARY_FORMAT_VERSION + 1).to_le_bytes());
    fs::write(&path, &bytes).unwrap();
    assert_invalid_format(&path);
}

#[test]
fn test_wrong_magic() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("d.dict");
    let mut mapper = crate::CharMapper::new(false);
    mapper.apply_rules("a..z", 0).unwrap();
    mapper.save(&path).unwrap();
    assert_invalid_format(&path);
}

/// ヘッダは正しいがペイロードがrkyvとして不正なファイル
#[test]
fn test_garbage_payload_with_valid_digest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("d.dict");
    let container = Container {
        magic: DICTIONARY_MAGIC,
        version: DICTIONARY_FORMAT_VERSION,
        name: "dictionary",
    };
    let mut bytes = vec![];
    container.write(&mut bytes, &[0xFF; 64]).unwrap();
    fs::write(&path, &bytes).unwrap();
    assert_invalid_format(&path);
}

/// ダイジェストは正しいがトライが壊れているファイル
#[test]
fn test_broken_trie_with_valid_digest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("d.dict");
    saved_store(&path);
    let container = Container {
        magic: DICTIONARY_MAGIC,
        version: DICTIONARY_FORMAT_VERSION,
        name: "dictionary",
    };
    let payload = container.read_bytes(&fs::read(&path).unwrap()).unwrap().to_vec();

    // Terms are stored in sorted order, so the same records give the same trie bytes.
    let trie = Trie::from_records(&[("apple", 0), ("banana", 1)]).unwrap().to_bytes();
    let trie_at = payload
        .windows(trie.len())
        .position(|w| w == trie.as_slice())
        .unwrap();
    let table_len = u32::from_le_bytes(payload[trie_at..trie_at + 4].try_into().unwrap());
    let count_at = trie_at + 4 + 4 * usize::try_from(table_len).unwrap() + 4;

    let edits: [(usize, u32); 3] = [
        // A code table longer than the blob.
        (trie_at, u32::MAX / 4),
        // A node array longer than the blob.
        (count_at, u32::MAX),
        // The root points beyond the node array.
        (count_at + 4, 0x7fff_0000),
    ];
    for (offset, value) in edits {
        let mut broken = payload.clone();
        broken[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        let mut bytes = vec![];
        container.write(&mut bytes, &broken).unwrap();
        assert!(
            matches!(
                DictionaryStore::read(bytes.as_slice()),
                Err(LexiconError::InvalidFormat(_))
            ),
            "{offset}"
        );
    }
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        DictionaryStore::open(dir.path().join("missing.dict"), 'r'),
        Err(LexiconError::IoError(_))
    ));
}

/// 保存に失敗しても既存のファイルが変更されないことを確認
#[test]
fn test_failed_save_keeps_previous_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("d.dict");
    let mut store = saved_store(&path);
    let before = fs::read(&path).unwrap();

    // Staged edits since the last build.
    store.insert("cherry", 1, &[]).unwrap();
    assert!(matches!(
        store.save(&path),
        Err(LexiconError::InvalidState(_))
    ));
    assert_eq!(fs::read(&path).unwrap(), before);

    // The destination directory does not exist.
    store.build().unwrap();
    assert!(store.save(dir.path().join("missing").join("d.dict")).is_err());
    assert!(matches!(
        store.save(dir.path()),
        Err(LexiconError::PathIsDirectory(_))
    ));
    assert_eq!(fs::read(&path).unwrap(), before);

    // No temporary files are left behind.
    let names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("d.dict")]);

    store.save(&path).unwrap();
    let loaded = DictionaryStore::open(&path, 'r').unwrap();
    assert!(loaded.contains("cherry"));
}

/// 読み取り専用ストアを別のパスへ保存できることを確認
#[test]
fn test_save_read_only_copy() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("d.dict");
    let copy = dir.path().join("copy.dict");
    saved_store(&path);

    let loaded = DictionaryStore::open(&path, 'r').unwrap();
    loaded.save(&copy).unwrap();
    assert_eq!(fs::read(&copy).unwrap(), fs::read(&path).unwrap());
}
