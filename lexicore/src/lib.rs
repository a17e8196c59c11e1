//! # lexicore
//!
//! lexicoreは、トークナイザーの下で動作する辞書層と文字正規化層の実装です。
//!
//! ## 概要
//!
//! このライブラリは、2つの独立したコンポーネントを提供します。
//!
//! - **辞書ストア**: 型付きプロパティを持つ見出し語をダブル配列トライで索引付けし、
//!   rkyv形式のファイルとして保存・再読み込みします。
//! - **文字マッパー**: 基本多言語面の各コードポイントについて変換先と分類タグを保持し、
//!   定数時間で正規化を行います。
//!
//! トークナイザーは入力の各文字を[`CharMapper::transform`]で正規化してから、
//! [`DictionaryStore::common_prefix_search`]で辞書を引きます。
//!
//! ## 主な機能
//!
//! - **型付きプロパティ**: `STRING`/`SHORT`/`INT`/`LONG`型のプロパティスキーマ
//! - **決定的なコンパイル**: 同じ内容からは挿入順に関係なく同じバイト列の索引を生成
//! - **安全な保存**: SHA-256付きのヘッダと一時ファイル経由の置き換え
//! - **マッピング規則**: `A..Z->a..z`や`A..Z/2`といった記述言語による表の構築
//!
//! ## 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use lexicore::{CharMapper, DictionaryStore, PropType, PropertyDef};
//!
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("d.dict");
//!
//! let mut store = DictionaryStore::open(&path, 'n')?;
//! store.init([PropertyDef::new("pos", PropType::Short)])?;
//! store.insert("apple", 100, &[1])?;
//! store.set_prop("apple", "pos", &5i16.to_le_bytes())?;
//! store.build()?;
//! store.save(&path)?;
//!
//! let store = DictionaryStore::open(&path, 'r')?;
//! assert_eq!(store.get_prop("apple", "pos")?, &5i16.to_le_bytes());
//!
//! let mut mapper = CharMapper::new(false);
//! mapper.apply_rules("A..Z->a..z, a..z", 0)?;
//! let normalized: String = "APPLE"
//!     .chars()
//!     .filter_map(|c| mapper.transform_char(c)?.to_char())
//!     .collect();
//! assert_eq!(normalized, "apple");
//! assert!(store.contains(&normalized));
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("`target_pointer_width` must be 32 or 64");

/// 見出し語辞書
pub mod dictionary;

/// エラー型の定義
pub mod errors;

/// 保存ファイルのコンテナ形式
mod format;

/// 文字のマッピング表
pub mod mapper;

/// 内部ユーティリティ関数
pub mod utils;


// Re-exports
pub use dictionary::{
    DictionaryStore, LemmaId, LemmaRef, OpenMode, PropType, PropertyDef, PropertyRef,
    PropertySchema, PropertyValue, StoreConfig,
};
pub use errors::{LexiconError, Result};
pub use mapper::{CharMapper, MappingRule, Mapped};

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
