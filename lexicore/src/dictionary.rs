//! 見出し語辞書モジュール。
//!
//! このモジュールは、型付きプロパティを持つ見出し語の辞書を提供します。
//! 主な機能として以下を提供します:
//!
//! - プロパティスキーマの定義と見出し語の追加・上書き
//! - 型付きプロパティ値の設定と取得
//! - ダブル配列トライによる索引のコンパイル
//! - 索引の保存と読み取り専用での再読み込み
//!
//! # ライフサイクル
//!
//! 1. [`DictionaryStore::open`]を`'n'`モードで呼び出して空のストアを作成します。
//! 2. [`DictionaryStore::init`]でスキーマを定義します。
//! 3. [`DictionaryStore::insert`]と[`DictionaryStore::set_prop`]で内容を登録します。
//! 4. [`DictionaryStore::build`]で索引をコンパイルし、[`DictionaryStore::save`]で保存します。
//! 5. 保存したファイルを`'r'`モードで開くと、読み取り専用のストアが得られます。
//!
//! # 例
//!
//! ```
//! use lexicore::dictionary::{DictionaryStore, PropType, PropertyDef};
//!
//! let mut store = DictionaryStore::open("unused.dict", 'n').unwrap();
//! store.init([PropertyDef::new("pos", PropType::Short)]).unwrap();
//! store.insert("apple", 100, &[1]).unwrap();
//! store.set_prop("apple", "pos", &5i16.to_le_bytes()).unwrap();
//! store.build().unwrap();
//!
//! assert_eq!(store.get_short("apple", "pos").unwrap(), 5);
//! ```
pub(crate) mod config;
pub(crate) mod import;
pub(crate) mod lemma;
pub(crate) mod lexicon;
pub(crate) mod property;
pub(crate) mod schema;

use std::io::{Read, Write};
use std::path::Path;

use crate::dictionary::lexicon::CompiledLexicon;
use crate::errors::{LexiconError, Result};
use crate::format::Container;

pub use crate::dictionary::config::{DEFAULT_MAX_POSITIONS, OpenMode, StoreConfig};
pub use crate::dictionary::lemma::LemmaId;
pub use crate::dictionary::property::{PropertyRef, PropertyValue};
pub use crate::dictionary::schema::{MAX_PROPERTY_KEY_LEN, PropType, PropertyDef, PropertySchema};

use crate::dictionary::lemma::LemmaTable;

/// 辞書ファイルを識別するマジックバイト
pub const DICTIONARY_MAGIC: &[u8; 8] = b"LEXCDICT";

/// 辞書ファイルのフォーマットバージョン
///
/// クレートのセマンティックバージョンとは独立しています。
pub const DICTIONARY_FORMAT_VERSION: u32 = 1;

const CONTAINER: Container = Container {
    magic: DICTIONARY_MAGIC,
    version: DICTIONARY_FORMAT_VERSION,
    name: "dictionary",
};

/// 見出し語の読み取りビュー
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LemmaRef<'a> {
    /// 見出し語のID
    pub id: LemmaId,
    /// 見出し語
    pub term: &'a str,
    /// 頻度
    pub frequency: u64,
    /// 位置属性
    pub positions: &'a [u32],
}

/// 見出し語辞書
///
/// 書き込み可能なストアはステージング表を持ち、読み取りはすべてその表に対して
/// 行われます。読み取り専用のストアはコンパイル済み索引だけを持ちます。
///
/// 変更操作は`&mut self`、問い合わせは`&self`を取るため、構築を終えたストアは
/// [`Arc`](std::sync::Arc)で包んで複数のスレッドから参照できます。
pub struct DictionaryStore {
    mode: OpenMode,
    config: StoreConfig,
    schema: Option<PropertySchema>,
    table: LemmaTable,
    compiled: Option<CompiledLexicon>,
    // Whether the table changed since the last build.
    dirty: bool,
}

impl DictionaryStore {
    /// モード文字を指定してストアを開きます。
    ///
    /// # 引数
    ///
    /// * `path` - 辞書ファイルのパス。`'n'`モードでは読み込まれません。
    /// * `mode` - `'n'`(新規作成)または`'r'`(読み取り専用)
    ///
    /// # エラー
    ///
    /// - 未知のモード文字の場合は[`LexiconError::Validation`]
    /// - ファイルを開けない場合は[`LexiconError::IoError`]
    /// - ファイルが壊れている場合は[`LexiconError::InvalidFormat`]
    pub fn open<P>(path: P, mode: char) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        Self::open_with_config(path, OpenMode::from_char(mode)?, StoreConfig::default())
    }

    /// 設定を指定してストアを開きます。
    pub fn open_with_config<P>(path: P, mode: OpenMode, config: StoreConfig) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        match mode {
            OpenMode::New => Ok(Self::new(config)),
            OpenMode::Read => {
                let path = path.as_ref();
                let payload = CONTAINER.read_path(path)?;
                let store = Self::from_compiled(CompiledLexicon::from_payload(&payload)?, config);
                log::debug!(
                    "[lexicore] opened {} read-only ({} lemmas)",
                    path.display(),
                    store.len(),
                );
                Ok(store)
            }
        }
    }

    /// 空の書き込み可能なストアを作成します。
    pub fn new(config: StoreConfig) -> Self {
        Self {
            mode: OpenMode::New,
            config,
            schema: None,
            table: LemmaTable::new(),
            compiled: None,
            dirty: false,
        }
    }

    /// リーダーから保存済みの辞書を読み込み、読み取り専用のストアを作成します。
    pub fn read<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut bytes = vec![];
        rdr.read_to_end(&mut bytes)?;
        let payload = CONTAINER.read_bytes(&bytes)?;
        Ok(Self::from_compiled(
            CompiledLexicon::from_payload(&payload)?,
            StoreConfig::default(),
        ))
    }

    fn from_compiled(compiled: CompiledLexicon, config: StoreConfig) -> Self {
        Self {
            mode: OpenMode::Read,
            config,
            schema: Some(compiled.schema().clone()),
            table: LemmaTable::new(),
            compiled: Some(compiled),
            dirty: false,
        }
    }

    /// 読み取り専用のストアであれば`true`を返します。
    #[inline(always)]
    pub fn is_read_only(&self) -> bool {
        self.mode == OpenMode::Read
    }

    /// ストアを開いたモードを返します。
    #[inline(always)]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// ストアの設定を返します。
    #[inline(always)]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// 現在のスキーマを返します。`init`が呼ばれていなければ`None`です。
    #[inline(always)]
    pub fn schema(&self) -> Option<&PropertySchema> {
        self.schema.as_ref()
    }

    fn ensure_writable(&self, op: &'static str) -> Result<()> {
        if self.is_read_only() {
            return Err(LexiconError::ReadOnly(op));
        }
        Ok(())
    }

    fn active_schema(&self) -> Result<&PropertySchema> {
        self.schema
            .as_ref()
            .ok_or_else(|| LexiconError::schema("No schema is defined. Call init first."))
    }

    /// スキーマを定義し、登録済みの見出し語とコンパイル済み索引をすべて破棄します。
    ///
    /// # エラー
    ///
    /// - スキーマが不正な場合は[`LexiconError::Schema`]
    /// - 読み取り専用ストアの場合は[`LexiconError::ReadOnly`]
    ///
    /// どちらの場合もストアは変更されません。
    pub fn init<I>(&mut self, defs: I) -> Result<()>
    where
        I: IntoIterator<Item = PropertyDef>,
    {
        self.ensure_writable("init")?;
        let schema = PropertySchema::new(defs)?;
        log::debug!(
            "[lexicore] init: {} properties, {} staged lemmas discarded",
            schema.len(),
            self.table.len(),
        );
        self.schema = Some(schema);
        self.table.clear();
        self.compiled = None;
        self.dirty = true;
        Ok(())
    }

    /// 見出し語を追加します。既に存在する場合は頻度と位置属性を上書きします。
    ///
    /// 設定済みのプロパティ値は上書き後も保持されます。
    ///
    /// # エラー
    ///
    /// - 見出し語が空、またはNUL文字かU+FFFFを含む場合は[`LexiconError::Validation`]
    /// - 頻度が負の場合は[`LexiconError::Validation`]
    /// - 位置属性が[`StoreConfig::max_positions`]を超える場合は[`LexiconError::Validation`]
    /// - 読み取り専用ストアの場合は[`LexiconError::ReadOnly`]
    pub fn insert(&mut self, term: &str, frequency: i64, positions: &[u32]) -> Result<LemmaId> {
        self.ensure_writable("insert")?;
        let frequency = self.validate_lemma(term, frequency, positions)?;
        let num_props = self.schema.as_ref().map_or(0, PropertySchema::len);
        let id = self.table.upsert(term, frequency, positions, num_props)?;
        self.dirty = true;
        Ok(id)
    }

    fn validate_lemma(&self, term: &str, frequency: i64, positions: &[u32]) -> Result<u64> {
        if term.is_empty() {
            return Err(LexiconError::validation("term", "A term must not be empty."));
        }
        if term.contains('\0') {
            return Err(LexiconError::validation(
                "term",
                format!("{term:?} contains a NUL character."),
            ));
        }
        // Reserved as the terminator of the trie.
        if term.contains('\u{FFFF}') {
            return Err(LexiconError::validation(
                "term",
                format!("{term:?} contains the noncharacter U+FFFF."),
            ));
        }
        let Ok(frequency) = u64::try_from(frequency) else {
            return Err(LexiconError::validation(
                "frequency",
                format!("The frequency of {term:?} must be non-negative, but got {frequency}."),
            ));
        };
        if positions.len() > self.config.max_positions {
            return Err(LexiconError::validation(
                "positions",
                format!(
                    "{term:?} has {} positions, but at most {} are allowed.",
                    positions.len(),
                    self.config.max_positions,
                ),
            ));
        }
        Ok(frequency)
    }

    /// CSV形式の見出し語リストを読み込み、各行を[`DictionaryStore::insert`]します。
    ///
    /// すべての行を解析と検証してから登録するため、失敗した場合にストアは変更されません。
    /// 登録した行の数を返します。
    ///
    /// # エラー
    ///
    /// - 不正な行がある場合は[`LexiconError::InvalidFormat`]
    /// - 行の値が[`DictionaryStore::insert`]の検証を通らない場合は[`LexiconError::Validation`]
    /// - 読み取り専用ストアの場合は[`LexiconError::ReadOnly`]
    pub fn import_csv<R>(&mut self, mut rdr: R) -> Result<usize>
    where
        R: Read,
    {
        self.ensure_writable("import_csv")?;
        let mut buf = vec![];
        rdr.read_to_end(&mut buf)?;
        let rows = import::parse_csv(&buf, "csv")?;

        let mut validated = Vec::with_capacity(rows.len());
        for row in &rows {
            let frequency = self
                .validate_lemma(&row.term, row.frequency, &row.positions)
                .map_err(|e| match e {
                    LexiconError::Validation(mut e) => {
                        e.msg = format!("row {}: {}", row.row, e.msg);
                        LexiconError::Validation(e)
                    }
                    e => e,
                })?;
            validated.push((row, frequency));
        }
        if validated.len() > usize::try_from(u32::MAX)?.saturating_sub(self.table.len()) {
            return Err(LexiconError::validation(
                "csv",
                "The number of lemmas exceeds u32::MAX.",
            ));
        }

        let num_props = self.schema.as_ref().map_or(0, PropertySchema::len);
        for (row, frequency) in &validated {
            self.table
                .upsert(&row.term, *frequency, &row.positions, num_props)?;
        }
        if !validated.is_empty() {
            self.dirty = true;
        }
        log::debug!("[lexicore] imported {} rows", validated.len());
        Ok(validated.len())
    }

    /// 見出し語のプロパティ値を生のバイト列から設定します。
    ///
    /// 固定長の型では先頭から型の幅だけをコピーし、残りは無視します。
    /// 文字列型では`data`をそのままコピーします。
    ///
    /// # エラー
    ///
    /// - 見出し語が存在しない場合は[`LexiconError::NotFound`]
    /// - キーがスキーマにない場合は[`LexiconError::Schema`]
    /// - `data`が型の幅より短い場合は[`LexiconError::Validation`]
    /// - 読み取り専用ストアの場合は[`LexiconError::ReadOnly`]
    pub fn set_prop(&mut self, term: &str, key: &str, data: &[u8]) -> Result<()> {
        self.ensure_writable("set_prop")?;
        let (index, def) = self.resolve_for_write(term, key)?;
        let value = PropertyValue::from_raw(def.prop_type, data)?;
        self.table.set_property(term, index, value)?;
        self.dirty = true;
        Ok(())
    }

    /// 型付きのプロパティ値を設定します。
    ///
    /// # エラー
    ///
    /// [`DictionaryStore::set_prop`]のエラーに加えて、値の型がスキーマの型と
    /// 異なる場合は[`LexiconError::Schema`]を返します。
    pub fn set_prop_value(&mut self, term: &str, key: &str, value: PropertyValue) -> Result<()> {
        self.ensure_writable("set_prop_value")?;
        let (index, def) = self.resolve_for_write(term, key)?;
        if def.prop_type != value.prop_type() {
            return Err(LexiconError::schema(format!(
                "The property {key:?} is {}, but a {} value was given.",
                def.prop_type.name(),
                value.prop_type().name(),
            )));
        }
        self.table.set_property(term, index, value)?;
        self.dirty = true;
        Ok(())
    }

    fn resolve_for_write(&self, term: &str, key: &str) -> Result<(usize, PropertyDef)> {
        if self.table.get(term).is_none() {
            return Err(LexiconError::term_not_found(term));
        }
        let (index, def) = self.active_schema()?.resolve(key)?;
        Ok((index, def.clone()))
    }

    /// 見出し語のプロパティ値をバイト列で返します。
    ///
    /// 固定長の型はリトルエンディアンで格納されています。
    ///
    /// # エラー
    ///
    /// - 見出し語またはプロパティ値が存在しない場合は[`LexiconError::NotFound`]
    /// - キーがスキーマにない場合は[`LexiconError::Schema`]
    pub fn get_prop(&self, term: &str, key: &str) -> Result<&[u8]> {
        Ok(self.property(term, key)?.data)
    }

    /// 見出し語のプロパティ値を型情報付きで返します。
    ///
    /// エラーは[`DictionaryStore::get_prop`]と同じです。
    pub fn property(&self, term: &str, key: &str) -> Result<PropertyRef<'_>> {
        match &self.compiled {
            Some(compiled) if self.is_read_only() => {
                let id = compiled
                    .find(term)
                    .ok_or_else(|| LexiconError::term_not_found(term))?;
                let (index, def) = self.active_schema()?.resolve(key)?;
                let data = compiled
                    .property(id, index)
                    .ok_or_else(|| LexiconError::property_not_found(key))?;
                Ok(PropertyRef {
                    key: &def.key,
                    prop_type: def.prop_type,
                    data,
                })
            }
            _ => {
                let (_, record) = self
                    .table
                    .get(term)
                    .ok_or_else(|| LexiconError::term_not_found(term))?;
                let (index, def) = self.active_schema()?.resolve(key)?;
                let value = record
                    .properties
                    .get(index)
                    .and_then(Option::as_ref)
                    .ok_or_else(|| LexiconError::property_not_found(key))?;
                Ok(PropertyRef {
                    key: &def.key,
                    prop_type: def.prop_type,
                    data: value.as_bytes(),
                })
            }
        }
    }

    /// 見出し語に設定されたプロパティをスキーマの順に返します。
    ///
    /// 値が設定されていないプロパティは含まれません。
    ///
    /// # エラー
    ///
    /// 見出し語が存在しない場合は[`LexiconError::NotFound`]を返します。
    pub fn properties(&self, term: &str) -> Result<Vec<PropertyRef<'_>>> {
        let Some(schema) = &self.schema else {
            self.lemma(term)?;
            return Ok(vec![]);
        };
        let mut props = Vec::with_capacity(schema.len());
        match &self.compiled {
            Some(compiled) if self.is_read_only() => {
                let id = compiled
                    .find(term)
                    .ok_or_else(|| LexiconError::term_not_found(term))?;
                for (i, def) in schema.iter().enumerate() {
                    if let Some(data) = compiled.property(id, i) {
                        props.push(PropertyRef {
                            key: &def.key,
                            prop_type: def.prop_type,
                            data,
                        });
                    }
                }
            }
            _ => {
                let (_, record) = self
                    .table
                    .get(term)
                    .ok_or_else(|| LexiconError::term_not_found(term))?;
                for (def, value) in schema.iter().zip(&record.properties) {
                    if let Some(value) = value {
                        props.push(PropertyRef {
                            key: &def.key,
                            prop_type: def.prop_type,
                            data: value.as_bytes(),
                        });
                    }
                }
            }
        }
        Ok(props)
    }

    /// SHORT型のプロパティ値を返します。
    pub fn get_short(&self, term: &str, key: &str) -> Result<i16> {
        self.property(term, key)?.as_short()
    }

    /// INT型のプロパティ値を返します。
    pub fn get_int(&self, term: &str, key: &str) -> Result<i32> {
        self.property(term, key)?.as_int()
    }

    /// LONG型のプロパティ値を返します。
    pub fn get_long(&self, term: &str, key: &str) -> Result<i64> {
        self.property(term, key)?.as_long()
    }

    /// STRING型のプロパティ値をUTF-8文字列として返します。
    pub fn get_string(&self, term: &str, key: &str) -> Result<&str> {
        self.property(term, key)?.as_str()
    }

    /// 見出し語の頻度と位置属性を返します。
    ///
    /// # エラー
    ///
    /// 見出し語が存在しない場合は[`LexiconError::NotFound`]を返します。
    pub fn lemma(&self, term: &str) -> Result<LemmaRef<'_>> {
        match &self.compiled {
            Some(compiled) if self.is_read_only() => {
                let id = compiled
                    .find(term)
                    .ok_or_else(|| LexiconError::term_not_found(term))?;
                Ok(LemmaRef {
                    id,
                    term: compiled.term(id),
                    frequency: compiled.frequency(id),
                    positions: compiled.positions(id),
                })
            }
            _ => {
                let (id, record) = self
                    .table
                    .get(term)
                    .ok_or_else(|| LexiconError::term_not_found(term))?;
                Ok(LemmaRef {
                    id,
                    term: &record.term,
                    frequency: record.frequency,
                    positions: &record.positions,
                })
            }
        }
    }

    /// 見出し語が登録されていれば`true`を返します。
    pub fn contains(&self, term: &str) -> bool {
        self.lemma(term).is_ok()
    }

    /// 見出し語の数を返します。
    pub fn len(&self) -> usize {
        match &self.compiled {
            Some(compiled) if self.is_read_only() => compiled.len(),
            _ => self.table.len(),
        }
    }

    /// 見出し語が1つもなければ`true`を返します。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// すべての見出し語を返します。
    ///
    /// 読み取り専用ストアでは辞書順、書き込み可能なストアでは挿入順です。
    pub fn terms(&self) -> Vec<&str> {
        match &self.compiled {
            Some(compiled) if self.is_read_only() => compiled.terms().collect(),
            _ => self.table.iter().map(|(_, r)| r.term.as_str()).collect(),
        }
    }

    /// 入力の接頭辞になっている見出し語をすべて返します。
    ///
    /// 戻り値は`(見出し語のID, 終了位置)`の組で、終了位置は文字単位です。
    /// 短い見出し語から順に並びます。
    ///
    /// # エラー
    ///
    /// 索引がコンパイルされていない、または最後のコンパイル以降に変更がある場合は
    /// [`LexiconError::InvalidState`]を返します。
    pub fn common_prefix_search(&self, input: &[char]) -> Result<Vec<(LemmaId, usize)>> {
        let compiled = self.fresh_index("common_prefix_search")?;
        if self.is_read_only() {
            return Ok(compiled.common_prefix_iterator(input).collect());
        }
        // Translate compiled slots back to staging ids.
        compiled
            .common_prefix_iterator(input)
            .map(|(slot, end)| {
                let term = compiled.term(slot);
                let (id, _) = self.table.get(term).ok_or_else(|| {
                    LexiconError::invalid_state("The index is out of sync", term.to_string())
                })?;
                Ok((id, end))
            })
            .collect()
    }

    fn fresh_index(&self, op: &str) -> Result<&CompiledLexicon> {
        match &self.compiled {
            Some(compiled) if !self.dirty => Ok(compiled),
            Some(_) => Err(LexiconError::invalid_state(
                format!("{op} requires a fresh index"),
                "The dictionary changed since the last build. Call build first.",
            )),
            None => Err(LexiconError::invalid_state(
                format!("{op} requires a compiled index"),
                "Call build first.",
            )),
        }
    }

    /// ステージング表をトライ索引にコンパイルします。
    ///
    /// 同じ内容からは挿入順に関係なく同じ索引が得られます。
    ///
    /// # エラー
    ///
    /// - `init`が呼ばれていない場合は[`LexiconError::Schema`]
    /// - 読み取り専用ストアの場合は[`LexiconError::ReadOnly`]
    pub fn build(&mut self) -> Result<()> {
        self.ensure_writable("build")?;
        let schema = self.active_schema()?;
        let compiled = CompiledLexicon::build(schema, &self.table)?;
        log::debug!("[lexicore] built an index of {} lemmas", compiled.len());
        self.compiled = Some(compiled);
        self.dirty = false;
        Ok(())
    }

    /// コンパイル済みの索引をファイルに保存します。
    ///
    /// 保存先と同じディレクトリの一時ファイルに書き込んでから置き換えるため、
    /// 失敗しても既存のファイルは壊れません。
    ///
    /// # エラー
    ///
    /// - 索引がないか古い場合は[`LexiconError::InvalidState`]
    /// - 保存先がディレクトリの場合は[`LexiconError::PathIsDirectory`]
    /// - 書き込みに失敗した場合は[`LexiconError::IoError`]または[`LexiconError::PathPersist`]
    pub fn save<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let payload = self.fresh_index("save")?.to_payload()?;
        CONTAINER.persist(path, &payload, self.config.sync_on_save)
    }

    /// コンパイル済みの索引をライターに書き出します。
    pub fn write<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        let payload = self.fresh_index("write")?.to_payload()?;
        CONTAINER.write(wtr, &payload)
    }

    /// コンパイル済みの索引を保存ファイルと同じバイト列で返します。
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = vec![];
        self.write(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos_store() -> DictionaryStore {
        let mut store = DictionaryStore::new(StoreConfig::default());
        store
            .init([
                PropertyDef::new("pos", PropType::Short),
                PropertyDef::new("reading", PropType::String),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DictionaryStore>();
    }

    #[test]
    fn test_insert_validation() {
        let mut store = DictionaryStore::new(StoreConfig::default().max_positions(2));
        assert!(matches!(
            store.insert("", 1, &[]),
            Err(LexiconError::Validation(_))
        ));
        assert!(matches!(
            store.insert("a\0b", 1, &[]),
            Err(LexiconError::Validation(_))
        ));
        assert!(matches!(
            store.insert("a", -1, &[]),
            Err(LexiconError::Validation(_))
        ));
        assert!(matches!(
            store.insert("a", 1, &[1, 2, 3]),
            Err(LexiconError::Validation(_))
        ));
        assert!(store.is_empty());
        store.insert("a", 0, &[1, 2]).unwrap();
        assert_eq!(store.len(), 1);
    }

    /// トライの終端記号と衝突する見出し語を拒否することを確認
    #[test]
    fn test_insert_rejects_trie_terminator() {
        let mut store = pos_store();
        store.insert("a", 1, &[]).unwrap();
        assert!(matches!(
            store.insert("a\u{FFFF}", 1, &[]),
            Err(LexiconError::Validation(_))
        ));
        assert!(matches!(
            store.import_csv("b,1\n\u{FFFF},2\n".as_bytes()),
            Err(LexiconError::Validation(_))
        ));
        store.insert("\u{10FFFF}", 1, &[]).unwrap();
        store.insert("\u{FFFE}", 1, &[]).unwrap();
        assert_eq!(store.len(), 3);

        store.build().unwrap();
        let loaded = DictionaryStore::read(store.to_bytes().unwrap().as_slice()).unwrap();
        assert!(loaded.contains("\u{10FFFF}"));
        assert!(loaded.contains("\u{FFFE}"));
        assert!(!loaded.contains("b"));
    }

    #[test]
    fn test_insert_without_init() {
        let mut store = DictionaryStore::new(StoreConfig::default());
        store.insert("a", 1, &[]).unwrap();
        assert!(store.properties("a").unwrap().is_empty());
        assert!(matches!(
            store.set_prop("a", "pos", &[0, 0]),
            Err(LexiconError::Schema(_))
        ));
        assert!(matches!(store.build(), Err(LexiconError::Schema(_))));
    }

    #[test]
    fn test_staged_reads() {
        let mut store = pos_store();
        let id = store.insert("東京", 5, &[1, 2]).unwrap();
        store.set_prop("東京", "reading", "とうきょう".as_bytes()).unwrap();

        let lemma = store.lemma("東京").unwrap();
        assert_eq!(lemma.id, id);
        assert_eq!(lemma.frequency, 5);
        assert_eq!(lemma.positions, &[1, 2]);
        assert_eq!(store.get_string("東京", "reading").unwrap(), "とうきょう");
        assert!(matches!(
            store.get_prop("東京", "pos"),
            Err(LexiconError::NotFound(_))
        ));
        assert!(matches!(
            store.get_prop("東京", "missing"),
            Err(LexiconError::Schema(_))
        ));
        assert!(matches!(
            store.get_prop("大阪", "missing"),
            Err(LexiconError::NotFound(_))
        ));
    }

    #[test]
    fn test_set_prop_value_type_check() {
        let mut store = pos_store();
        store.insert("a", 1, &[]).unwrap();
        assert!(matches!(
            store.set_prop_value("a", "pos", PropertyValue::int(1)),
            Err(LexiconError::Schema(_))
        ));
        store
            .set_prop_value("a", "pos", PropertyValue::short(-7))
            .unwrap();
        assert_eq!(store.get_short("a", "pos").unwrap(), -7);
        assert!(matches!(
            store.get_int("a", "pos"),
            Err(LexiconError::Schema(_))
        ));
    }

    #[test]
    fn test_set_prop_short_data() {
        let mut store = pos_store();
        store.insert("a", 1, &[]).unwrap();
        assert!(matches!(
            store.set_prop("a", "pos", &[1]),
            Err(LexiconError::Validation(_))
        ));
        assert!(matches!(
            store.get_prop("a", "pos"),
            Err(LexiconError::NotFound(_))
        ));
    }

    #[test]
    fn test_init_discards_lemmas() {
        let mut store = pos_store();
        store.insert("a", 1, &[]).unwrap();
        store.set_prop("a", "pos", &[1, 0]).unwrap();
        store.build().unwrap();
        store
            .init([PropertyDef::new("pos", PropType::Short)])
            .unwrap();
        assert!(store.is_empty());
        assert!(!store.contains("a"));
        assert!(matches!(
            store.get_prop("a", "pos"),
            Err(LexiconError::NotFound(_))
        ));
        assert!(matches!(
            store.properties("a"),
            Err(LexiconError::NotFound(_))
        ));
        assert!(matches!(store.lemma("a"), Err(LexiconError::NotFound(_))));
        assert!(matches!(store.to_bytes(), Err(LexiconError::InvalidState(_))));
    }

    #[test]
    fn test_failed_init_keeps_state() {
        let mut store = pos_store();
        store.insert("a", 1, &[]).unwrap();
        assert!(matches!(
            store.init(Vec::<PropertyDef>::new()),
            Err(LexiconError::Schema(_))
        ));
        assert!(store.contains("a"));
        assert_eq!(store.schema().unwrap().len(), 2);
    }

    #[test]
    fn test_save_requires_fresh_build() {
        let mut store = pos_store();
        store.insert("a", 1, &[]).unwrap();
        assert!(matches!(store.to_bytes(), Err(LexiconError::InvalidState(_))));
        store.build().unwrap();
        store.to_bytes().unwrap();
        store.insert("b", 1, &[]).unwrap();
        assert!(matches!(store.to_bytes(), Err(LexiconError::InvalidState(_))));
    }

    #[test]
    fn test_common_prefix_search_ids() {
        let mut store = pos_store();
        let b = store.insert("東京都", 1, &[]).unwrap();
        let a = store.insert("東京", 1, &[]).unwrap();
        assert!(matches!(
            store.common_prefix_search(&['東']),
            Err(LexiconError::InvalidState(_))
        ));
        store.build().unwrap();
        let input: Vec<char> = "東京都庁".chars().collect();
        assert_eq!(
            store.common_prefix_search(&input).unwrap(),
            vec![(a, 2), (b, 3)]
        );
    }

    #[test]
    fn test_import_csv() {
        let mut store = pos_store();
        let n = store
            .import_csv("apple,100,1 2\nbanana,3\n,9\n".as_bytes())
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.lemma("apple").unwrap().positions, &[1, 2]);
        assert_eq!(store.lemma("banana").unwrap().frequency, 3);
    }

    #[test]
    fn test_import_csv_is_all_or_nothing() {
        let mut store = pos_store();
        let result = store.import_csv("apple,100\nbanana,-3\n".as_bytes());
        assert!(matches!(result, Err(LexiconError::Validation(_))));
        let result = store.import_csv("apple,100\nbanana\n".as_bytes());
        assert!(matches!(result, Err(LexiconError::InvalidFormat(_))));
        assert!(store.is_empty());
    }
}
