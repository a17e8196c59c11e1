//! 文字の正規化と分類のためのマッピング表。
//!
//! このモジュールは、基本多言語面の各コードポイントについて
//! 変換先、分類タグ、許可フラグを保持する密な表を提供します。
//! トークナイザーは辞書を引く前に、入力の各文字をこの表で変換します。
//!
//! 表は次の4つの基本操作でのみ変更されます。
//!
//! - [`CharMapper::mapping`]
//! - [`CharMapper::mapping_range`]
//! - [`CharMapper::mapping_pass`]
//! - [`CharMapper::mapping_range_pass`]
//!
//! [`CharMapper::apply_rules`]は規則の記述言語([`MappingRule`])を解析して、
//! これらの基本操作を呼び出します。
//!
//! # 例
//!
//! ```
//! use lexicore::mapper::CharMapper;
//!
//! let mut mapper = CharMapper::new(false);
//! mapper.apply_rules("A..Z->a..z, a..z", 1).unwrap();
//!
//! let m = mapper.transform_char('Q').unwrap();
//! assert_eq!(m.to_char(), Some('q'));
//! assert_eq!(m.tag, 1);
//! assert!(mapper.transform_char('!').is_none());
//! ```
pub(crate) mod entry;
pub(crate) mod rules;

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{LexiconError, Result};
use crate::format::Container;

pub use crate::mapper::entry::CharMapping;
pub use crate::mapper::rules::MappingRule;

/// 表が扱う最大のコードポイント
pub const MAX_CODE_POINT: u32 = 0xFFFF;

/// [`CharMapper::transform_raw`]が許可されていない文字に対して返す値
pub const NOT_ALLOWED: u32 = u32::MAX;

const TABLE_SIZE: usize = MAX_CODE_POINT as usize + 1;

/// マッピング表ファイルを識別するマジックバイト
pub const CHAR_MAPPER_MAGIC: &[u8; 8] = b"LEXCCMAP";

/// マッピング表ファイルのフォーマットバージョン
pub const CHAR_MAPPER_FORMAT_VERSION: u32 = 1;

const CONTAINER: Container = Container {
    magic: CHAR_MAPPER_MAGIC,
    version: CHAR_MAPPER_FORMAT_VERSION,
    name: "char mapper",
};

/// 変換結果
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Mapped {
    /// 変換先のコードポイント
    pub code_point: u32,
    /// 分類タグ
    pub tag: u8,
}

impl Mapped {
    /// 変換先を`char`として返します。サロゲートの場合は`None`です。
    #[inline(always)]
    pub fn to_char(self) -> Option<char> {
        char::from_u32(self.code_point)
    }
}

/// 保存ファイルに書き出される、デフォルト状態との差分
#[derive(Archive, Serialize, Deserialize)]
struct MapperImage {
    default_pass: bool,
    // Strictly increasing.
    code_points: Vec<u32>,
    mappings: Vec<CharMapping>,
}

/// コードポイントのマッピング表
///
/// 65536個のエントリを持つ密な表です。[`CharMapper::transform`]は表を1回引くだけで、
/// メモリ確保もロックも行いません。
#[derive(Clone)]
pub struct CharMapper {
    table: Box<[CharMapping]>,
    default_pass: bool,
}

impl Default for CharMapper {
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Debug for CharMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharMapper")
            .field("default_pass", &self.default_pass)
            .field("num_allowed", &self.num_allowed())
            .field("num_modified", &self.diff().count())
            .finish()
    }
}

impl CharMapper {
    /// 新しい表を作成します。
    ///
    /// `default_pass`が`true`の場合、すべての文字は許可され、タグ0で自分自身に変換されます。
    /// `false`の場合、すべての文字はマッピングされるまで許可されません。
    pub fn new(default_pass: bool) -> Self {
        let table = if default_pass {
            (0..=MAX_CODE_POINT).map(CharMapping::identity).collect()
        } else {
            vec![CharMapping::DENIED; TABLE_SIZE].into_boxed_slice()
        };
        Self {
            table,
            default_pass,
        }
    }

    /// 表が作成されたときの`default_pass`を返します。
    #[inline(always)]
    pub const fn default_pass(&self) -> bool {
        self.default_pass
    }

    #[inline(always)]
    fn default_entry(&self, cp: u32) -> CharMapping {
        if self.default_pass {
            CharMapping::identity(cp)
        } else {
            CharMapping::DENIED
        }
    }

    pub(crate) fn check_code_point(cp: u32) -> Result<()> {
        if cp > MAX_CODE_POINT {
            return Err(LexiconError::OutOfRange(cp));
        }
        Ok(())
    }

    pub(crate) fn check_range(
        src_begin: u32,
        src_end: u32,
        dst_begin: u32,
        dst_end: u32,
    ) -> Result<()> {
        for cp in [src_begin, src_end, dst_begin, dst_end] {
            Self::check_code_point(cp)?;
        }
        if src_begin > src_end {
            return Err(LexiconError::invalid_range(src_begin, src_end));
        }
        if dst_begin > dst_end {
            return Err(LexiconError::invalid_range(dst_begin, dst_end));
        }
        if src_end - src_begin != dst_end - dst_begin {
            return Err(LexiconError::range_length_mismatch(format!(
                "{:#06x}..{:#06x} has {} chars, but {:#06x}..{:#06x} has {} chars.",
                src_begin,
                src_end,
                src_end - src_begin + 1,
                dst_begin,
                dst_end,
                dst_end - dst_begin + 1,
            )));
        }
        Ok(())
    }

    /// `src`を許可し、`dst`に変換するように設定します。`dst`は許可しません。
    ///
    /// # エラー
    ///
    /// `src`または`dst`が[`MAX_CODE_POINT`]を超える場合は[`LexiconError::OutOfRange`]を
    /// 返し、表は変更されません。
    pub fn mapping(&mut self, src: u32, dst: u32, tag: u8) -> Result<()> {
        Self::check_code_point(src)?;
        Self::check_code_point(dst)?;
        self.table[src as usize] = CharMapping::allowed_to(dst, tag);
        Ok(())
    }

    /// `[src_begin, src_end]`の各文字を許可し、`[dst_begin, dst_end]`へ順に変換します。
    ///
    /// # エラー
    ///
    /// - いずれかの端点が[`MAX_CODE_POINT`]を超える場合は[`LexiconError::OutOfRange`]
    /// - 始点が終点より大きい場合は[`LexiconError::InvalidRange`]
    /// - 範囲長が異なる場合は[`LexiconError::RangeLengthMismatch`]
    ///
    /// いずれの場合も表は変更されません。
    pub fn mapping_range(
        &mut self,
        src_begin: u32,
        src_end: u32,
        dst_begin: u32,
        dst_end: u32,
        tag: u8,
    ) -> Result<()> {
        Self::check_range(src_begin, src_end, dst_begin, dst_end)?;
        for (offset, src) in (src_begin..=src_end).enumerate() {
            let dst = dst_begin + offset as u32;
            self.table[src as usize] = CharMapping::allowed_to(dst, tag);
        }
        Ok(())
    }

    /// `mapping(src, src, tag)`と同じです。
    pub fn mapping_pass(&mut self, src: u32, tag: u8) -> Result<()> {
        self.mapping(src, src, tag)
    }

    /// `mapping_range(src_begin, src_end, src_begin, src_end, tag)`と同じです。
    pub fn mapping_range_pass(&mut self, src_begin: u32, src_end: u32, tag: u8) -> Result<()> {
        self.mapping_range(src_begin, src_end, src_begin, src_end, tag)
    }

    /// 規則の記述言語で書かれたリストを適用し、適用した規則の数を返します。
    ///
    /// すべての規則を解析して検査してから適用するため、失敗した場合に表は変更されません。
    ///
    /// # エラー
    ///
    /// - 記法が不正な場合は[`LexiconError::Validation`]
    /// - 範囲の検査に失敗した場合は各基本操作と同じエラー
    pub fn apply_rules(&mut self, text: &str, tag: u8) -> Result<usize> {
        let rules = MappingRule::parse_list(text)?;
        for rule in &rules {
            rule.validate()?;
        }
        for rule in &rules {
            rule.apply(self, tag)?;
        }
        Ok(rules.len())
    }

    /// コードポイントを変換します。
    ///
    /// 許可されていない文字、または[`MAX_CODE_POINT`]を超える文字の場合は`None`を返します。
    #[inline(always)]
    pub fn transform(&self, src: u32) -> Option<Mapped> {
        let entry = *self.table.get(src as usize)?;
        entry.allowed().then(|| Mapped {
            code_point: entry.dest(),
            tag: entry.tag(),
        })
    }

    /// コードポイントを変換し、タグを`tag`に書き込みます。
    ///
    /// 許可されていない文字の場合は[`NOT_ALLOWED`]を返し、`tag`は変更しません。
    #[inline(always)]
    pub fn transform_raw(&self, src: u32, tag: &mut u8) -> u32 {
        match self.transform(src) {
            Some(m) => {
                *tag = m.tag;
                m.code_point
            }
            None => NOT_ALLOWED,
        }
    }

    /// 文字を変換します。
    #[inline(always)]
    pub fn transform_char(&self, c: char) -> Option<Mapped> {
        self.transform(u32::from(c))
    }

    /// コードポイントのエントリを返します。
    #[inline(always)]
    pub fn entry(&self, cp: u32) -> Option<CharMapping> {
        self.table.get(cp as usize).copied()
    }

    /// 許可されている文字の数を返します。
    pub fn num_allowed(&self) -> usize {
        self.table.iter().filter(|e| e.allowed()).count()
    }

    fn diff(&self) -> impl Iterator<Item = (u32, CharMapping)> + '_ {
        (0..=MAX_CODE_POINT)
            .zip(self.table.iter().copied())
            .filter(move |&(cp, e)| e != self.default_entry(cp))
    }

    /// ファイルから表を読み込みます。
    ///
    /// # エラー
    ///
    /// - ファイルを開けない場合は[`LexiconError::IoError`]
    /// - ファイルが壊れている場合は[`LexiconError::InvalidFormat`]
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let payload = CONTAINER.read_path(path)?;
        Self::from_payload(&payload)
    }

    /// リーダーから表を読み込みます。
    pub fn read<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut bytes = vec![];
        rdr.read_to_end(&mut bytes)?;
        let payload = CONTAINER.read_bytes(&bytes)?;
        Self::from_payload(&payload)
    }

    fn from_payload(payload: &AlignedVec) -> Result<Self> {
        let image = rkyv::from_bytes::<MapperImage, rkyv::rancor::Error>(payload).map_err(|e| {
            LexiconError::invalid_format(
                "char mapper",
                format!("rkyv validation failed. The file may be corrupted: {e}"),
            )
        })?;
        let bad = |msg: String| LexiconError::invalid_format("char mapper", msg);

        if image.code_points.len() != image.mappings.len() {
            return Err(bad("column lengths mismatch".to_string()));
        }
        if image.code_points.windows(2).any(|w| w[0] >= w[1]) {
            return Err(bad("code points are not strictly increasing".to_string()));
        }
        let mut mapper = Self::new(image.default_pass);
        for (&cp, &mapping) in image.code_points.iter().zip(&image.mappings) {
            if cp > MAX_CODE_POINT {
                return Err(bad(format!("code point {cp:#x} is out of range")));
            }
            let entry = CharMapping::from_raw(mapping.raw())
                .ok_or_else(|| bad(format!("broken entry for {cp:#06x}")))?;
            mapper.table[cp as usize] = entry;
        }
        Ok(mapper)
    }

    fn to_payload(&self) -> Result<AlignedVec> {
        let (code_points, mappings) = self.diff().unzip();
        let image = MapperImage {
            default_pass: self.default_pass,
            code_points,
            mappings,
        };
        Ok(rkyv::to_bytes::<rkyv::rancor::Error>(&image)?)
    }

    /// 表をライターに書き出します。
    ///
    /// デフォルト状態と異なるエントリだけを書き出します。
    pub fn write<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        CONTAINER.write(wtr, &self.to_payload()?)
    }

    /// 表をファイルに保存します。
    ///
    /// 一時ファイルに書き込んでから置き換えるため、失敗しても既存のファイルは壊れません。
    pub fn save<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        CONTAINER.persist(path, &self.to_payload()?, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let deny = CharMapper::new(false);
        assert_eq!(deny.transform(0x41), None);
        assert_eq!(deny.num_allowed(), 0);

        let pass = CharMapper::new(true);
        assert_eq!(
            pass.transform(0x41),
            Some(Mapped {
                code_point: 0x41,
                tag: 0
            })
        );
        assert_eq!(pass.transform(MAX_CODE_POINT + 1), None);
        assert_eq!(pass.num_allowed(), TABLE_SIZE);
    }

    #[test]
    fn test_mapping_does_not_declare_dest() {
        let mut mapper = CharMapper::new(false);
        mapper.mapping(0x41, 0x61, 7).unwrap();
        assert_eq!(
            mapper.transform(0x41),
            Some(Mapped {
                code_point: 0x61,
                tag: 7
            })
        );
        assert_eq!(mapper.transform(0x61), None);
    }

    #[test]
    fn test_out_of_range() {
        let mut mapper = CharMapper::new(false);
        assert!(matches!(
            mapper.mapping(0x10000, 0x41, 0),
            Err(LexiconError::OutOfRange(0x10000))
        ));
        assert!(matches!(
            mapper.mapping(0x41, 0x10000, 0),
            Err(LexiconError::OutOfRange(0x10000))
        ));
        assert!(matches!(
            mapper.mapping_range(0xFFFE, 0x10000, 0, 2, 0),
            Err(LexiconError::OutOfRange(0x10000))
        ));
        assert_eq!(mapper.num_allowed(), 0);
    }

    #[test]
    fn test_transform_raw() {
        let mut mapper = CharMapper::new(false);
        mapper.mapping_pass(0x3042, 2).unwrap();
        let mut tag = 0xFF;
        assert_eq!(mapper.transform_raw(0x3042, &mut tag), 0x3042);
        assert_eq!(tag, 2);
        let mut tag = 0xFF;
        assert_eq!(mapper.transform_raw(0x3043, &mut tag), NOT_ALLOWED);
        assert_eq!(tag, 0xFF);
    }

    #[test]
    fn test_apply_rules_all_or_nothing() {
        let mut mapper = CharMapper::new(false);
        let result = mapper.apply_rules("a..z, A..Z->a..y", 1);
        assert!(matches!(result, Err(LexiconError::RangeLengthMismatch(_))));
        assert_eq!(mapper.num_allowed(), 0);

        let result = mapper.apply_rules("a..z, A-->", 1);
        assert!(matches!(result, Err(LexiconError::Validation(_))));
        assert_eq!(mapper.num_allowed(), 0);

        assert_eq!(mapper.apply_rules("a..z, A..Z->a..z", 1).unwrap(), 2);
        assert_eq!(mapper.num_allowed(), 52);
    }

    #[test]
    fn test_payload_roundtrip() {
        let mut mapper = CharMapper::new(true);
        mapper.mapping(0xFF21, 0x41, 3).unwrap();
        let mut bytes = vec![];
        mapper.write(&mut bytes).unwrap();
        let restored = CharMapper::read(bytes.as_slice()).unwrap();
        assert!(restored.default_pass());
        assert_eq!(restored.entry(0xFF21), mapper.entry(0xFF21));
        assert_eq!(restored.entry(0x41), mapper.entry(0x41));
        assert_eq!(restored.diff().count(), 1);
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CharMapper>();
    }
}
