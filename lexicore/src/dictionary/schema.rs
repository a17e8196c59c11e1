//! プロパティスキーマ
//!
//! 辞書内のすべての見出し語が共有する、名前と型を持つ属性定義の列を扱います。

use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{LexiconError, Result};

/// プロパティキーの最大バイト長
pub const MAX_PROPERTY_KEY_LEN: usize = 63;

/// プロパティ値の型
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug, Clone, Copy))]
#[repr(u8)]
pub enum PropType {
    /// 可変長のバイト列
    String,
    /// 2バイト整数
    Short,
    /// 4バイト整数
    Int,
    /// 8バイト整数
    Long,
}

impl PropType {
    /// 固定長の型であればそのバイト数を返します。`String`の場合は`None`です。
    #[inline(always)]
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            Self::String => None,
            Self::Short => Some(2),
            Self::Int => Some(4),
            Self::Long => Some(8),
        }
    }

    /// 型の名前を返します。
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Short => "SHORT",
            Self::Int => "INT",
            Self::Long => "LONG",
        }
    }
}

/// プロパティの定義
#[derive(Clone, Eq, PartialEq, Debug, Hash, Archive, Serialize, Deserialize)]
pub struct PropertyDef {
    /// キー (最大63バイト)
    pub key: String,
    /// 値の型
    pub prop_type: PropType,
}

impl PropertyDef {
    /// 新しい定義を作成します。
    pub fn new<S>(key: S, prop_type: PropType) -> Self
    where
        S: Into<String>,
    {
        Self {
            key: key.into(),
            prop_type,
        }
    }
}

/// 辞書全体で共有される、順序付きのプロパティ定義
#[derive(Clone, Eq, PartialEq, Debug, Archive, Serialize, Deserialize)]
pub struct PropertySchema {
    defs: Vec<PropertyDef>,
}

impl PropertySchema {
    /// 定義のリストからスキーマを作成します。
    ///
    /// # エラー
    ///
    /// 次の場合に[`LexiconError::Schema`]を返します。
    ///
    /// - 定義が1つもない
    /// - キーが空、63バイトを超える、またはNUL文字を含む
    /// - キーが重複している
    pub fn new<I>(defs: I) -> Result<Self>
    where
        I: IntoIterator<Item = PropertyDef>,
    {
        let defs: Vec<PropertyDef> = defs.into_iter().collect();
        if defs.is_empty() {
            return Err(LexiconError::schema(
                "A schema must define at least one property.",
            ));
        }
        for (i, def) in defs.iter().enumerate() {
            if def.key.is_empty() {
                return Err(LexiconError::schema(format!(
                    "The key of property #{i} is empty."
                )));
            }
            if def.key.len() > MAX_PROPERTY_KEY_LEN {
                return Err(LexiconError::schema(format!(
                    "The key {:?} is {} bytes, but must be at most {} bytes.",
                    def.key,
                    def.key.len(),
                    MAX_PROPERTY_KEY_LEN
                )));
            }
            if def.key.contains('\0') {
                return Err(LexiconError::schema(format!(
                    "The key {:?} contains a NUL character.",
                    def.key
                )));
            }
            if defs[..i].iter().any(|d| d.key == def.key) {
                return Err(LexiconError::schema(format!(
                    "The key {:?} is defined more than once.",
                    def.key
                )));
            }
        }
        Ok(Self { defs })
    }

    /// キーに対応するプロパティの位置を返します。
    #[inline]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.defs.iter().position(|d| d.key == key)
    }

    /// キーの位置と定義を返します。
    ///
    /// # エラー
    ///
    /// キーがスキーマにない場合は[`LexiconError::Schema`]を返します。
    pub fn resolve(&self, key: &str) -> Result<(usize, &PropertyDef)> {
        self.position(key)
            .map(|i| (i, &self.defs[i]))
            .ok_or_else(|| {
                LexiconError::schema(format!("The key {key:?} is not defined in the schema."))
            })
    }

    /// 定義の数を返します。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// 定義が空の場合に`true`を返します。検証済みのスキーマでは常に`false`です。
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// 位置`i`の定義を返します。
    #[inline(always)]
    pub fn get(&self, i: usize) -> Option<&PropertyDef> {
        self.defs.get(i)
    }

    /// 定義を宣言順に返します。
    pub fn iter(&self) -> impl Iterator<Item = &PropertyDef> {
        self.defs.iter()
    }
}
