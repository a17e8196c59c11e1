//! 辞書ストアの設定
//!
//! このモジュールは、ストアを開く際のモードと調整可能なパラメータを定義します。

use std::fmt;
use std::str::FromStr;

use crate::errors::{LexiconError, Result};

/// 1つの見出し語が持てる位置属性のデフォルトの上限
pub const DEFAULT_MAX_POSITIONS: usize = 32;

/// ストアを開くモード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// スキーマのない空のストアを作成します。既存のファイルは読み込みません。
    New,
    /// 保存済みのファイルを読み取り専用で開きます。
    Read,
}

impl OpenMode {
    /// モード文字(`'n'`または`'r'`)からモードを返します。
    ///
    /// # エラー
    ///
    /// それ以外の文字の場合は[`LexiconError::Validation`]を返します。
    pub fn from_char(c: char) -> Result<Self> {
        match c {
            'n' => Ok(Self::New),
            'r' => Ok(Self::Read),
            _ => Err(LexiconError::validation(
                "mode",
                format!("Unknown open mode {c:?}. Use 'n' or 'r'."),
            )),
        }
    }

    /// モード文字を返します。
    pub const fn as_char(self) -> char {
        match self {
            Self::New => 'n',
            Self::Read => 'r',
        }
    }
}

impl TryFrom<char> for OpenMode {
    type Error = LexiconError;

    fn try_from(c: char) -> Result<Self> {
        Self::from_char(c)
    }
}

impl FromStr for OpenMode {
    type Err = LexiconError;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => Err(LexiconError::validation(
                "mode",
                format!("Unknown open mode {s:?}. Use \"n\" or \"r\"."),
            )),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// ストアの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// 1つの見出し語が持てる位置属性の上限
    pub max_positions: usize,
    /// 保存時に一時ファイルを`fsync`してから置き換えるかどうか
    pub sync_on_save: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_positions: DEFAULT_MAX_POSITIONS,
            sync_on_save: true,
        }
    }
}

impl StoreConfig {
    /// 位置属性の上限を設定します。
    pub const fn max_positions(mut self, max_positions: usize) -> Self {
        self.max_positions = max_positions;
        self
    }

    /// 保存時の`fsync`を有効または無効にします。
    pub const fn sync_on_save(mut self, yes: bool) -> Self {
        self.sync_on_save = yes;
        self
    }
}
