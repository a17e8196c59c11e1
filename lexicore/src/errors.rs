//! エラー型の定義
//!
//! このモジュールは、lexicoreライブラリで使用されるすべてのエラー型を定義します。
//! 辞書ストアと文字マッパーの両方が同じ[`LexiconError`]を返します。

use std::error::Error;
use std::fmt;

use crate::mapper::MAX_CODE_POINT;

/// lexicore専用のResult型
///
/// エラー型としてデフォルトで[`LexiconError`]を使用します。
pub type Result<T, E = LexiconError> = std::result::Result<T, E>;

/// lexicoreのエラー型
///
/// このライブラリで発生する可能性のあるすべてのエラーを表現します。
/// 失敗した操作は辞書やマッピング表の状態を変更しません。
#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    /// 入力値の検証エラー
    ///
    /// [`ValidationError`]のエラーバリアント。空の見出し語や負の頻度などで発生します。
    #[error(transparent)]
    Validation(ValidationError),

    /// 無効なフォーマットエラー
    ///
    /// [`InvalidFormatError`]のエラーバリアント。保存ファイルの破損や
    /// バージョン不一致、取り込みCSVの不正な行で発生します。
    #[error(transparent)]
    InvalidFormat(InvalidFormatError),

    /// 無効な状態エラー
    ///
    /// [`InvalidStateError`]のエラーバリアント。
    #[error(transparent)]
    InvalidState(InvalidStateError),

    /// スキーマエラー
    ///
    /// [`SchemaError`]のエラーバリアント。
    #[error(transparent)]
    Schema(SchemaError),

    /// 見出し語またはプロパティが存在しないエラー
    ///
    /// [`NotFoundError`]のエラーバリアント。
    #[error(transparent)]
    NotFound(NotFoundError),

    /// 読み取り専用ストアへの変更操作
    ///
    /// 引数は拒否された操作の名前です。
    #[error("ReadOnlyError: {0} is not permitted on a read-only store")]
    ReadOnly(&'static str),

    /// コードポイントがマッピング表の範囲外
    #[error("OutOfRangeError: {0:#06x} exceeds the maximum code point {max:#06x}", max = MAX_CODE_POINT)]
    OutOfRange(u32),

    /// 範囲の始点が終点より大きい
    ///
    /// [`RangeError`]のエラーバリアント。
    #[error(transparent)]
    InvalidRange(RangeError),

    /// 変換元と変換先の範囲長が一致しない
    ///
    /// [`RangeError`]のエラーバリアント。
    #[error(transparent)]
    RangeLengthMismatch(RangeError),

    /// 整数変換エラー
    ///
    /// [`TryFromIntError`](std::num::TryFromIntError)のエラーバリアント。
    #[error(transparent)]
    TryFromInt(std::num::TryFromIntError),

    /// UTF-8エンコーディングエラー
    ///
    /// [`std::str::Utf8Error`]のエラーバリアント。
    #[error(transparent)]
    Utf8(std::str::Utf8Error),

    /// I/Oエラー
    ///
    /// [`std::io::Error`](std::io::Error)のエラーバリアント。
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// rkyvシリアライゼーションエラー
    ///
    /// [`rkyv::rancor::Error`](rkyv::rancor::Error)のエラーバリアント。
    #[error(transparent)]
    RkyvError(#[from] rkyv::rancor::Error),

    /// パスがディレクトリを指すエラー
    ///
    /// ファイルが期待される場所にディレクトリが指定された場合に発生します。
    #[error("The path '{0}' is a directory, but a file was expected.")]
    PathIsDirectory(std::path::PathBuf),

    /// 一時ファイルの永続化エラー
    ///
    /// [`tempfile::PersistError`](tempfile::PersistError)のエラーバリアント。
    /// 保存先への置き換えに失敗した場合に発生し、既存ファイルはそのまま残ります。
    #[error(transparent)]
    PathPersist(#[from] tempfile::PersistError),
}

impl LexiconError {
    /// 検証エラーを生成します
    ///
    /// # 引数
    ///
    /// * `arg` - 引数の名前
    /// * `msg` - エラーメッセージ
    pub(crate) fn validation<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Validation(ValidationError {
            arg,
            msg: msg.into(),
        })
    }

    /// 無効なフォーマットエラーを生成します
    ///
    /// # 引数
    ///
    /// * `arg` - フォーマット名
    /// * `msg` - エラーメッセージ
    pub(crate) fn invalid_format<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidFormat(InvalidFormatError {
            arg,
            msg: msg.into(),
        })
    }

    /// 無効な状態エラーを生成します
    ///
    /// # 引数
    ///
    /// * `msg` - エラーメッセージ
    /// * `cause` - エラーの原因
    pub(crate) fn invalid_state<S, M>(msg: S, cause: M) -> Self
    where
        S: Into<String>,
        M: Into<String>,
    {
        Self::InvalidState(InvalidStateError {
            msg: msg.into(),
            cause: cause.into(),
        })
    }

    /// スキーマエラーを生成します
    pub(crate) fn schema<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Schema(SchemaError { msg: msg.into() })
    }

    /// 見出し語が存在しないエラーを生成します
    pub(crate) fn term_not_found<S>(term: S) -> Self
    where
        S: Into<String>,
    {
        Self::NotFound(NotFoundError {
            kind: "term",
            name: term.into(),
        })
    }

    /// プロパティ値が存在しないエラーを生成します
    pub(crate) fn property_not_found<S>(key: S) -> Self
    where
        S: Into<String>,
    {
        Self::NotFound(NotFoundError {
            kind: "property",
            name: key.into(),
        })
    }

    /// 範囲の向きが不正なエラーを生成します
    pub(crate) fn invalid_range(begin: u32, end: u32) -> Self {
        Self::InvalidRange(RangeError {
            name: "InvalidRangeError",
            msg: format!("begin {begin:#06x} is greater than end {end:#06x}"),
        })
    }

    /// 範囲長の不一致エラーを生成します
    pub(crate) fn range_length_mismatch<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::RangeLengthMismatch(RangeError {
            name: "RangeLengthMismatchError",
            msg: msg.into(),
        })
    }
}

/// 入力値が無効な場合に使用されるエラー
#[derive(Debug)]
pub struct ValidationError {
    /// 引数の名前
    pub(crate) arg: &'static str,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ValidationError: {}: {}", self.arg, self.msg)
    }
}

impl Error for ValidationError {}

/// 入力フォーマットが無効な場合に使用されるエラー
#[derive(Debug)]
pub struct InvalidFormatError {
    /// フォーマットの名前
    pub(crate) arg: &'static str,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for InvalidFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidFormatError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidFormatError {}

/// 状態が無効な場合に使用されるエラー
#[derive(Debug)]
pub struct InvalidStateError {
    /// エラーメッセージ
    pub(crate) msg: String,

    /// エラーの根本原因
    pub(crate) cause: String,
}

impl fmt::Display for InvalidStateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidStateError: {}: {}", self.msg, self.cause)
    }
}

impl Error for InvalidStateError {}

/// スキーマ定義またはスキーマ参照が無効な場合に使用されるエラー
#[derive(Debug)]
pub struct SchemaError {
    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SchemaError: {}", self.msg)
    }
}

impl Error for SchemaError {}

/// 見出し語またはプロパティが見つからない場合に使用されるエラー
#[derive(Debug)]
pub struct NotFoundError {
    /// 見つからなかった対象の種類 (`"term"` または `"property"`)
    pub(crate) kind: &'static str,

    /// 見つからなかった対象の名前
    pub(crate) name: String,
}

impl NotFoundError {
    /// 見つからなかった対象の名前を返します。
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NotFoundError: {} {:?}", self.kind, self.name)
    }
}

impl Error for NotFoundError {}

/// 文字マッピングの範囲指定が無効な場合に使用されるエラー
#[derive(Debug)]
pub struct RangeError {
    /// エラー種別の名前
    pub(crate) name: &'static str,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.msg)
    }
}

impl Error for RangeError {}

impl From<std::num::TryFromIntError> for LexiconError {
    fn from(error: std::num::TryFromIntError) -> Self {
        Self::TryFromInt(error)
    }
}

impl From<std::str::Utf8Error> for LexiconError {
    fn from(error: std::str::Utf8Error) -> Self {
        Self::Utf8(error)
    }
}
