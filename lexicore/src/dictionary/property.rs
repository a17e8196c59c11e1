//! 見出し語のプロパティ値
//!
//! プロパティ値はスキーマで宣言された型でタグ付けされます。固定長の整数型は
//! リトルエンディアンのバイト列として保持し、`String`型は任意のバイト列をそのまま保持します。

use crate::dictionary::schema::PropType;
use crate::errors::{LexiconError, Result};

/// スキーマの型でタグ付けされたプロパティ値
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum PropertyValue {
    /// 可変長のバイト列 (バイナリセーフ)
    String(Vec<u8>),
    /// 2バイトのペイロード
    Short([u8; 2]),
    /// 4バイトのペイロード
    Int([u8; 4]),
    /// 8バイトのペイロード
    Long([u8; 8]),
}

impl PropertyValue {
    /// 宣言された型に従って生のバイト列から値を作成します。
    ///
    /// 固定長の型では`data`の先頭から型の幅だけをコピーし、残りは無視します。
    ///
    /// # エラー
    ///
    /// 固定長の型で`data`が型の幅より短い場合、[`LexiconError::Validation`]を返します。
    pub fn from_raw(prop_type: PropType, data: &[u8]) -> Result<Self> {
        fn fixed<const N: usize>(prop_type: PropType, data: &[u8]) -> Result<[u8; N]> {
            data.get(..N)
                .and_then(|head| <[u8; N]>::try_from(head).ok())
                .ok_or_else(|| {
                    LexiconError::validation(
                        "data",
                        format!(
                            "{} requires {} bytes, but {} bytes were given.",
                            prop_type.name(),
                            N,
                            data.len()
                        ),
                    )
                })
        }

        Ok(match prop_type {
            PropType::String => Self::String(data.to_vec()),
            PropType::Short => Self::Short(fixed(prop_type, data)?),
            PropType::Int => Self::Int(fixed(prop_type, data)?),
            PropType::Long => Self::Long(fixed(prop_type, data)?),
        })
    }

    /// `i16`値から作成します。
    #[inline(always)]
    pub fn short(value: i16) -> Self {
        Self::Short(value.to_le_bytes())
    }

    /// `i32`値から作成します。
    #[inline(always)]
    pub fn int(value: i32) -> Self {
        Self::Int(value.to_le_bytes())
    }

    /// `i64`値から作成します。
    #[inline(always)]
    pub fn long(value: i64) -> Self {
        Self::Long(value.to_le_bytes())
    }

    /// バイト列から作成します。
    #[inline(always)]
    pub fn string<B>(value: B) -> Self
    where
        B: Into<Vec<u8>>,
    {
        Self::String(value.into())
    }

    /// この値の型を返します。
    #[inline(always)]
    pub const fn prop_type(&self) -> PropType {
        match self {
            Self::String(_) => PropType::String,
            Self::Short(_) => PropType::Short,
            Self::Int(_) => PropType::Int,
            Self::Long(_) => PropType::Long,
        }
    }

    /// 保持しているバイト列を返します。
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::String(v) => v,
            Self::Short(v) => v,
            Self::Int(v) => v,
            Self::Long(v) => v,
        }
    }
}

/// ストアが所有するプロパティデータへの参照
///
/// 次の変更操作、またはストアの破棄まで有効です。
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct PropertyRef<'a> {
    /// プロパティキー
    pub key: &'a str,
    /// 値の型
    pub prop_type: PropType,
    /// 値のバイト列
    pub data: &'a [u8],
}

impl<'a> PropertyRef<'a> {
    /// `SHORT`型の値を`i16`として読み出します。
    pub fn as_short(&self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.fixed::<2>(PropType::Short)?))
    }

    /// `INT`型の値を`i32`として読み出します。
    pub fn as_int(&self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.fixed::<4>(PropType::Int)?))
    }

    /// `LONG`型の値を`i64`として読み出します。
    pub fn as_long(&self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.fixed::<8>(PropType::Long)?))
    }

    /// `STRING`型の値をUTF-8文字列として読み出します。
    pub fn as_str(&self) -> Result<&'a str> {
        if self.prop_type != PropType::String {
            return Err(self.type_mismatch(PropType::String));
        }
        Ok(std::str::from_utf8(self.data)?)
    }

    fn fixed<const N: usize>(&self, expected: PropType) -> Result<[u8; N]> {
        if self.prop_type != expected {
            return Err(self.type_mismatch(expected));
        }
        <[u8; N]>::try_from(self.data)
            .map_err(|_| LexiconError::invalid_state("Broken property payload", self.key))
    }

    fn type_mismatch(&self, expected: PropType) -> LexiconError {
        LexiconError::schema(format!(
            "The property {:?} is declared as {}, not {}.",
            self.key,
            self.prop_type.name(),
            expected.name()
        ))
    }
}
