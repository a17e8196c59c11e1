//! マッピング規則の記述言語
//!
//! 規則はカンマ区切りで並べます。文字はそのまま書くか、`U+XXXX`または`0xXXXX`の
//! 形式で書きます。
//!
//! | 記法 | 意味 |
//! |------|------|
//! | `A->a` | `A`を許可し、`a`に変換します。`a`は許可しません。 |
//! | `A..Z->a..z` | 範囲内の文字を許可し、変換先の範囲へ順に変換します。範囲長は一致する必要があります。 |
//! | `a` | `a`を許可し、自分自身に変換します。 |
//! | `a..z` | 範囲内の文字を許可し、自分自身に変換します。 |
//! | `A..Z/2` | 2文字ずつの組の1文字目を2文字目に変換し、2文字目は自分自身に変換します。 |
//!
//! 例えば`A..Z/2`は`A->B, B, C->D, D, ..., Y->Z, Z`と同じです。

use std::fmt;

use crate::errors::{LexiconError, Result};
use crate::mapper::CharMapper;

/// 1つのマッピング規則
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MappingRule {
    /// `A->a`
    Single { src: u32, dst: u32 },
    /// `A..Z->a..z`
    Range {
        src_begin: u32,
        src_end: u32,
        dst_begin: u32,
        dst_end: u32,
    },
    /// `a`
    Stray(u32),
    /// `a..z`
    StrayRange { begin: u32, end: u32 },
    /// `A..Z/2`
    Checkerboard { begin: u32, end: u32 },
}

impl MappingRule {
    /// 1つの規則を解析します。
    ///
    /// # エラー
    ///
    /// 記法が不正な場合は[`LexiconError::Validation`]を返します。
    /// コードポイントの範囲はここでは検査しません。
    pub fn parse(item: &str) -> Result<Self> {
        let item = item.trim();
        if item.is_empty() {
            return Err(LexiconError::validation("rule", "empty rule"));
        }
        if let Some((lhs, rhs)) = item.split_once("->") {
            return match (parse_range(lhs)?, parse_range(rhs)?) {
                (Span::Char(src), Span::Char(dst)) => Ok(Self::Single { src, dst }),
                (Span::Range(src_begin, src_end), Span::Range(dst_begin, dst_end)) => {
                    Ok(Self::Range {
                        src_begin,
                        src_end,
                        dst_begin,
                        dst_end,
                    })
                }
                _ => Err(LexiconError::validation(
                    "rule",
                    format!("{item:?} maps a single char to a range or vice versa"),
                )),
            };
        }
        if let Some((begin, end)) = item.strip_suffix("/2").and_then(|r| r.split_once("..")) {
            return Ok(Self::Checkerboard {
                begin: parse_char(begin)?,
                end: parse_char(end)?,
            });
        }
        Ok(match parse_range(item)? {
            Span::Char(c) => Self::Stray(c),
            Span::Range(begin, end) => Self::StrayRange { begin, end },
        })
    }

    /// カンマ区切りの規則のリストを解析します。
    ///
    /// 空の項目(末尾のカンマなど)は無視します。
    pub fn parse_list(text: &str) -> Result<Vec<Self>> {
        text.split(',')
            .filter(|item| !item.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    /// 規則を適用した場合に発生するエラーを、表を変更せずに検査します。
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Single { src, dst } => {
                CharMapper::check_code_point(src)?;
                CharMapper::check_code_point(dst)
            }
            Self::Range {
                src_begin,
                src_end,
                dst_begin,
                dst_end,
            } => CharMapper::check_range(src_begin, src_end, dst_begin, dst_end),
            Self::Stray(c) => CharMapper::check_code_point(c),
            Self::StrayRange { begin, end } => CharMapper::check_range(begin, end, begin, end),
            Self::Checkerboard { begin, end } => {
                CharMapper::check_range(begin, end, begin, end)?;
                if (end - begin + 1) % 2 != 0 {
                    return Err(LexiconError::range_length_mismatch(format!(
                        "A checkerboard range needs an even length, but {:#06x}..{:#06x} has {} chars.",
                        begin,
                        end,
                        end - begin + 1
                    )));
                }
                Ok(())
            }
        }
    }

    /// 規則をマッピング表に適用します。
    ///
    /// 検査に失敗した場合、表は変更されません。
    pub fn apply(&self, mapper: &mut CharMapper, tag: u8) -> Result<()> {
        self.validate()?;
        match *self {
            Self::Single { src, dst } => mapper.mapping(src, dst, tag),
            Self::Range {
                src_begin,
                src_end,
                dst_begin,
                dst_end,
            } => mapper.mapping_range(src_begin, src_end, dst_begin, dst_end, tag),
            Self::Stray(c) => mapper.mapping_pass(c, tag),
            Self::StrayRange { begin, end } => mapper.mapping_range_pass(begin, end, tag),
            Self::Checkerboard { begin, end } => {
                for p in (begin..end).step_by(2) {
                    mapper.mapping(p, p + 1, tag)?;
                    mapper.mapping_pass(p + 1, tag)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for MappingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cp = |c: u32| format!("U+{c:04X}");
        match *self {
            Self::Single { src, dst } => write!(f, "{}->{}", cp(src), cp(dst)),
            Self::Range {
                src_begin,
                src_end,
                dst_begin,
                dst_end,
            } => write!(
                f,
                "{}..{}->{}..{}",
                cp(src_begin),
                cp(src_end),
                cp(dst_begin),
                cp(dst_end)
            ),
            Self::Stray(c) => write!(f, "{}", cp(c)),
            Self::StrayRange { begin, end } => write!(f, "{}..{}", cp(begin), cp(end)),
            Self::Checkerboard { begin, end } => write!(f, "{}..{}/2", cp(begin), cp(end)),
        }
    }
}

enum Span {
    Char(u32),
    Range(u32, u32),
}

fn parse_range(s: &str) -> Result<Span> {
    let s = s.trim();
    match s.split_once("..") {
        Some((begin, end)) => Ok(Span::Range(parse_char(begin)?, parse_char(end)?)),
        None => Ok(Span::Char(parse_char(s)?)),
    }
}

fn parse_char(s: &str) -> Result<u32> {
    let s = s.trim();
    let hex = s
        .strip_prefix("U+")
        .or_else(|| s.strip_prefix("u+"))
        .or_else(|| s.strip_prefix("0x"))
        .or_else(|| s.strip_prefix("0X"));
    if let Some(hex) = hex {
        if !hex.is_empty() && hex.len() <= 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return u32::from_str_radix(hex, 16)
                .map_err(|e| LexiconError::validation("rule", format!("{s:?}: {e}")));
        }
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(u32::from(c)),
        (None, _) => Err(LexiconError::validation("rule", "missing char")),
        _ => Err(LexiconError::validation(
            "rule",
            format!("{s:?} is neither a single char nor a U+XXXX code"),
        )),
    }
}
