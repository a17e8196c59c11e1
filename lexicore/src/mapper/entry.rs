//! マッピング表のエントリ

use std::fmt;

use rkyv::{Archive, Deserialize, Serialize};

const DEST_BITS: usize = 16;
const DEST_MASK: u32 = (1 << DEST_BITS) - 1;
const TAG_BITS: usize = 8;
const TAG_MASK: u32 = (1 << TAG_BITS) - 1;
const ALLOWED_SHIFT: usize = DEST_BITS + TAG_BITS;

/// 1つのコードポイントに対するマッピング
///
/// 変換先コードポイント、分類タグ、許可フラグを32ビット整数にパックして保持します。
///
/// # メモリレイアウト
///
/// ```text
///    dest = 16 ビット
///     tag =  8 ビット
/// allowed =  1 ビット
/// ```
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Clone, Copy))]
pub struct CharMapping(u32);

impl fmt::Debug for CharMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharMapping")
            .field("dest", &format_args!("{:#06x}", self.dest()))
            .field("tag", &self.tag())
            .field("allowed", &self.allowed())
            .finish()
    }
}

impl CharMapping {
    /// 許可されていないエントリ
    pub const DENIED: Self = Self(0);

    /// 許可されたエントリを作成します。
    ///
    /// `dest`は[`MAX_CODE_POINT`](super::MAX_CODE_POINT)以下である必要があります。
    #[inline(always)]
    pub const fn allowed_to(dest: u32, tag: u8) -> Self {
        debug_assert!(dest <= DEST_MASK);
        Self((dest & DEST_MASK) | ((tag as u32) << DEST_BITS) | (1 << ALLOWED_SHIFT))
    }

    /// 自分自身に変換する、タグ0の許可されたエントリを作成します。
    #[inline(always)]
    pub const fn identity(cp: u32) -> Self {
        Self::allowed_to(cp, 0)
    }

    /// 変換先のコードポイントを取得します。
    #[inline(always)]
    pub const fn dest(self) -> u32 {
        self.0 & DEST_MASK
    }

    /// 分類タグを取得します。
    #[inline(always)]
    pub const fn tag(self) -> u8 {
        ((self.0 >> DEST_BITS) & TAG_MASK) as u8
    }

    /// 許可フラグを取得します。
    #[inline(always)]
    pub const fn allowed(self) -> bool {
        (self.0 >> ALLOWED_SHIFT) & 1 != 0
    }

    /// パックされた値を返します。
    #[inline(always)]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// パックされた値からエントリを復元します。
    ///
    /// 未使用のビットが立っている場合は`None`を返します。
    #[inline(always)]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw >> (ALLOWED_SHIFT + 1) != 0 {
            return None;
        }
        let entry = Self(raw);
        if !entry.allowed() && raw != 0 {
            return None;
        }
        Some(entry)
    }
}
