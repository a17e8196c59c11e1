//! プロパティ値のブロブヒープ
//!
//! すべての見出し語のプロパティ値を1本のバイト列に詰め、オフセットと長さで参照します。

use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::Result;
use crate::utils::FromU32;

/// ヒープ内のバイト列への参照
#[derive(Clone, Copy, Eq, PartialEq, Debug, Archive, Serialize, Deserialize)]
pub struct BlobRef {
    pub offset: u32,
    pub len: u32,
}

impl BlobRef {
    /// 参照先の範囲を返します。
    #[inline(always)]
    pub fn range(self) -> std::ops::Range<usize> {
        let start = usize::from_u32(self.offset);
        start..start + usize::from_u32(self.len)
    }
}

/// ブロブヒープを構築するビルダー
#[derive(Default)]
pub struct BlobHeapBuilder {
    data: Vec<u8>,
}

impl BlobHeapBuilder {
    /// 新しいビルダーを作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// バイト列を追加し、その参照を返します。
    #[inline(always)]
    pub fn push(&mut self, bytes: &[u8]) -> Result<BlobRef> {
        let offset = u32::try_from(self.data.len())?;
        let len = u32::try_from(bytes.len())?;
        // The end offset must also fit in u32.
        u32::try_from(self.data.len() + bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(BlobRef { offset, len })
    }

    /// ヒープのバイト列を返します。
    #[allow(clippy::missing_const_for_fn)]
    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push() {
        let mut b = BlobHeapBuilder::new();
        let r1 = b.push(b"abc").unwrap();
        let r2 = b.push(&[]).unwrap();
        let r3 = b.push(&5i16.to_le_bytes()).unwrap();
        let heap = b.build();
        assert_eq!(&heap[r1.range()], b"abc");
        assert_eq!(&heap[r2.range()], b"");
        assert_eq!(&heap[r3.range()], &[5, 0]);
    }
}
