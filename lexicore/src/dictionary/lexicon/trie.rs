//! トライ構造による高速文字列検索
//!
//! このモジュールは、ダブル配列トライを使用した見出し語の検索機能を提供します。
//! crawdadクレートの`Trie`実装をラップしています。

use crate::errors::{LexiconError, Result};

/// ダブル配列トライ
pub struct Trie {
    da: crawdad::Trie,
}

impl Trie {
    /// レコードからトライを構築します。
    ///
    /// レコードはキーの辞書順に並び、キーが重複していない必要があります。
    pub fn from_records<K>(records: &[(K, u32)]) -> Result<Self>
    where
        K: AsRef<str>,
    {
        Ok(Self {
            da: crawdad::Trie::from_records(records.iter().map(|(k, v)| (k, *v)))
                .map_err(|e| LexiconError::validation("records", e.to_string()))?,
        })
    }

    /// [`Trie::to_bytes`]で書き出したバイト列からトライを復元します。
    ///
    /// バイト列の構造と探索で参照されるノード番号を事前に検査するため、
    /// 不正なバイト列に対してもパニックせずにエラーを返します。
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_layout(bytes)?;
        let (da, rest) = crawdad::Trie::deserialize_from_slice(bytes);
        debug_assert!(rest.is_empty());
        Ok(Self { da })
    }

    /// トライをバイト列に書き出します。
    pub fn to_bytes(&self) -> Vec<u8> {
        self.da.serialize_to_vec()
    }

    /// 完全一致する見出し語の値を返します。
    #[inline(always)]
    pub fn exact_match(&self, key: &str) -> Option<u32> {
        self.da.exact_match(key.chars())
    }

    /// 入力の接頭辞になっている見出し語をすべて返します。
    #[inline(always)]
    pub fn common_prefix_iterator<'a>(
        &'a self,
        input: &'a [char],
    ) -> impl Iterator<Item = TrieMatch> + 'a {
        self.da
            .common_prefix_search(input.iter().cloned())
            .map(move |(value, end_char)| TrieMatch::new(value, end_char))
    }
}

// Layout of `crawdad::Trie::serialize_to_vec`:
//   u32 table length, u32 codes..., u32 alphabet size, u32 node count, (u32 base, u32 check)...
const INVALID_CODE: u32 = u32::MAX;
const OFFSET_MASK: u32 = 0x7fff_ffff;
const NODE_BYTES: usize = 8;

fn take<'a>(src: &mut &'a [u8], len: usize, what: &str) -> Result<&'a [u8]> {
    if src.len() < len {
        return Err(LexiconError::invalid_format(
            "trie",
            format!("The {what} needs {len} bytes, but only {} remain.", src.len()),
        ));
    }
    let (head, rest) = src.split_at(len);
    *src = rest;
    Ok(head)
}

fn take_u32(src: &mut &[u8], what: &str) -> Result<u32> {
    let mut buf = [0; 4];
    buf.copy_from_slice(take(src, 4, what)?);
    Ok(u32::from_le_bytes(buf))
}

fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

/// crawdadのシリアライズ形式を検査します。
///
/// 根と、親から到達しうるノード(`check`が有効なノード番号を指すもの)について、
/// 子の基底位置と終端ノードが配列の範囲内にあることを確認します。
/// ノード数は基底ブロック長の倍数なので、基底位置が範囲内であれば
/// 任意のコードとの排他的論理和も範囲内に収まります。
fn check_layout(bytes: &[u8]) -> Result<()> {
    let mut src = bytes;
    let table_len = usize::try_from(take_u32(&mut src, "code table length")?)?;
    let table_bytes = table_len.checked_mul(4).ok_or_else(|| {
        LexiconError::invalid_format("trie", "The code table length overflows.")
    })?;
    let table = take(&mut src, table_bytes, "code table")?;
    let alphabet_size = take_u32(&mut src, "alphabet size")?;
    let num_nodes = usize::try_from(take_u32(&mut src, "node count")?)?;
    let node_bytes = num_nodes.checked_mul(NODE_BYTES).ok_or_else(|| {
        LexiconError::invalid_format("trie", "The node count overflows.")
    })?;
    let nodes = take(&mut src, node_bytes, "node array")?;
    if !src.is_empty() {
        return Err(LexiconError::invalid_format(
            "trie",
            format!("{} trailing bytes after the trie", src.len()),
        ));
    }

    for offset in (0..table.len()).step_by(4) {
        let code = le_u32(table, offset);
        if code != INVALID_CODE && code >= alphabet_size {
            return Err(LexiconError::invalid_format(
                "trie",
                format!("The code {code} exceeds the alphabet size {alphabet_size}."),
            ));
        }
    }

    let block_len = alphabet_size
        .checked_next_power_of_two()
        .map(|n| n.max(2))
        .ok_or_else(|| LexiconError::invalid_format("trie", "The alphabet size is too large."))?;
    let block_len = usize::try_from(block_len)?;
    if num_nodes == 0 || num_nodes % block_len != 0 || num_nodes > 1 << 31 {
        return Err(LexiconError::invalid_format(
            "trie",
            format!("{num_nodes} nodes do not fill blocks of {block_len}."),
        ));
    }

    let node = |i: usize| {
        (
            le_u32(nodes, i * NODE_BYTES),
            le_u32(nodes, i * NODE_BYTES + 4),
        )
    };
    for i in 0..num_nodes {
        let (base, check) = node(i);
        if i != 0 && usize::try_from(check & OFFSET_MASK)? >= num_nodes {
            // Never the child of any node.
            continue;
        }
        if base & !OFFSET_MASK != 0 {
            // Leaf.
            continue;
        }
        let child_base = usize::try_from(base & OFFSET_MASK)?;
        if child_base >= num_nodes {
            return Err(LexiconError::invalid_format(
                "trie",
                format!("Node {i} points to {child_base}, beyond {num_nodes} nodes."),
            ));
        }
        if check & !OFFSET_MASK != 0 {
            // The terminal child sits at `base ^ 0`.
            let (leaf_base, leaf_check) = node(child_base);
            if leaf_base & !OFFSET_MASK == 0 || usize::try_from(leaf_check & OFFSET_MASK)? != i {
                return Err(LexiconError::invalid_format(
                    "trie",
                    format!("Node {i} has no terminal leaf at {child_base}."),
                ));
            }
        }
    }
    Ok(())
}

/// トライマッチング結果
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct TrieMatch {
    pub value: u32,
    pub end_char: usize,
}

impl TrieMatch {
    /// 新しいマッチング結果を作成します。
    #[inline(always)]
    pub const fn new(value: u32, end_char: usize) -> Self {
        Self { value, end_char }
    }
}
