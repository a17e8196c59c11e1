//! 見出し語のステージング表
//!
//! `insert`や`set_prop`による変更はまずこの表に蓄えられ、`build`でトライ索引へ
//! コンパイルされます。

use hashbrown::HashMap;

use crate::dictionary::property::PropertyValue;
use crate::errors::{LexiconError, Result};

/// 見出し語の識別子
///
/// 書き込み可能なストアでは挿入順の番号、読み取り専用ストアではコンパイル済み索引の
/// スロット番号です。次の`init`まで同じ見出し語に対して変わりません。
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, PartialOrd, Ord)]
pub struct LemmaId(pub u32);

impl LemmaId {
    /// 内部の番号を返します。
    #[inline(always)]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// ステージング中の見出し語レコード
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LemmaRecord {
    pub(crate) term: String,
    pub(crate) frequency: u64,
    pub(crate) positions: Vec<u32>,
    /// スキーマの位置でインデックス付けされた値
    pub(crate) properties: Vec<Option<PropertyValue>>,
}

/// 変更可能な見出し語の表
#[derive(Default, Debug)]
pub struct LemmaTable {
    ids: HashMap<String, LemmaId>,
    records: Vec<LemmaRecord>,
}

impl LemmaTable {
    /// 空の表を作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 見出し語を追加または上書きします。
    ///
    /// 既に存在する場合は頻度と位置属性だけを置き換え、プロパティ値は保持します。
    /// 引数の検証は呼び出し側で済ませておく必要があります。
    pub fn upsert(
        &mut self,
        term: &str,
        frequency: u64,
        positions: &[u32],
        num_props: usize,
    ) -> Result<LemmaId> {
        if let Some(&id) = self.ids.get(term) {
            let record = &mut self.records[id.0 as usize];
            record.frequency = frequency;
            record.positions.clear();
            record.positions.extend_from_slice(positions);
            return Ok(id);
        }
        let id = LemmaId(u32::try_from(self.records.len()).map_err(|_| {
            LexiconError::validation("term", "The number of lemmas exceeds u32::MAX.")
        })?);
        self.records.push(LemmaRecord {
            term: term.to_string(),
            frequency,
            positions: positions.to_vec(),
            properties: vec![None; num_props],
        });
        self.ids.insert(term.to_string(), id);
        Ok(id)
    }

    /// 見出し語のIDとレコードを返します。
    #[inline]
    pub fn get(&self, term: &str) -> Option<(LemmaId, &LemmaRecord)> {
        self.ids
            .get(term)
            .map(|&id| (id, &self.records[id.0 as usize]))
    }

    /// 見出し語の`index`番目のプロパティを設定します。
    ///
    /// # エラー
    ///
    /// 見出し語が存在しない場合は[`LexiconError::NotFound`]を返します。
    pub fn set_property(&mut self, term: &str, index: usize, value: PropertyValue) -> Result<()> {
        let id = *self
            .ids
            .get(term)
            .ok_or_else(|| LexiconError::term_not_found(term))?;
        let record = &mut self.records[id.0 as usize];
        let Some(slot) = record.properties.get_mut(index) else {
            return Err(LexiconError::invalid_state(
                "Property slot out of range",
                format!("{term:?} has {} slots", record.properties.len()),
            ));
        };
        *slot = Some(value);
        Ok(())
    }

    /// すべてのレコードを削除します。
    pub fn clear(&mut self) {
        self.ids.clear();
        self.records.clear();
    }

    /// レコードの数を返します。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// レコードがない場合に`true`を返します。
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// レコードを挿入順に返します。
    pub fn iter(&self) -> impl Iterator<Item = (LemmaId, &LemmaRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (LemmaId(i as u32), r))
    }

    /// レコードを見出し語の辞書順に並べて返します。
    ///
    /// 挿入順に依存しないため、コンパイル結果が決定的になります。
    pub fn sorted(&self) -> Vec<&LemmaRecord> {
        let mut sorted: Vec<&LemmaRecord> = self.records.iter().collect();
        sorted.sort_unstable_by(|a, b| a.term.cmp(&b.term));
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_overwrites() {
        let mut table = LemmaTable::new();
        let a = table.upsert("x", 5, &[1, 2], 1).unwrap();
        table
            .set_property("x", 0, PropertyValue::short(3))
            .unwrap();
        let b = table.upsert("x", 9, &[7], 1).unwrap();
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);

        let (_, record) = table.get("x").unwrap();
        assert_eq!(record.frequency, 9);
        assert_eq!(record.positions, vec![7]);
        assert_eq!(record.properties[0], Some(PropertyValue::short(3)));
    }

    #[test]
    fn test_set_property_missing_term() {
        let mut table = LemmaTable::new();
        let result = table.set_property("x", 0, PropertyValue::short(3));
        assert!(matches!(result, Err(LexiconError::NotFound(_))));
    }

    #[test]
    fn test_sorted() {
        let mut table = LemmaTable::new();
        for term in ["東京", "京都", "apple", "東"] {
            table.upsert(term, 1, &[], 0).unwrap();
        }
        let terms: Vec<_> = table.sorted().iter().map(|r| r.term.as_str()).collect();
        assert_eq!(terms, vec!["apple", "京都", "東", "東京"]);
    }
}
