//! コンパイル済みの見出し語索引
//!
//! このモジュールは、ステージング表から構築される読み取り専用の索引を提供します。
//! 索引は列指向のテーブルで構成されます。
//!
//! - トライ: 見出し語からスロット番号へのマップ
//! - 見出し語、頻度、位置属性: スロット番号でインデックス付けされた列
//! - プロパティ参照: `スロット番号 * スキーマ長 + プロパティ位置` でインデックス付けされた
//!   ブロブヒープへの参照

pub(crate) mod heap;
pub(crate) mod trie;

use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::dictionary::lemma::{LemmaId, LemmaTable};
use crate::dictionary::lexicon::heap::{BlobHeapBuilder, BlobRef};
use crate::dictionary::lexicon::trie::Trie;
use crate::dictionary::schema::PropertySchema;
use crate::errors::{LexiconError, Result};
use crate::utils::FromU32;

/// 保存ファイルに書き出される索引のイメージ
#[derive(Archive, Serialize, Deserialize)]
pub(crate) struct LexiconImage {
    schema: PropertySchema,
    trie: Vec<u8>,
    terms: Vec<String>,
    frequencies: Vec<u64>,
    // Offsets into `positions`, one more than the number of lemmas.
    position_offsets: Vec<u32>,
    positions: Vec<u32>,
    properties: Vec<Option<BlobRef>>,
    heap: Vec<u8>,
}

/// 読み取り専用の見出し語索引
pub(crate) struct CompiledLexicon {
    image: LexiconImage,
    trie: Option<Trie>,
}

impl CompiledLexicon {
    /// ステージング表から索引を構築します。
    ///
    /// 見出し語を辞書順に並べてからスロットを割り当てるため、同じ内容の表からは
    /// 挿入順に関係なく同じ索引が得られます。
    pub fn build(schema: &PropertySchema, table: &LemmaTable) -> Result<Self> {
        let sorted = table.sorted();
        let num_props = schema.len();

        let mut records = Vec::with_capacity(sorted.len());
        let mut terms = Vec::with_capacity(sorted.len());
        let mut frequencies = Vec::with_capacity(sorted.len());
        let mut position_offsets = Vec::with_capacity(sorted.len() + 1);
        let mut positions = vec![];
        let mut properties = Vec::with_capacity(sorted.len() * num_props);
        let mut heap = BlobHeapBuilder::new();

        position_offsets.push(0);
        for (slot, record) in sorted.iter().enumerate() {
            records.push((record.term.as_str(), u32::try_from(slot)?));
            terms.push(record.term.clone());
            frequencies.push(record.frequency);
            positions.extend_from_slice(&record.positions);
            position_offsets.push(u32::try_from(positions.len())?);
            for i in 0..num_props {
                let value = record.properties.get(i).and_then(Option::as_ref);
                properties.push(match value {
                    Some(value) => Some(heap.push(value.as_bytes())?),
                    None => None,
                });
            }
        }

        let trie = if records.is_empty() {
            None
        } else {
            Some(Trie::from_records(&records)?)
        };

        Ok(Self {
            image: LexiconImage {
                schema: schema.clone(),
                trie: trie.as_ref().map(Trie::to_bytes).unwrap_or_default(),
                terms,
                frequencies,
                position_offsets,
                positions,
                properties,
                heap: heap.build(),
            },
            trie,
        })
    }

    /// 検証済みのペイロードから索引を復元します。
    pub fn from_payload(payload: &AlignedVec) -> Result<Self> {
        let image = rkyv::from_bytes::<LexiconImage, rkyv::rancor::Error>(payload).map_err(|e| {
            LexiconError::invalid_format(
                "dictionary",
                format!("rkyv validation failed. The dictionary file may be corrupted: {e}"),
            )
        })?;
        Self::from_image(image)
    }

    fn from_image(image: LexiconImage) -> Result<Self> {
        image.verify()?;
        let trie = if image.terms.is_empty() {
            None
        } else {
            let trie = Trie::from_bytes(&image.trie)?;
            for (slot, term) in image.terms.iter().enumerate() {
                if trie.exact_match(term) != Some(u32::try_from(slot)?) {
                    return Err(LexiconError::invalid_format(
                        "dictionary",
                        format!("The trie does not resolve {term:?} to slot {slot}."),
                    ));
                }
            }
            Some(trie)
        };
        Ok(Self { image, trie })
    }

    /// 索引をrkyv形式のバイト列にシリアライズします。
    pub fn to_payload(&self) -> Result<AlignedVec> {
        Ok(rkyv::to_bytes::<rkyv::rancor::Error>(&self.image)?)
    }

    /// 索引が構築されたときのスキーマを返します。
    #[inline(always)]
    pub fn schema(&self) -> &PropertySchema {
        &self.image.schema
    }

    /// 見出し語の数を返します。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.image.terms.len()
    }

    /// 見出し語のスロットを返します。
    #[inline(always)]
    pub fn find(&self, term: &str) -> Option<LemmaId> {
        self.trie.as_ref()?.exact_match(term).map(LemmaId)
    }

    /// スロットの見出し語を返します。
    #[inline(always)]
    pub fn term(&self, id: LemmaId) -> &str {
        &self.image.terms[usize::from_u32(id.0)]
    }

    /// すべての見出し語を辞書順に返します。
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.image.terms.iter().map(String::as_str)
    }

    /// スロットの頻度を返します。
    #[inline(always)]
    pub fn frequency(&self, id: LemmaId) -> u64 {
        self.image.frequencies[usize::from_u32(id.0)]
    }

    /// スロットの位置属性を返します。
    #[inline(always)]
    pub fn positions(&self, id: LemmaId) -> &[u32] {
        let i = usize::from_u32(id.0);
        let start = usize::from_u32(self.image.position_offsets[i]);
        let end = usize::from_u32(self.image.position_offsets[i + 1]);
        &self.image.positions[start..end]
    }

    /// スロットの`index`番目のプロパティ値を返します。
    #[inline(always)]
    pub fn property(&self, id: LemmaId, index: usize) -> Option<&[u8]> {
        let i = usize::from_u32(id.0) * self.image.schema.len() + index;
        self.image.properties[i].map(|r| &self.image.heap[r.range()])
    }

    /// 入力の接頭辞になっている見出し語のスロットと終了位置(文字単位)を返します。
    #[inline(always)]
    pub fn common_prefix_iterator<'a>(
        &'a self,
        input: &'a [char],
    ) -> impl Iterator<Item = (LemmaId, usize)> + 'a {
        self.trie
            .iter()
            .flat_map(move |trie| trie.common_prefix_iterator(input))
            .map(|m| (LemmaId(m.value), m.end_char))
    }
}

impl LexiconImage {
    /// テーブル間の整合性を検証します。
    fn verify(&self) -> Result<()> {
        let bad = |msg: String| LexiconError::invalid_format("dictionary", msg);

        // Re-validate the schema with the same rules as `init`.
        PropertySchema::new(self.schema.iter().cloned())
            .map_err(|e| bad(format!("invalid schema: {e}")))?;

        let n = self.terms.len();
        if self.frequencies.len() != n || self.position_offsets.len() != n + 1 {
            return Err(bad("column lengths mismatch".to_string()));
        }
        if self.properties.len() != n * self.schema.len() {
            return Err(bad("property table length mismatch".to_string()));
        }
        if self.position_offsets[0] != 0
            || self.position_offsets.windows(2).any(|w| w[0] > w[1])
            || usize::from_u32(self.position_offsets[n]) != self.positions.len()
        {
            return Err(bad("broken position offsets".to_string()));
        }
        if self.terms.iter().any(String::is_empty)
            || self.terms.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(bad("terms are not strictly sorted".to_string()));
        }
        for (i, r) in self.properties.iter().enumerate() {
            let Some(r) = r else { continue };
            if r.range().end > self.heap.len() {
                return Err(bad(format!("property reference #{i} is out of the heap")));
            }
            let def = self.schema.get(i % self.schema.len());
            let width = def.and_then(|d| d.prop_type.fixed_width());
            if width.is_some_and(|w| w != usize::from_u32(r.len)) {
                return Err(bad(format!("property reference #{i} has a wrong width")));
            }
        }
        Ok(())
    }
}
