//! CSV形式の見出し語リストの読み込み
//!
//! 各行は次の形式です。
//!
//! ```text
//! 見出し語,頻度[,位置属性 位置属性 ...]
//! ```
//!
//! 位置属性は3列目に空白区切りで並べます。空行は無視され、見出し語が空の行は
//! 警告を出して読み飛ばされます。

use csv_core::ReadFieldResult;

use crate::errors::{LexiconError, Result};

/// 読み込まれた1行分のエントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportRow {
    /// 1始まりのレコード番号(空行は数えません)
    pub row: usize,
    pub term: String,
    pub frequency: i64,
    pub positions: Vec<u32>,
}

/// CSVのバイト列をすべて解析します。
///
/// # エラー
///
/// 列の数が2または3でない行、数値として解釈できない列、UTF-8として不正な列が
/// あれば、その行番号を含む[`LexiconError::InvalidFormat`]を返します。
pub(crate) fn parse_csv(mut bytes: &[u8], name: &'static str) -> Result<Vec<ImportRow>> {
    let mut rows = vec![];

    let mut rdr = csv_core::Reader::new();
    let mut output = [0; 4096];
    let mut field = vec![];
    let mut fields: Vec<String> = vec![];
    let mut row = 1;

    loop {
        let (result, nin, nout) = rdr.read_field(bytes, &mut output);
        field.extend_from_slice(&output[..nout]);
        bytes = &bytes[nin..];
        match result {
            ReadFieldResult::InputEmpty | ReadFieldResult::OutputFull => continue,
            ReadFieldResult::Field { record_end } => {
                let text = String::from_utf8(std::mem::take(&mut field)).map_err(|_| {
                    LexiconError::invalid_format(name, format!("row {row}: invalid UTF-8"))
                })?;
                fields.push(text);
                if !record_end {
                    continue;
                }
                // Blank line
                if fields.len() == 1 && fields[0].is_empty() {
                    fields.clear();
                    continue;
                }
                if let Some(entry) = parse_row(&fields, row, name)? {
                    rows.push(entry);
                }
                fields.clear();
                row += 1;
            }
            ReadFieldResult::End => break,
        }
    }
    Ok(rows)
}

fn parse_row(fields: &[String], row: usize, name: &'static str) -> Result<Option<ImportRow>> {
    if !(2..=3).contains(&fields.len()) {
        return Err(LexiconError::invalid_format(
            name,
            format!(
                "row {row}: a csv row must have two or three items, but has {}: {:?}",
                fields.len(),
                fields.join(","),
            ),
        ));
    }
    let term = &fields[0];
    if term.is_empty() {
        log::warn!("[lexicore] skipped an empty term at row {row}: {:?}", fields.join(","));
        return Ok(None);
    }
    let frequency = fields[1].trim().parse().map_err(|e| {
        LexiconError::invalid_format(name, format!("row {row}: bad frequency {:?}: {e}", fields[1]))
    })?;
    let positions = match fields.get(2) {
        Some(list) => list
            .split_ascii_whitespace()
            .map(|p| {
                p.parse().map_err(|e| {
                    LexiconError::invalid_format(name, format!("row {row}: bad position {p:?}: {e}"))
                })
            })
            .collect::<Result<Vec<u32>>>()?,
        None => vec![],
    };
    Ok(Some(ImportRow {
        row,
        term: term.clone(),
        frequency,
        positions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows() {
        let data = "apple,100,1 2\n\"a,b\",3\n東京,5,\n";
        let rows = parse_csv(data.as_bytes(), "test").unwrap();
        assert_eq!(
            rows,
            vec![
                ImportRow {
                    row: 1,
                    term: "apple".to_string(),
                    frequency: 100,
                    positions: vec![1, 2],
                },
                ImportRow {
                    row: 2,
                    term: "a,b".to_string(),
                    frequency: 3,
                    positions: vec![],
                },
                ImportRow {
                    row: 3,
                    term: "東京".to_string(),
                    frequency: 5,
                    positions: vec![],
                },
            ]
        );
    }

    #[test]
    fn test_blank_lines() {
        let rows = parse_csv(b"a,1\n\n\nb,2\n", "test").unwrap();
        let terms: Vec<_> = rows.iter().map(|r| r.term.as_str()).collect();
        assert_eq!(terms, vec!["a", "b"]);
    }

    #[test]
    fn test_no_trailing_newline() {
        let rows = parse_csv(b"x,1", "test").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].term, "x");
    }

    #[test]
    fn test_skip_empty_term() {
        let rows = parse_csv(b",1\ny,2\n", "test").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].term, "y");
        assert_eq!(rows[0].row, 2);
    }

    #[test]
    fn test_malformed_rows() {
        for data in ["x\n", "x,1,2,3\n", "x,abc\n", "x,1,2 z\n"] {
            let result = parse_csv(data.as_bytes(), "test");
            assert!(
                matches!(result, Err(LexiconError::InvalidFormat(_))),
                "{data:?}"
            );
        }
    }

    #[test]
    fn test_error_names_row() {
        let e = parse_csv(b"a,1\nb,oops\n", "test").unwrap_err();
        assert!(e.to_string().contains("row 2"), "{e}");
    }
}
