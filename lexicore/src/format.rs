//! 保存ファイルの共通コンテナ形式
//!
//! 辞書ファイルと文字マッピング表ファイルは、どちらも次の固定長ヘッダの後に
//! rkyvでシリアライズされたペイロードを置きます。
//!
//! ```text
//!  0..8   マジックバイト
//!  8..12  フォーマットバージョン (u32, little endian)
//! 12..16  予約 (0)
//! 16..24  ペイロード長 (u64, little endian)
//! 24..56  ペイロードのSHA-256
//! 56..64  パディング (0)
//! 64..    rkyvペイロード
//! ```
//!
//! ヘッダ長はrkyvのアライメント(16バイト)の倍数です。

use std::fs::File;
use std::io::Write;
use std::path::Path;

use memmap2::Mmap;
use rkyv::util::AlignedVec;
use sha2::{Digest, Sha256};

use crate::errors::{LexiconError, Result};

const RKYV_ALIGNMENT: usize = 16;
const DIGEST_LEN: usize = 32;

/// ヘッダのバイト長
pub(crate) const HEADER_LEN: usize = 64;

const _: () = assert!(HEADER_LEN % RKYV_ALIGNMENT == 0);

/// ファイル種別ごとのマジックバイトとバージョン
#[derive(Clone, Copy, Debug)]
pub(crate) struct Container {
    /// ファイル種別を識別するマジックバイト
    pub magic: &'static [u8; 8],
    /// このクレートが読み書きするフォーマットバージョン
    pub version: u32,
    /// エラーメッセージに使う名前
    pub name: &'static str,
}

impl Container {
    /// ペイロードにヘッダを付けてライターに書き込みます。
    pub fn write<W>(&self, mut wtr: W, payload: &[u8]) -> Result<()>
    where
        W: Write,
    {
        let digest = Sha256::digest(payload);

        let mut header = [0u8; HEADER_LEN];
        header[0..8].copy_from_slice(self.magic);
        header[8..12].copy_from_slice(&self.version.to_le_bytes());
        header[16..24].copy_from_slice(&u64::try_from(payload.len())?.to_le_bytes());
        header[24..24 + DIGEST_LEN].copy_from_slice(&digest);

        wtr.write_all(&header)?;
        wtr.write_all(payload)?;
        Ok(())
    }

    /// 一時ファイルに書き込んでから`path`へ置き換えます。
    ///
    /// 書き込みの途中で失敗した場合、`path`に既に存在するファイルは変更されません。
    pub fn persist<P>(&self, path: P, payload: &[u8], sync: bool) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if path.is_dir() {
            return Err(LexiconError::PathIsDirectory(path.to_path_buf()));
        }

        let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
        self.write(&mut temp_file, payload)?;
        temp_file.flush()?;
        if sync {
            temp_file.as_file().sync_all()?;
        }
        temp_file.persist(path)?;

        log::debug!(
            "[lexicore] wrote {} ({} bytes, sha256 {}) to {}",
            self.name,
            payload.len(),
            hex::encode(&Sha256::digest(payload)[..8]),
            path.display(),
        );
        Ok(())
    }

    /// ファイルを読み込み、ヘッダを検証してアライメント済みのペイロードを返します。
    pub fn read_path<P>(&self, path: P) -> Result<AlignedVec<RKYV_ALIGNMENT>>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        if len < HEADER_LEN as u64 {
            return Err(LexiconError::invalid_format(
                self.name,
                "The file is too small to hold a header.",
            ));
        }
        // SAFETY: the mapping is only read while `file` stays open in this function,
        // and the bytes are copied into an owned buffer before returning.
        let mmap = unsafe { Mmap::map(&file)? };
        self.read_bytes(&mmap)
    }

    /// バイト列のヘッダを検証してアライメント済みのペイロードを返します。
    ///
    /// # エラー
    ///
    /// マジックバイト、バージョン、長さ、ダイジェストのいずれかが一致しない場合、
    /// [`LexiconError::InvalidFormat`]を返します。
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<AlignedVec<RKYV_ALIGNMENT>> {
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Err(LexiconError::invalid_format(
                self.name,
                "The file is too small to hold a header.",
            ));
        };
        if &header[0..8] != self.magic {
            return Err(LexiconError::invalid_format(
                self.name,
                "The magic number of the input file mismatches.",
            ));
        }
        let version = read_u32(&header[8..12]);
        if version != self.version {
            return Err(LexiconError::invalid_format(
                self.name,
                format!(
                    "Unsupported format version {} (expected {}).",
                    version, self.version
                ),
            ));
        }
        let payload_len = usize::try_from(read_u64(&header[16..24])).map_err(|_| {
            LexiconError::invalid_format(self.name, "The payload length is too large.")
        })?;
        let payload = &bytes[HEADER_LEN..];
        if payload.len() != payload_len {
            return Err(LexiconError::invalid_format(
                self.name,
                format!(
                    "The payload is {} bytes, but the header declares {} bytes. The file may be truncated.",
                    payload.len(),
                    payload_len
                ),
            ));
        }
        if Sha256::digest(payload).as_slice() != &header[24..24 + DIGEST_LEN] {
            return Err(LexiconError::invalid_format(
                self.name,
                "The payload checksum mismatches. The file may be corrupted.",
            ));
        }

        let mut aligned = AlignedVec::with_capacity(payload.len());
        aligned.extend_from_slice(payload);
        Ok(aligned)
    }
}

#[inline(always)]
fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

#[inline(always)]
fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST: Container = Container {
        magic: b"LEXCTEST",
        version: 3,
        name: "test",
    };

    fn framed(payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![];
        TEST.write(&mut buf, payload).unwrap();
        buf
    }

    #[test]
    fn test_read_back() {
        let buf = framed(b"hello");
        assert_eq!(buf.len(), HEADER_LEN + 5);
        assert_eq!(TEST.read_bytes(&buf).unwrap().as_slice(), b"hello");
    }

    #[test]
    fn test_magic_mismatch() {
        let mut buf = framed(b"hello");
        buf[0] = b'X';
        assert!(matches!(
            TEST.read_bytes(&buf),
            Err(LexiconError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_version_mismatch() {
        let buf = framed(b"hello");
        let other = Container { version: 4, ..TEST };
        assert!(matches!(
            other.read_bytes(&buf),
            Err(LexiconError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_truncated() {
        let buf = framed(b"hello");
        assert!(matches!(
            TEST.read_bytes(&buf[..buf.len() - 1]),
            Err(LexiconError::InvalidFormat(_))
        ));
        assert!(matches!(
            TEST.read_bytes(&buf[..10]),
            Err(LexiconError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_corrupted_payload() {
        let mut buf = framed(b"hello");
        let last = buf.len() - 1;
        buf[last] ^= 0x01;
        assert!(matches!(
            TEST.read_bytes(&buf),
            Err(LexiconError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_persist_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        TEST.persist(&path, b"first", true).unwrap();
        TEST.persist(&path, b"second", false).unwrap();
        assert_eq!(TEST.read_path(&path).unwrap().as_slice(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
