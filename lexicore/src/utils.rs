//! ユーティリティ関数と型変換トレイトを提供するモジュール

/// u32から他の型への変換を提供するトレイト
///
/// 標準ライブラリのFromトレイトとは異なり、ポインタ幅の仮定に基づく
/// 最適化を行うことができます。
pub trait FromU32 {
    /// u32値から実装型を生成する
    fn from_u32(src: u32) -> Self;
}

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl FromU32 for usize {
    /// u32値をusizeに変換する
    ///
    /// ポインタ幅が32ビットまたは64ビットであることが保証されているため、
    /// この変換は常に成功します。
    #[inline(always)]
    fn from_u32(src: u32) -> Self {
        // Since the pointer width is guaranteed to be 32 or 64,
        // the following process always succeeds.
        unsafe { Self::try_from(src).unwrap_unchecked() }
    }
}
