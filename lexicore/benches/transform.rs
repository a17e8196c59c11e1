//! 文字マッパーによる正規化のベンチマーク
//!
//! 全角英数字とかなを含むテキストを1文字ずつ変換する速度を計測します。

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use lexicore::mapper::{CharMapper, NOT_ALLOWED};

const RULES: &str = "0..9, a..z, A..Z->a..z, ０..９->0..9, Ａ..Ｚ->a..z, ａ..ｚ->a..z, \
                     U+3041..U+3096, U+30A1..U+30FA, U+0100..U+017F/2";

fn corpus() -> Vec<char> {
    "吾輩はネコである。名前はまだ無い。Ｒｕｓｔ２０２４とRust 2024。Āā Ēē"
        .repeat(256)
        .chars()
        .collect()
}

fn bench_transform(c: &mut Criterion) {
    let mut mapper = CharMapper::new(false);
    mapper.apply_rules(RULES, 1).unwrap();
    let input = corpus();

    let mut group = c.benchmark_group("CharMapper");
    group.throughput(Throughput::Elements(input.len() as u64));

    group.bench_function("transform_char", |b| {
        b.iter(|| {
            let mut allowed = 0usize;
            for &ch in &input {
                if mapper.transform_char(black_box(ch)).is_some() {
                    allowed += 1;
                }
            }
            allowed
        })
    });

    group.bench_function("transform_raw", |b| {
        b.iter(|| {
            let mut tag = 0;
            let mut allowed = 0usize;
            for &ch in &input {
                if mapper.transform_raw(black_box(u32::from(ch)), &mut tag) != NOT_ALLOWED {
                    allowed += 1;
                }
            }
            allowed
        })
    });

    group.finish();
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);
