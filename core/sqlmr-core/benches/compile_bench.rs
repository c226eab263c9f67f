// SQL 컴파일 벤치마크
//
// 태스크마다 SQL을 다시 컴파일하므로 컴파일 비용이 곧 태스크 시작 비용

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sqlmr_core::SqlCompiler;

const QUERIES: &[(&str, &str)] = &[
    ("projection", "SELECT user.2, user.3 FROM user"),
    (
        "where_tree",
        "SELECT user.2 FROM user WHERE (user.3 = 'us' AND user.1 > '2') OR user.2 LIKE 'mat'",
    ),
    (
        "join_group_sort",
        "SELECT user.3, store.2, SUM(sale.4), AVG(sale.4) FROM sale \
         JOIN user ON sale.1 = user.1 JOIN store ON sale.3 = store.1 \
         WHERE sale.5 >= '10' GROUP BY user.3, store.2 ORDER BY 3 DESC, 1",
    ),
];

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let compiler = SqlCompiler::new();

    for (name, sql) in QUERIES {
        group.bench_function(format!("{name}_validated"), |b| {
            b.iter(|| compiler.compile(black_box(sql), true).unwrap())
        });
        // Tasks skip validation
        group.bench_function(format!("{name}_task"), |b| {
            b.iter(|| compiler.compile(black_box(sql), false).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
