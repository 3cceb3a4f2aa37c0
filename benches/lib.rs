//! # IAS 性能基准测试
//!
//! 使用 Criterion.rs 进行性能基准测试。
//!
//! ## 基准测试分组
//! - `classify`: 逐行补全判断（多行语句越长，每行重新解析的代价越高）
//! - `session`: 完整的读取、判断、求值循环
//!
//! ## 使用方法
//! ```bash
//! cargo bench            # 运行所有
//! cargo bench classify   # 只运行补全判断
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ias::repl::classify::classify_source;
use ias::repl::{EngineFactory, MockTransport, Session};
use ias::runtime::{Interpreter, RecordingBoard};
use ias::ShellConfig;
use std::hint::black_box;

fn quiet_logs() {
    // 禁用日志以减少噪音
    let _ = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(tracing::Level::ERROR)
        .try_init();
}

/// A method definition with `n` body lines
fn method_source(n: usize) -> Vec<String> {
    let mut lines = vec!["def work(list)".to_string()];
    for i in 0..n {
        lines.push(format!("  list = list.map {{ |v| v * {} + 1 }}", i));
    }
    lines.push("end".to_string());
    lines
}

// ============================================================================
// Classification - 补全判断
// ============================================================================

fn bench_classify_growing_statement(c: &mut Criterion) {
    quiet_logs();
    let engine = Interpreter::new(Box::new(RecordingBoard::new())).unwrap();
    let mut group = c.benchmark_group("classify");
    for n in [4usize, 16, 64] {
        let lines = method_source(n);
        group.bench_with_input(BenchmarkId::new("line_by_line", n), &lines, |b, lines| {
            b.iter(|| {
                let mut text = String::new();
                for line in lines {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(line);
                    black_box(classify_source(&engine, &text));
                }
            })
        });
    }
    group.finish();
}

fn bench_classify_heredoc(c: &mut Criterion) {
    quiet_logs();
    let engine = Interpreter::new(Box::new(RecordingBoard::new())).unwrap();
    let mut text = String::from("doc = <<~EOS\n");
    for i in 0..200 {
        text.push_str(&format!("  line {} with #{{i}} interpolation\n", i));
    }
    c.bench_function("classify_open_heredoc", |b| {
        b.iter(|| black_box(classify_source(&engine, black_box(&text))))
    });
}

// ============================================================================
// Session - 完整循环
// ============================================================================

fn bench_session_round_trip(c: &mut Criterion) {
    quiet_logs();
    let mut input = String::new();
    for line in method_source(8) {
        input.push_str(&line);
        input.push('\r');
    }
    input.push_str("work([1, 2, 3]).sum\r");
    c.bench_function("session_define_and_call", |b| {
        b.iter(|| {
            let factory: EngineFactory<Interpreter> =
                Box::new(|| Interpreter::new(Box::new(RecordingBoard::new())));
            let config = ShellConfig {
                banner: false,
                ..ShellConfig::default()
            };
            let mut session = Session::new(config, factory).unwrap();
            let mut transport = MockTransport::new(&input);
            session.run(&mut transport).unwrap();
            black_box(transport.output().len())
        })
    });
}

criterion_group!(
    classify,
    bench_classify_growing_statement,
    bench_classify_heredoc
);
criterion_group!(session, bench_session_round_trip);
criterion_main!(classify, session);
