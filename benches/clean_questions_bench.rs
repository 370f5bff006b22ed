use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use syntax_tutor::clean_questions_text;

fn sample_quiz() -> String {
    let mut raw = String::from("## Тест по синтаксису Python\n\n**Часть 1**\n\n");
    for n in 1..=10 {
        raw.push_str(&format!(
            "{n}. Какой результат вернёт выражение номер {n}?\n   A) `None`\n   B) `True`\n   C) `False`\n   D) Ошибка\n\n"
        ));
    }
    raw.push_str("**Часть 2**\n\n");
    for n in 11..=15 {
        raw.push_str(&format!(
            "{n}. Напишите функцию, решающую задачу {n}.\nПример решения:\ndef solve():\n    pass\n\n"
        ));
    }
    raw
}

fn bench_clean_questions(c: &mut Criterion) {
    let raw = sample_quiz();

    c.bench_function("clean_questions_text", |b| {
        b.iter(|| black_box(clean_questions_text(black_box(&raw))));
    });
}

criterion_group!(benches, bench_clean_questions);
criterion_main!(benches);
