use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use plainword::{
    BaseVocabulary, Cutoff, EffectiveSubset, Glossary, classify, highlight, normalize,
};

fn base_vocabulary() -> BaseVocabulary {
    BaseVocabulary::from_words((0..1000).map(|idx| format!("common{idx}")))
        .expect("synthetic base words are valid")
}

fn glossary() -> Glossary {
    Glossary::new(
        (0..248)
            .map(|idx| vec![format!("term{idx}"), format!("term{idx}s")])
            .collect(),
    )
}

fn sample_text(words: usize) -> String {
    (0..words)
        .map(|idx| match idx % 4 {
            0 => format!("Common{}'s", idx % 1000),
            1 => format!("term{}-common{}", idx % 300, idx % 7),
            2 => format!("unknown{idx}."),
            _ => format!("TERM{}S,", idx % 248),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_normalize(c: &mut Criterion) {
    const TOKENS: &[&str] = &["dog's", "Well-Known", "\"Quarks,\"", "boss's's"];
    for &token in TOKENS {
        c.bench_with_input(BenchmarkId::new("normalize", token), &token, |b, &token| {
            b.iter(|| black_box(normalize(token)));
        });
    }
}

fn bench_classify(c: &mut Criterion) {
    let base = base_vocabulary();
    let glossary = glossary();
    let subset = EffectiveSubset::of(&glossary, Cutoff::default());
    c.bench_function("classify::allowed_and_flagged", |b| {
        b.iter(|| {
            black_box(classify("common500", &subset, &base));
            black_box(classify("term247s", &subset, &base));
            black_box(classify("photosynthesis", &subset, &base));
        });
    });
}

fn bench_highlight(c: &mut Criterion) {
    let base = base_vocabulary();
    let glossary = glossary();
    for &(words, cutoff) in &[(500usize, 248i64), (3000, 248), (3000, 20)] {
        let text = sample_text(words);
        let subset = EffectiveSubset::of(&glossary, Cutoff::new(cutoff));
        let label = format!("{words}_words_cutoff_{cutoff}");
        c.bench_with_input(BenchmarkId::new("highlight", label), &text, |b, text| {
            b.iter(|| {
                let annotated = highlight(text, &subset, &base);
                black_box(annotated.render_html());
            });
        });
    }
}

criterion_group!(benches, bench_normalize, bench_classify, bench_highlight);
criterion_main!(benches);
