use criterion::{criterion_group, criterion_main, Criterion};
use crossword_analyzer::{
    generate_all_cross_sets, GenParams, Klv, KwgBuilder, LetterDistribution, MoveGen, RecordMode,
    SortBy,
};

const WORDS: &[&str] = &[
    "QI", "QIS", "ZA", "ZAS", "AB", "ABS", "BA", "BAS", "CAB", "CABS", "CARE", "CARES", "SCARE",
    "ES", "AA", "AAS", "AI", "AIS", "REST", "RUST", "RUSTS", "STAB", "TABS", "BATS", "STAR",
    "RATS", "ARTS", "TSAR",
];

fn bench_generate(c: &mut Criterion) {
    let ld = LetterDistribution::english();
    let kwg = KwgBuilder::from_words(WORDS, &ld).unwrap().build();
    let klv = Klv::zeroed();
    let mut board = crossword_analyzer::Board::default();
    for (i, &ml) in ld.string_to_letters("CARES").unwrap().iter().enumerate() {
        board.set_letter(7, 5 + i, ml);
        board.add_tiles_played(1);
    }
    board.update_all_anchors();
    generate_all_cross_sets(&mut board, &kwg, &ld);
    let rack = ld.rack_from_string("ABSTIQZ").unwrap();

    c.bench_function("movegen.generate_all", |b| {
        let mut gen = MoveGen::new(RecordMode::All, SortBy::Equity);
        b.iter(|| {
            let mut rack = rack.clone();
            let mut params = GenParams {
                board: &mut board,
                rack: &mut rack,
                opp_rack: None,
                kwg: &kwg,
                klv: &klv,
                ld: &ld,
                bag_count: 70,
                include_exchanges: true,
            };
            gen.generate(&mut params);
            gen.move_list.len()
        })
    });

    c.bench_function("movegen.generate_best", |b| {
        let mut gen = MoveGen::new(RecordMode::Best, SortBy::Equity);
        b.iter(|| {
            let mut rack = rack.clone();
            let mut params = GenParams {
                board: &mut board,
                rack: &mut rack,
                opp_rack: None,
                kwg: &kwg,
                klv: &klv,
                ld: &ld,
                bag_count: 70,
                include_exchanges: false,
            };
            gen.generate(&mut params);
            gen.move_list.len()
        })
    });
}

fn bench_cross_sets(c: &mut Criterion) {
    let ld = LetterDistribution::english();
    let kwg = KwgBuilder::from_words(WORDS, &ld).unwrap().build();
    let mut board = crossword_analyzer::Board::default();
    for (i, &ml) in ld.string_to_letters("CARES").unwrap().iter().enumerate() {
        board.set_letter(7, 5 + i, ml);
        board.add_tiles_played(1);
    }
    board.update_all_anchors();
    c.bench_function("board.generate_all_cross_sets", |b| {
        b.iter(|| generate_all_cross_sets(&mut board, &kwg, &ld))
    });
}

fn criterion_benchmark(c: &mut Criterion) {
    bench_generate(c);
    bench_cross_sets(c);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
