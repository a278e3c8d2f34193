use criterion::{Criterion, black_box, criterion_group, criterion_main};
use levport::{LevportConfig, translate};

fn level_source(rooms: usize) -> String {
    let mut source = String::from("des.level_init({ style = \"solidfill\", fg = \" \" })\n");
    source.push_str("local kinds = { \"ordinary\", \"throne\", \"zoo\" }\n");
    for i in 0..rooms {
        source.push_str(&format!(
            "des.room({{ type = kinds[{}], x = math.random(1, 70), y = rn2({}) + 1 }})\n",
            i % 3 + 1,
            i % 20 + 1
        ));
        source.push_str(&format!(
            "if percent({}) then des.object(\"boulder\") elseif d(2, 6) > 7 then des.trap() end\n",
            i % 100
        ));
    }
    source.push_str("for _, k in ipairs(kinds) do des.monster(k) end\n");
    source
}

fn bench_parse(c: &mut Criterion) {
    let source = level_source(200);
    c.bench_function("parse_200_rooms", |b| {
        b.iter(|| levport_syntax::parse_source(black_box(&source)))
    });
}

fn bench_translate(c: &mut Criterion) {
    let config = LevportConfig::default();
    let mut group = c.benchmark_group("translate");
    for rooms in [10, 200] {
        let source = level_source(rooms);
        group.bench_function(format!("{rooms}_rooms"), |b| {
            b.iter(|| translate(black_box(&source), "bench.lua", &config))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_translate);
criterion_main!(benches);
