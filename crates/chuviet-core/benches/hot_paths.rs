use chuviet_core::engine::Engine;
use chuviet_core::keys::{vk, VK_SPACE};
use chuviet_core::scheme::Method;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const TELEX_SENTENCE: &str = "tieengs vieetj laf ngoon nguwx cuar nguwowif vieetj nam";
const VNI_SENTENCE: &str = "tie6ng1 vie6t5 la2 ngo6n ngu74 cua3 ngu7o7i2 vie6t5 nam";

fn make_engine(method: Method) -> Engine {
    let mut engine = Engine::default();
    engine.set_method(method);
    engine
}

fn type_sentence(engine: &mut Engine, sentence: &str) {
    for c in sentence.chars() {
        black_box(engine.process_key(vk(c), false, false, false));
    }
    black_box(engine.process_key(VK_SPACE, false, false, false));
}

fn bench_telex_sentence(c: &mut Criterion) {
    let mut engine = make_engine(Method::Telex);
    c.bench_function("engine/telex_sentence", |b| {
        b.iter(|| type_sentence(&mut engine, TELEX_SENTENCE));
    });
}

fn bench_vni_sentence(c: &mut Criterion) {
    let mut engine = make_engine(Method::Vni);
    c.bench_function("engine/vni_sentence", |b| {
        b.iter(|| type_sentence(&mut engine, VNI_SENTENCE));
    });
}

fn bench_literal_passthrough(c: &mut Criterion) {
    let mut engine = make_engine(Method::Telex);
    c.bench_function("engine/literal_passthrough", |b| {
        b.iter(|| {
            black_box(engine.process_key(vk('b'), false, false, false));
            black_box(engine.process_key(VK_SPACE, false, false, false));
        });
    });
}

fn bench_boundary_with_shortcuts_and_restore(c: &mut Criterion) {
    let mut engine = make_engine(Method::Telex);
    engine.set_english_auto_restore(true);
    for i in 0..200 {
        engine
            .add_shortcut(&format!("s{i}"), "shortcut expansion")
            .expect("valid shortcut");
    }
    c.bench_function("engine/boundary_shortcut_restore", |b| {
        b.iter(|| type_sentence(&mut engine, "text vn s42"));
    });
}

criterion_group!(
    benches,
    bench_telex_sentence,
    bench_vni_sentence,
    bench_literal_passthrough,
    bench_boundary_with_shortcuts_and_restore
);
criterion_main!(benches);
