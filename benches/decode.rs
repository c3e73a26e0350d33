use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use chaincrf::{BatchDecoder, Crf, EmissionBatch, EmissionMatrix, TransitionMatrix};

const NUM_TAGS: usize = 16;
const SEQ_LEN: usize = 64;
const BATCH_SIZE: usize = 128;

fn random_scores(rng: &mut StdRng, len: usize) -> Vec<f64> {
    (0..len).map(|_| rng.gen_range(-2.0..2.0)).collect()
}

fn setup() -> (Crf, EmissionMatrix, EmissionBatch, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(0);
    let crf = Crf::new(TransitionMatrix::with_rng(NUM_TAGS, &mut rng).unwrap());
    let scores = random_scores(&mut rng, SEQ_LEN * NUM_TAGS);
    let emission = EmissionMatrix::new(scores, NUM_TAGS).unwrap();
    let scores = random_scores(&mut rng, BATCH_SIZE * SEQ_LEN * NUM_TAGS);
    let batch = EmissionBatch::new(scores, BATCH_SIZE, NUM_TAGS).unwrap();
    let valid_lengths = (0..BATCH_SIZE)
        .map(|i| SEQ_LEN - i % (SEQ_LEN / 2))
        .collect();
    (crf, emission, batch, valid_lengths)
}

fn criterion_single(c: &mut Criterion) {
    let (crf, emission, _, _) = setup();
    let mut group = c.benchmark_group("single");
    group.bench_function("decode", |b| {
        b.iter(|| black_box(crf.decode(black_box(&emission)).unwrap()))
    });
    group.bench_function("score_all_paths", |b| {
        b.iter(|| black_box(crf.score_all_paths(black_box(&emission)).unwrap()))
    });
    group.finish();
}

fn criterion_batch(c: &mut Criterion) {
    let (crf, _, batch, valid_lengths) = setup();
    let mut group = c.benchmark_group("batch");
    group.bench_function("decode_batch", |b| {
        b.iter(|| black_box(crf.decode_batch(&batch, &valid_lengths).unwrap()))
    });
    for n_threads in [2, 4] {
        let decoder = BatchDecoder::new(&crf).n_threads(n_threads).unwrap();
        group.bench_with_input(
            BenchmarkId::new("batch_decoder", n_threads),
            &decoder,
            |b, decoder| b.iter(|| black_box(decoder.decode(&batch, &valid_lengths).unwrap())),
        );
    }
    group.finish();
}

criterion_group!(benches, criterion_single, criterion_batch);
criterion_main!(benches);
