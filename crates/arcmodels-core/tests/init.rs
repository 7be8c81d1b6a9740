use anyhow::Result;
use arcmodels_core::{
    fnv1a_32, initialize, name_seed, Error, SeedPolicy, TensorInitializer, WeightInit,
};
use proptest::prelude::*;

#[test]
fn fnv1a_matches_reference_vectors() {
    assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
    assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
    assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
}

#[test]
fn name_seeds_differ_per_model() {
    let a = name_seed("trading-signal");
    let b = name_seed("risk-scorer");
    assert_ne!(a, b);
    assert_eq!(a, name_seed("trading-signal"));
    assert_eq!(SeedPolicy::NameHash.resolve("risk-scorer"), u64::from(b));
    assert_eq!(SeedPolicy::Fixed(42).resolve("risk-scorer"), 42);
}

#[test]
fn xavier_values_stay_within_limit() -> Result<()> {
    let t = initialize("w", &[10, 16], 7, WeightInit::XavierUniform)?;
    let limit = (6.0f32 / 26.0).sqrt();
    let values = t.to_f32();
    assert_eq!(values.len(), 160);
    assert!(values.iter().all(|v| v.abs() <= limit));
    Ok(())
}

#[test]
fn xavier_requires_rank_two() {
    let err = initialize("w", &[4], 7, WeightInit::XavierUniform).unwrap_err();
    assert!(matches!(err, Error::Shape(_)));
}

#[test]
fn scaled_normal_is_small() -> Result<()> {
    let t = initialize("w", &[64, 64], 42, WeightInit::SMALL_NORMAL)?;
    let values = t.to_f32();
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    assert!(mean.abs() < 0.02, "mean {mean}");
    assert!(values.iter().all(|v| v.abs() < 1.0));
    Ok(())
}

#[test]
fn generator_is_threaded_across_draws() -> Result<()> {
    let mut init = TensorInitializer::new(42, WeightInit::SMALL_NORMAL);
    let first = init.weight("w1", &[2, 2])?;
    let second = init.weight("w2", &[2, 2])?;
    assert_ne!(first.to_f32(), second.to_f32());
    assert_eq!(first.to_f32(), initialize("w1", &[2, 2], 42, WeightInit::SMALL_NORMAL)?.to_f32());
    Ok(())
}

#[test]
fn bias_does_not_consume_randomness() -> Result<()> {
    let mut with_bias = TensorInitializer::new(3, WeightInit::XavierUniform);
    with_bias.weight("w1", &[3, 3])?;
    let bias = with_bias.bias("b1", 3)?;
    let w2 = with_bias.weight("w2", &[3, 3])?;

    let mut without = TensorInitializer::new(3, WeightInit::XavierUniform);
    without.weight("w1", &[3, 3])?;
    assert_eq!(w2.to_f32(), without.weight("w2", &[3, 3])?.to_f32());
    assert_eq!(bias.to_f32(), vec![0.0; 3]);
    Ok(())
}

proptest! {
    #[test]
    fn initialize_is_deterministic(
        seed in any::<u64>(),
        rows in 1usize..16,
        cols in 1usize..16,
        scale in 0.01f32..1.0,
    ) {
        for scheme in [
            WeightInit::Normal { scale },
            WeightInit::Uniform { scale },
            WeightInit::XavierUniform,
        ] {
            let a = initialize("w", &[rows, cols], seed, scheme).unwrap();
            let b = initialize("w", &[rows, cols], seed, scheme).unwrap();
            prop_assert_eq!(a.data, b.data);
        }
    }
}
