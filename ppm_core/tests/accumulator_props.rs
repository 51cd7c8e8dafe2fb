use ppm_core::DoseAccumulator;
use ppm_core::config::SamplingCfg;
use proptest::prelude::*;

proptest! {
    #[test]
    fn windows_complete_every_n_samples_and_never_lose_ppm(
        n in 1u32..=12,
        interval_ms in 1u64..=60_000,
        volume_ml in 1u16..=u16::MAX,
        currents in prop::collection::vec(-1_000.0f32..1_000.0, 0..120),
    ) {
        let mut acc = DoseAccumulator::new(&SamplingCfg {
            interval_ms,
            samples_per_window: n,
        });
        let mut last_ppm = acc.elapsed_ppm();

        for (i, current_ma) in currents.iter().enumerate() {
            let count = i as u32 + 1;
            let report = acc.push(*current_ma, volume_ml);

            prop_assert_eq!(report.is_some(), count % n == 0, "sample {}", count);
            prop_assert_eq!(acc.samples_in_window(), count % n);
            prop_assert_eq!(acc.windows_completed(), count / n);
            if let Some(r) = report {
                prop_assert!(r.elapsed_ppm >= last_ppm);
                prop_assert_eq!(r.elapsed_ppm, acc.elapsed_ppm());
            }
            prop_assert!(acc.elapsed_ppm() >= last_ppm);
            last_ppm = acc.elapsed_ppm();
        }
    }
}
