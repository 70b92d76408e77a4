use proptest::prelude::*;
use tank_sensor_sim::{Channel, RandomDrift, SensorStateStore, SequenceDrift};

const SENSORS: [&str; 3] = ["SN-G-001", "CO-L-23B", "S3"];

proptest! {
    #[test]
    fn readings_never_leave_their_bounds(seed in any::<u64>(), ticks in 1usize..400) {
        let mut store = SensorStateStore::new(1, SENSORS, RandomDrift::seeded(seed)).unwrap();

        for _ in 0..ticks {
            let batch = store.advance_all();
            for reading in &batch.readings {
                for channel in Channel::ALL {
                    let limits = channel.limits();
                    let value = reading.get(channel);
                    prop_assert!(
                        limits.contains(value),
                        "{} of {} is {} outside [{}, {}]",
                        channel, reading.sensor_id, value, limits.lo, limits.hi
                    );
                }
            }
        }
    }

    #[test]
    fn one_tick_moves_at_most_half_a_step(
        draws in prop::collection::vec(-1.0f64..=1.0, 4..64),
        ticks in 1usize..200,
    ) {
        let mut store = SensorStateStore::new(1, ["S3"], SequenceDrift::new(draws)).unwrap();

        for _ in 0..ticks {
            let before = store.get("S3").unwrap().clone();
            let after = store.advance("S3").unwrap();
            for channel in Channel::ALL {
                let delta = (after.get(channel) - before.get(channel)).abs();
                prop_assert!(
                    delta <= channel.limits().step / 2.0 + 1e-9,
                    "{} moved {} in one tick", channel, delta
                );
            }
        }
    }

    #[test]
    fn extreme_draws_saturate_exactly(up in any::<bool>(), ticks in 1usize..300) {
        let draw = if up { 1.0 } else { -1.0 };
        let mut store = SensorStateStore::new(1, ["S3"], SequenceDrift::new(vec![draw])).unwrap();

        for _ in 0..ticks {
            let reading = store.advance("S3").unwrap();
            prop_assert!(reading.is_within_bounds());
        }
    }

    #[test]
    fn same_seed_same_batches(seed in any::<u64>(), ticks in 1usize..50) {
        let mut a = SensorStateStore::new(3, SENSORS, RandomDrift::seeded(seed)).unwrap();
        let mut b = SensorStateStore::new(3, SENSORS, RandomDrift::seeded(seed)).unwrap();

        for _ in 0..ticks {
            prop_assert_eq!(a.advance_all(), b.advance_all());
        }
    }
}
