//! Property tests for the reference universe.
//!
//! Random sequences of births, steps, and forced relocations must always
//! leave a well-formed entity buffer behind: the reported pointer and count
//! address records that lie fully inside the memory region and decode to the
//! universe's own view of its lives.

use artlife_universe::prelude::*;
use artlife_universe::record::read_position;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Birth(Species, u32),
    Step,
    Relocate,
}

fn species_strategy() -> impl Strategy<Value = Species> {
    prop_oneof![
        Just(Species::Plant),
        Just(Species::Herbivore),
        Just(Species::Carnivore),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (species_strategy(), 0..40u32).prop_map(|(s, n)| Op::Birth(s, n)),
        Just(Op::Step),
        Just(Op::Relocate),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn entity_buffer_stays_addressable(
        seed in any::<u64>(),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let mut universe = NativeUniverse::new(160, 120, seed);
        let mut expected = 0usize;

        for op in ops {
            match op {
                Op::Birth(species, n) => {
                    universe.birth(species, n).unwrap();
                    expected += n as usize;
                }
                Op::Step => universe.step().unwrap(),
                Op::Relocate => universe.relocate(),
            }

            let count = universe.entity_count().unwrap();
            let ptr = universe.entity_buffer_ptr().unwrap();
            prop_assert_eq!(count, expected);
            prop_assert!(ptr + count * LIFE_RECORD_STRIDE <= universe.memory().len());

            let memory = universe.memory();
            for (i, life) in universe.lives().enumerate() {
                let at = ptr + i * LIFE_RECORD_STRIDE;
                prop_assert_eq!(read_position(&memory[at..]), Some((life.x, life.y)));
            }
        }
    }
}
