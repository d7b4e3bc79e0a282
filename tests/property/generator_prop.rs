use co2sim::{advance, next_value, Bounds, Draw, SimulationState};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Bounds plus a step that fits inside them
fn bounded_walk() -> impl Strategy<Value = (Bounds, i64)> {
    (-5_000i64..5_000, 1i64..20_000).prop_flat_map(|(lower, width)| {
        (Just(Bounds::new(lower, lower + width)), 1..=width)
    })
}

fn any_draw() -> impl Strategy<Value = Draw> {
    prop_oneof![Just(Draw::Up), Just(Draw::Hold)]
}

proptest! {
    #[test]
    fn test_at_or_above_upper_steps_down(
        (bounds, step) in bounded_walk(),
        excess in 0i64..50_000,
        draw in any_draw(),
    ) {
        let state = SimulationState::new(bounds.upper + excess, step, bounds);
        prop_assert_eq!(advance(&state, draw), state.current - step);
    }

    #[test]
    fn test_at_or_below_lower_steps_up(
        (bounds, step) in bounded_walk(),
        deficit in 0i64..50_000,
        draw in any_draw(),
    ) {
        let state = SimulationState::new(bounds.lower - deficit, step, bounds);
        prop_assert_eq!(advance(&state, draw), state.current + step);
    }

    #[test]
    fn test_walk_never_leaves_bounds(
        (bounds, step) in bounded_walk(),
        offset in 0i64..=20_000,
        seed in any::<u64>(),
    ) {
        let start = bounds.lower + offset % (bounds.width() + 1);
        let mut state = SimulationState::new(start, step, bounds);
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..500 {
            state.current = next_value(&state, &mut rng);
            prop_assert!(bounds.contains(state.current), "{} left {:?}", state.current, bounds);
        }
    }

    #[test]
    fn test_interior_moves_by_step_or_holds(
        (bounds, step) in bounded_walk(),
        draw in any_draw(),
    ) {
        // Only states with room for one step up are interior
        prop_assume!(bounds.lower + 1 + step <= bounds.upper);
        let state = SimulationState::new(bounds.lower + 1, step, bounds);
        let next = advance(&state, draw);
        match draw {
            Draw::Up => prop_assert_eq!(next, state.current + step),
            Draw::Hold => prop_assert_eq!(next, state.current),
        }
    }
}

#[test]
fn test_documented_scenarios() {
    let bounds = Bounds::new(0, 10_000);
    assert_eq!(advance(&SimulationState::new(9995, 10, bounds), Draw::Up), 9985);
    assert_eq!(advance(&SimulationState::new(0, 10, bounds), Draw::Hold), 10);
    assert_eq!(advance(&SimulationState::new(5999, 10, bounds), Draw::Up), 6009);
}
