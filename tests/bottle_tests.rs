//! End-to-end tests for the physics side of the bottle.

use approx::assert_relative_eq;
use lavabottle::{Bottle, BottleConfig, GravitySchedule, Vec2};

fn seeded(seed: u64) -> Bottle {
    Bottle::new(BottleConfig::default().with_seed(seed)).unwrap()
}

// ============================================================================
// Containment
// ============================================================================

#[test]
fn test_balls_stay_inside_after_many_ticks() {
    let mut bottle = seeded(42);
    let config = bottle.config().clone();
    let half = Vec2::new(config.width, config.height) / 2.0;

    // several full gravity flips
    let ticks = (3.0 * config.flip_period / config.dt) as usize;
    for _ in 0..ticks {
        bottle.step();
    }

    assert_eq!(bottle.ball_count(), config.ball_count);
    for (i, position) in bottle.ball_positions().into_iter().enumerate() {
        assert!(position.is_finite(), "ball {i} is not finite: {position:?}");
        assert!(
            position.x.abs() < half.x && position.y.abs() < half.y,
            "ball {i} escaped to {position:?}"
        );
    }
}

#[test]
fn test_same_seed_same_run() {
    let mut a = seeded(7);
    let mut b = seeded(7);
    for _ in 0..60 {
        a.step();
        b.step();
    }
    assert_eq!(a.ball_positions(), b.ball_positions());
    assert_eq!(a.ticks(), 60);
    assert_relative_eq!(a.sim_time(), 2.0, epsilon = 1e-6);
}

#[test]
fn test_small_bottle() {
    let config = BottleConfig::default()
        .with_ball_count(10)
        .with_ball_radius(0.5)
        .with_seed(3);
    let mut bottle = Bottle::new(config).unwrap();
    for _ in 0..30 {
        bottle.step();
    }
    let mut packed = Vec::new();
    bottle.pack_positions(&mut packed);
    assert_eq!(packed.len(), 10);
}

// ============================================================================
// Gravity schedule
// ============================================================================

#[test]
fn test_gravity_repeats_every_period() {
    let schedule = GravitySchedule {
        nominal: Vec2::new(0.0, -20.0),
        period: 5.5,
    };
    for t in [0.3, 1.0, 2.0, 3.5, 4.9] {
        assert_eq!(schedule.sample(t), schedule.sample(t + 5.5), "t = {t}");
        assert_eq!(schedule.sample(t), -schedule.sample(t + 2.75), "t = {t}");
    }
}

#[test]
fn test_gravity_starts_nominal() {
    let schedule = GravitySchedule {
        nominal: Vec2::new(0.0, -20.0),
        period: 5.5,
    };
    assert_eq!(schedule.sample(0.0), Vec2::new(0.0, -20.0));
    assert_eq!(schedule.sample(4.0), Vec2::new(0.0, 20.0));
}
