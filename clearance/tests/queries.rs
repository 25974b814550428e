use std::f64::consts::FRAC_PI_2;

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use clearance::{
    distance_point_to_region, distance_region_to_region, min_clearance, ConvexPolygon,
    ConvexRegion, Distance, GeomError, Pt2D, Rectangle, Region, Scenario, SolverSettings,
};

fn rect(left: f64, right: f64, down: f64, up: f64) -> Rectangle {
    Rectangle::new(left, right, down, up).unwrap()
}

fn random_rect(rng: &mut XorShiftRng) -> Rectangle {
    let left = rng.gen_range(-5.0..5.0);
    let down = rng.gen_range(-5.0..5.0);
    rect(
        left,
        left + rng.gen_range(0.1..3.0),
        down,
        down + rng.gen_range(0.1..3.0),
    )
}

// The exact answer for axis-aligned boxes, to check the solver against.
fn box_distance(r1: &Rectangle, r2: &Rectangle) -> f64 {
    let dx = (r2.left() - r1.right()).max(r1.left() - r2.right()).max(0.0);
    let dy = (r2.down() - r1.up()).max(r1.down() - r2.up()).max(0.0);
    dx.hypot(dy)
}

#[test]
fn unit_square_to_point() {
    let r1 = rect(0.0, 1.0, 0.0, 1.0);
    let result =
        distance_point_to_region(Pt2D::new(2.0, 0.5), &r1, &SolverSettings::default()).unwrap();
    assert!(result.distance.approx_eq(Distance::meters(1.0), 1e-6));
    assert!(result.closest_b.approx_eq(Pt2D::new(1.0, 0.5), 1e-6));
}

#[test]
fn unit_square_to_neighbor() {
    let r1 = rect(0.0, 1.0, 0.0, 1.0);
    let r2 = rect(2.0, 3.0, 0.0, 1.0);
    let result = distance_region_to_region(&r1, &r2, &SolverSettings::default()).unwrap();
    assert!(result.distance.approx_eq(Distance::meters(1.0), 1e-6));
    assert!((result.closest_a.x() - 1.0).abs() < 1e-6);
    assert!((result.closest_b.x() - 2.0).abs() < 1e-6);
}

#[test]
fn inverted_rectangle() {
    assert!(matches!(
        Rectangle::new(1.0, 0.0, 0.0, 1.0),
        Err(GeomError::InvalidGeometry(_))
    ));
}

#[test]
fn rectangle_corners_touch_two_edges() {
    let mut rng = XorShiftRng::seed_from_u64(42);
    for _ in 0..100 {
        let r = random_rect(&mut rng);
        let halfspaces = r.halfspace_representation();
        for (idx, corner) in r.corners().iter().enumerate() {
            let violations: Vec<f64> = halfspaces
                .rows()
                .iter()
                .map(|row| row.violation(*corner))
                .collect();
            assert!(violations.iter().all(|v| *v <= 0.0), "{} of {}", corner, r);
            // Corners go bottom-left, bottom-right, top-right, top-left, and the rows go left,
            // down, right, up.
            let expected_active = match idx {
                0 => [0, 1],
                1 => [1, 2],
                2 => [2, 3],
                _ => [0, 3],
            };
            for (row, v) in violations.iter().enumerate() {
                assert_eq!(expected_active.contains(&row), *v == 0.0, "{} of {}", corner, r);
            }
        }
    }
}

#[test]
fn points_inside_are_zero() {
    let mut rng = XorShiftRng::seed_from_u64(42);
    let settings = SolverSettings::default();
    for _ in 0..100 {
        let r = random_rect(&mut rng);
        let pt = Pt2D::new(
            rng.gen_range(r.left()..r.right()),
            rng.gen_range(r.down()..r.up()),
        );
        let result = distance_point_to_region(pt, &r, &settings).unwrap();
        assert_eq!(Distance::ZERO, result.distance);
        assert_eq!(pt, result.closest_b);
    }
}

#[test]
fn points_outside_project_onto_the_boundary() {
    let mut rng = XorShiftRng::seed_from_u64(42);
    let settings = SolverSettings::default();
    for _ in 0..100 {
        let r = random_rect(&mut rng);
        let x = if rng.gen_bool(0.5) {
            r.left() - rng.gen_range(0.01..2.0)
        } else {
            r.right() + rng.gen_range(0.01..2.0)
        };
        // Sometimes outside in both directions, sometimes just one
        let y = rng.gen_range((r.down() - 2.0)..(r.up() + 2.0));
        let pt = Pt2D::new(x, y);

        let result = distance_point_to_region(pt, &r, &settings).unwrap();
        let dx = (r.left() - x).max(x - r.right()).max(0.0);
        let dy = (r.down() - y).max(y - r.up()).max(0.0);
        assert!(result.distance > Distance::ZERO);
        assert!(
            result.distance.approx_eq(Distance::meters(dx.hypot(dy)), 1e-6),
            "{} to {} gave {}",
            pt,
            r,
            result.distance
        );

        let violations: Vec<f64> = r
            .halfspace_representation()
            .rows()
            .iter()
            .map(|row| row.violation(result.closest_b))
            .collect();
        assert!(violations.iter().all(|v| *v <= 1e-6));
        assert!(violations.iter().any(|v| v.abs() <= 1e-6));
    }
}

#[test]
fn symmetric_and_exact_for_separated_boxes() {
    let mut rng = XorShiftRng::seed_from_u64(42);
    let settings = SolverSettings::default();
    for _ in 0..100 {
        let r1 = random_rect(&mut rng);
        let gap = rng.gen_range(0.05..2.0);
        let width = rng.gen_range(0.1..3.0);
        let down = rng.gen_range((r1.down() - 4.0)..(r1.up() + 4.0));
        let r2 = rect(
            r1.right() + gap,
            r1.right() + gap + width,
            down,
            down + rng.gen_range(0.1..3.0),
        );

        let forwards = distance_region_to_region(&r1, &r2, &settings).unwrap();
        let backwards = distance_region_to_region(&r2, &r1, &settings).unwrap();
        let expected = Distance::meters(box_distance(&r1, &r2));
        assert!(forwards.distance.approx_eq(expected, 1e-6), "{} to {}", r1, r2);
        assert!(backwards.distance.approx_eq(expected, 1e-6), "{} to {}", r2, r1);
        assert!(forwards.distance.approx_eq(backwards.distance, 1e-6));
        assert!(r1.halfspace_representation().contains(forwards.closest_a));
        assert!(r2.halfspace_representation().contains(forwards.closest_b));
    }
}

#[test]
fn overlapping_boxes_are_zero() {
    let mut rng = XorShiftRng::seed_from_u64(42);
    let settings = SolverSettings::default();
    for _ in 0..100 {
        let r1 = random_rect(&mut rng);
        // Start strictly inside r1, so they share interior points
        let left = r1.left() + 0.05 * r1.width();
        let down = r1.down() + 0.05 * r1.height();
        let r2 = rect(
            left,
            left + rng.gen_range(0.05..3.0),
            down,
            down + rng.gen_range(0.05..3.0),
        );
        for result in [
            distance_region_to_region(&r1, &r2, &settings).unwrap(),
            distance_region_to_region(&r2, &r1, &settings).unwrap(),
        ] {
            assert_eq!(Distance::ZERO, result.distance, "{} and {}", r1, r2);
        }
    }
}

#[test]
fn footprint_vertices_touch_their_edges() {
    let triangle = ConvexPolygon::new(vec![
        Pt2D::new(0.14, 0.0),
        Pt2D::new(-0.03, 0.05),
        Pt2D::new(-0.03, -0.05),
    ])
    .unwrap();
    let pentagon = ConvexPolygon::new(vec![
        Pt2D::new(0.15, 0.0),
        Pt2D::new(0.03, 0.05),
        Pt2D::new(-0.01, 0.02),
        Pt2D::new(-0.01, -0.02),
        Pt2D::new(0.03, -0.05),
    ])
    .unwrap();
    let rectangle = ConvexPolygon::rectangle_footprint(0.15, 0.06, 0.1).unwrap();

    for footprint in [triangle, pentagon, rectangle] {
        let n = footprint.points().len();
        let halfspaces = footprint.placed(1.0, -2.0, 0.7).halfspace_representation();
        assert_eq!(n, halfspaces.len());
        for (idx, pt) in footprint.placed(1.0, -2.0, 0.7).points().iter().enumerate() {
            for (row_idx, row) in halfspaces.rows().iter().enumerate() {
                let v = row.violation(*pt);
                // Vertex i starts edge i and ends edge i - 1
                if row_idx == idx || row_idx == (idx + n - 1) % n {
                    assert!(v.abs() < 1e-12);
                } else {
                    assert!(v < 0.0);
                }
            }
        }
    }
}

#[test]
fn placed_footprints() {
    let triangle = ConvexPolygon::new(vec![
        Pt2D::new(0.14, 0.0),
        Pt2D::new(-0.03, 0.05),
        Pt2D::new(-0.03, -0.05),
    ])
    .unwrap();
    let settings = SolverSettings::default();

    // Facing +x, the tip is 0.1 from the box
    let ahead = rect(0.24, 0.5, -0.1, 0.1);
    let result =
        distance_region_to_region(&triangle.placed(0.0, 0.0, 0.0), &ahead, &settings).unwrap();
    assert!(result.distance.approx_eq(Distance::meters(0.1), 1e-6));
    assert!(result.closest_a.approx_eq(Pt2D::new(0.14, 0.0), 1e-5));

    // Turned to face +y
    let above = rect(-0.1, 0.1, 0.3, 0.5);
    let result =
        distance_region_to_region(&triangle.placed(0.0, 0.0, FRAC_PI_2), &above, &settings)
            .unwrap();
    assert!(result.distance.approx_eq(Distance::meters(0.16), 1e-6));

    // And moved right into it
    let result =
        distance_region_to_region(&triangle.placed(0.0, 0.35, FRAC_PI_2), &above, &settings)
            .unwrap();
    assert_eq!(Distance::ZERO, result.distance);
}

#[test]
fn mixed_regions_behind_the_trait() {
    let regions: Vec<Box<dyn ConvexRegion>> = vec![
        Box::new(rect(0.0, 1.0, 0.0, 1.0)),
        Box::new(Region::from(rect(3.0, 4.0, 0.0, 1.0))),
        Box::new(rect(0.0, 1.0, 5.0, 6.0).to_polygon()),
    ];
    let settings = SolverSettings::default();
    let pt = Pt2D::new(2.0, 0.5);
    let distances: Vec<f64> = regions
        .iter()
        .map(|r| {
            distance_point_to_region(pt, r.as_ref(), &settings)
                .unwrap()
                .distance
                .inner_meters()
        })
        .collect();
    assert!((distances[0] - 1.0).abs() < 1e-6);
    assert!((distances[1] - 1.0).abs() < 1e-6);
    assert!((distances[2] - 1.0_f64.hypot(4.5)).abs() < 1e-6);

    let between = distance_region_to_region(regions[0].as_ref(), regions[2].as_ref(), &settings)
        .unwrap();
    assert!(between.distance.approx_eq(Distance::meters(4.0), 1e-6));
}

#[test]
fn diverges_with_no_budget() {
    let settings = SolverSettings {
        max_iterations: 1,
        ..Default::default()
    };
    let err = distance_point_to_region(Pt2D::new(5.0, 5.0), &rect(0.0, 1.0, 0.0, 1.0), &settings)
        .unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(err, GeomError::SolverDiverged { .. }));
}

#[test]
fn footprint_in_the_maze() {
    let maze = Scenario::maze().unwrap();
    let footprint = ConvexPolygon::rectangle_footprint(0.15, 0.06, 0.1).unwrap();
    let results = maze
        .clearances_from_footprint(&footprint, (0.1, 0.9, -FRAC_PI_2), &SolverSettings::default())
        .unwrap();
    assert_eq!(maze.obstacles.len(), results.len());
    let (_, nearest) = min_clearance(&results).unwrap();
    assert!(nearest.distance.approx_eq(Distance::meters(0.07), 1e-6));
}

#[test]
fn touching_is_zero() {
    let settings = SolverSettings::default();
    let unit = rect(0.0, 1.0, 0.0, 1.0);
    let cases = vec![
        ("shared edge", rect(1.0, 2.0, 0.0, 1.0)),
        ("shared corner", rect(1.0, 2.0, 1.0, 2.0)),
        ("partial edge", rect(0.5, 3.0, 1.0, 4.0)),
    ];
    for (name, other) in cases {
        for result in [
            distance_region_to_region(&unit, &other, &settings).unwrap(),
            distance_region_to_region(&other, &unit, &settings).unwrap(),
        ] {
            assert_eq!(Distance::ZERO, result.distance, "{}", name);
            assert_eq!(0, result.iterations, "{}", name);
        }
    }

    // Neither region's interior witness lies in the other
    let long = rect(0.0, 10.0, 0.0, 1.0);
    let tall = rect(9.0, 20.0, 0.5, 3.0);
    let result = distance_region_to_region(&long, &tall, &settings).unwrap();
    assert_eq!(Distance::ZERO, result.distance);

    let triangle = ConvexPolygon::new(vec![
        Pt2D::new(0.14, 0.0),
        Pt2D::new(-0.03, 0.05),
        Pt2D::new(-0.03, -0.05),
    ])
    .unwrap();
    let result = distance_region_to_region(
        &triangle.placed(0.0, 0.0, 0.0),
        &rect(0.14, 0.5, -0.1, 0.1),
        &settings,
    )
    .unwrap();
    assert_eq!(Distance::ZERO, result.distance);
    assert!(result.closest_a.approx_eq(Pt2D::new(0.14, 0.0), 1e-9));
}

#[test]
fn touching_maze_walls() {
    let maze = Scenario::maze().unwrap();
    let settings = SolverSettings::default();
    // The bottom-left block and the left wall share a side
    let result =
        distance_region_to_region(&maze.obstacles[0], &maze.obstacles[14], &settings).unwrap();
    assert_eq!(Distance::ZERO, result.distance);

    // At the start pose, the back of the car is flush against the top wall
    let footprint = ConvexPolygon::rectangle_footprint(0.15, 0.06, 0.1).unwrap();
    let results = maze
        .clearances_from_footprint(
            &footprint,
            (maze.start.x(), maze.start.y(), maze.start_heading),
            &settings,
        )
        .unwrap();
    let (_, nearest) = min_clearance(&results).unwrap();
    assert_eq!(Distance::ZERO, nearest.distance);
}

#[test]
fn random_touching_boxes() {
    let mut rng = XorShiftRng::seed_from_u64(42);
    let settings = SolverSettings::default();
    for _ in 0..100 {
        let r1 = random_rect(&mut rng);
        let height = rng.gen_range(0.1..3.0);
        // Flush against the right side, sometimes only at a corner
        let down = if rng.gen_bool(0.2) {
            r1.up()
        } else {
            rng.gen_range((r1.down() - height + 0.01)..r1.up())
        };
        let r2 = rect(
            r1.right(),
            r1.right() + rng.gen_range(0.1..3.0),
            down,
            down + height,
        );
        for result in [
            distance_region_to_region(&r1, &r2, &settings).unwrap(),
            distance_region_to_region(&r2, &r1, &settings).unwrap(),
        ] {
            assert_eq!(Distance::ZERO, result.distance, "{} and {}", r1, r2);
        }
    }
}

#[test]
fn random_touching_footprints() {
    let mut rng = XorShiftRng::seed_from_u64(42);
    let settings = SolverSettings::default();
    let footprints = vec![
        ConvexPolygon::new(vec![
            Pt2D::new(0.14, 0.0),
            Pt2D::new(-0.03, 0.05),
            Pt2D::new(-0.03, -0.05),
        ])
        .unwrap(),
        ConvexPolygon::new(vec![
            Pt2D::new(0.15, 0.0),
            Pt2D::new(0.03, 0.05),
            Pt2D::new(-0.01, 0.02),
            Pt2D::new(-0.01, -0.02),
            Pt2D::new(0.03, -0.05),
        ])
        .unwrap(),
        ConvexPolygon::rectangle_footprint(0.15, 0.06, 0.1).unwrap(),
    ];
    for _ in 0..100 {
        let footprint = &footprints[rng.gen_range(0..footprints.len())];
        let placed = footprint.placed(
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-3.0..3.0),
        );
        // A box flush against the rightmost vertex
        let tip = placed
            .points()
            .iter()
            .cloned()
            .max_by(|a, b| a.x().partial_cmp(&b.x()).unwrap())
            .unwrap();
        let wall = rect(tip.x(), tip.x() + 0.5, tip.y() - 0.2, tip.y() + 0.2);
        let result = distance_region_to_region(&placed, &wall, &settings).unwrap();
        assert_eq!(Distance::ZERO, result.distance, "{} and {}", placed, wall);

        // And nudged away by a hair
        let gap = 10.0_f64.powf(rng.gen_range(-7.0..-1.0));
        let wall = rect(tip.x() + gap, tip.x() + 0.5, tip.y() - 0.2, tip.y() + 0.2);
        let result = distance_region_to_region(&placed, &wall, &settings).unwrap();
        let expected = wall.left() - tip.x();
        assert!(
            (result.distance.inner_meters() - expected).abs() <= 1e-9,
            "expected {}, got {}",
            expected,
            result.distance
        );
    }
}

#[test]
fn tiny_gaps_are_exact() {
    let mut rng = XorShiftRng::seed_from_u64(42);
    let settings = SolverSettings::default();
    for _ in 0..100 {
        let left = rng.gen_range(-1.0..1.0);
        let down = rng.gen_range(-1.0..1.0);
        let r1 = rect(
            left,
            left + rng.gen_range(0.1..1.0),
            down,
            down + rng.gen_range(0.1..1.0),
        );
        let gap = 10.0_f64.powf(rng.gen_range(-8.0..-1.0));

        let pt = Pt2D::new(r1.right() + gap, rng.gen_range(r1.down()..r1.up()));
        let result = distance_point_to_region(pt, &r1, &settings).unwrap();
        let expected = pt.x() - r1.right();
        assert!(
            (result.distance.inner_meters() - expected).abs() <= 1e-9,
            "{} to {}: expected {}, got {}",
            pt,
            r1,
            expected,
            result.distance
        );

        let down = rng.gen_range((r1.down() - 1.0)..(r1.up() + 1.0));
        let r2 = rect(r1.right() + gap, r1.right() + 1.0, down, down + 1.0);
        let expected = box_distance(&r1, &r2);
        for result in [
            distance_region_to_region(&r1, &r2, &settings).unwrap(),
            distance_region_to_region(&r2, &r1, &settings).unwrap(),
        ] {
            assert!(
                (result.distance.inner_meters() - expected).abs() <= 1e-9,
                "{} and {}: expected {}, got {}",
                r1,
                r2,
                expected,
                result.distance
            );
        }
    }
}
