use palisade::{BasicMap, BasicSet, Map, Set, Space};

fn bset(space: Space, eqs: &[&[i64]], ineqs: &[&[i64]]) -> BasicSet {
    BasicSet::from_rows(space, eqs, ineqs).unwrap()
}

fn interval(lo: i64, hi: i64) -> BasicSet {
    bset(Space::set_space(0, 1), &[], &[&[-lo, 1], &[hi, -1]])
}

fn point2(x: i64, y: i64) -> BasicSet {
    bset(Space::set_space(0, 2), &[&[-x, 1, 0], &[-y, 0, 1]], &[])
}

#[test]
fn hull_of_overlapping_intervals() {
    let set = Set::from_basic_set(interval(0, 5))
        .add_basic_set(interval(3, 10))
        .unwrap();
    let hull = set.convex_hull().unwrap();
    assert!(hull.is_equal(&interval(0, 10)).unwrap());
}

#[test]
fn hull_of_three_points_is_a_triangle() {
    let set = Set::from_basic_set(point2(0, 0))
        .add_basic_set(point2(1, 0))
        .unwrap()
        .add_basic_set(point2(0, 1))
        .unwrap();
    let hull = set.clone().convex_hull().unwrap();

    let triangle = bset(
        Space::set_space(0, 2),
        &[],
        &[&[0, 1, 0], &[0, 0, 1], &[1, -1, -1]],
    );
    assert!(hull.is_equal(&triangle).unwrap());
    assert!(set.is_subset(&hull).unwrap());
}

#[test]
fn hull_of_opposite_rays_is_the_universe() {
    let right = bset(Space::set_space(0, 1), &[], &[&[0, 1]]);
    let left = bset(Space::set_space(0, 1), &[], &[&[0, -1]]);
    let set = Set::from_basic_set(right).add_basic_set(left).unwrap();
    let hull = set.convex_hull().unwrap();
    assert!(hull.is_universe());
}

#[test]
fn hull_of_two_parallel_segments_is_a_box() {
    let seg = |x: i64| {
        bset(
            Space::set_space(0, 2),
            &[&[-x, 1, 0]],
            &[&[0, 0, 1], &[1, 0, -1]],
        )
    };
    let set = Set::from_basic_set(seg(0)).add_basic_set(seg(1)).unwrap();
    let hull = set.convex_hull().unwrap();

    let unit_box = bset(
        Space::set_space(0, 2),
        &[],
        &[&[0, 1, 0], &[1, -1, 0], &[0, 0, 1], &[1, 0, -1]],
    );
    assert!(hull.is_equal(&unit_box).unwrap());
}

#[test]
fn hull_of_an_unbounded_union_through_elimination() {
    let space = Space::set_space(0, 2);
    let right = bset(space, &[], &[&[0, 1, 0], &[0, 0, 1], &[1, 0, -1]]);
    let left = bset(space, &[], &[&[0, -1, 0], &[0, 0, 1], &[1, 0, -1]]);
    let set = Set::from_basic_set(right).add_basic_set(left).unwrap();
    let hull = set.convex_hull().unwrap();

    let strip = bset(space, &[], &[&[0, 0, 1], &[1, 0, -1]]);
    assert!(hull.is_equal(&strip).unwrap());
}

#[test]
fn hull_is_sound_and_idempotent() {
    let set = Set::from_basic_set(point2(0, 0))
        .add_basic_set(point2(3, 1))
        .unwrap()
        .add_basic_set(point2(1, 3))
        .unwrap();
    let hull = set.clone().convex_hull().unwrap();
    assert!(set.clone().is_subset(&hull).unwrap());

    let again = Set::from_basic_set(hull.clone()).convex_hull().unwrap();
    assert!(hull.is_equal(&again).unwrap());

    // The affine hull is preserved by taking the convex hull.
    let a1 = set.affine_hull().unwrap();
    let a2 = Set::from_basic_set(hull).affine_hull().unwrap();
    assert!(a1.is_equal(&a2).unwrap());
}

#[test]
fn empty_inputs_produce_empty_hulls() {
    let space = Space::set_space(0, 2);
    assert!(Set::empty(space).convex_hull().unwrap().is_empty_flagged());

    // A flagged-empty part contributes nothing.
    let set = Set::from_basic_set(BasicSet::empty(space))
        .add_basic_set(point2(1, 1))
        .unwrap()
        .add_basic_set(point2(2, 2))
        .unwrap();
    let hull = set.convex_hull().unwrap();
    let segment = bset(
        Space::set_space(0, 2),
        &[&[0, 1, -1]],
        &[&[-1, 1, 0], &[2, -1, 0]],
    );
    assert!(hull.is_equal(&segment).unwrap());
}

#[test]
fn single_part_unions_come_back_directly() {
    let b = bset(
        Space::set_space(0, 2),
        &[],
        &[&[0, 1, 0], &[2, -1, 0], &[0, 0, 1], &[2, 0, -1]],
    );
    let hull = Set::from_basic_set(b.clone()).convex_hull().unwrap();
    assert!(hull.is_equal(&b).unwrap());
}

#[test]
fn tightness_every_facet_is_attained() {
    use num_bigint::BigInt;
    use palisade::{solve_lp, LpResult};

    let set = Set::from_basic_set(point2(0, 0))
        .add_basic_set(point2(4, 0))
        .unwrap()
        .add_basic_set(point2(0, 4))
        .unwrap();
    let hull = set.clone().convex_hull().unwrap();
    // For every facet, some part attains it with equality: the minimum
    // of the facet row over the union is zero.
    for row in hull.ineqs() {
        let mut attained = false;
        for part in set.parts() {
            match solve_lp(part, false, row, &BigInt::from(1)).unwrap() {
                LpResult::Optimal { num, .. } => {
                    if num == BigInt::from(0) {
                        attained = true;
                        break;
                    }
                }
                other => panic!("facet evaluation failed: {other:?}"),
            }
        }
        assert!(attained, "facet {row:?} floats off the union");
    }
}

#[test]
fn map_hull_bridges_through_the_underlying_set() {
    // j = i and j = i + 1 over 0 <= i <= 2: the hull is the band
    // i <= j <= i + 1 on the same interval.
    let space = Space::map_space(0, 1, 1);
    let line = |off: i64| {
        BasicMap::from_rows(
            space,
            &[&[-off, -1, 1]],
            &[&[0, 1, 0], &[2, -1, 0]],
        )
        .unwrap()
    };
    let map = Map::from_basic_map(line(0)).add_basic_map(line(1)).unwrap();
    let hull = map.convex_hull().unwrap();

    let band = BasicMap::from_rows(
        space,
        &[],
        &[
            &[0, 1, 0],
            &[2, -1, 0],
            &[0, -1, 1],
            &[1, 1, -1],
        ],
    )
    .unwrap();
    assert!(hull.basic_set().is_equal(band.basic_set()).unwrap());
}
