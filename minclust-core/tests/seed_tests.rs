//! Integration tests for seed selection and the live in-degree ordering.

use minclust_core::{Digraph, InwardsOrder, PointIndex, SeedMethod, find_seeds};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ALL_METHODS: [SeedMethod; 6] = [
    SeedMethod::Lexical,
    SeedMethod::InwardsOrder,
    SeedMethod::InwardsUpdating,
    SeedMethod::InwardsAltUpdating,
    SeedMethod::ExclusionOrder,
    SeedMethod::ExclusionUpdating,
];

/// A nearest-neighbor-shaped digraph: most vertices get `k` distinct
/// out-neighbors, a few get none (as after a failed radius search).
fn random_nng(rng: &mut StdRng, vertices: usize, k: usize) -> Digraph {
    let rows: Vec<Vec<PointIndex>> = (0..vertices)
        .map(|_| {
            if rng.random_range(0..10) == 0 {
                return Vec::new();
            }
            let mut row = Vec::with_capacity(k);
            while row.len() < k.min(vertices) {
                let x = rng.random_range(0..vertices as PointIndex);
                if !row.contains(&x) {
                    row.push(x);
                }
            }
            row
        })
        .collect();
    Digraph::from_rows(&rows).unwrap()
}

fn closed_neighborhood(g: &Digraph, v: PointIndex) -> Vec<PointIndex> {
    let mut nb = g.out(v).to_vec();
    nb.push(v);
    nb.sort_unstable();
    nb.dedup();
    nb
}

#[test]
fn test_seeds_have_disjoint_closed_neighborhoods_on_random_nngs() {
    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = rng.random_range(4..60);
        let k = rng.random_range(1..4);
        let g = random_nng(&mut rng, n, k);

        for method in ALL_METHODS {
            let seeds = find_seeds(&g, method).unwrap();

            let mut claimed = vec![false; n];
            for &s in &seeds {
                assert!(!g.out(s).is_empty(), "{method:?} seeded an excluded vertex");
                for x in closed_neighborhood(&g, s) {
                    assert!(
                        !claimed[x as usize],
                        "{method:?} produced overlapping neighborhoods (input seed {seed})"
                    );
                    claimed[x as usize] = true;
                }
            }
        }
    }
}

#[test]
fn test_lexical_is_a_pure_function_of_the_input() {
    let mut rng = StdRng::seed_from_u64(42);
    let g = random_nng(&mut rng, 40, 3);

    let first = find_seeds(&g, SeedMethod::Lexical).unwrap();
    let second = find_seeds(&g, SeedMethod::Lexical).unwrap();
    assert_eq!(first, second);

    // Lexical accepts greedily in index order: every seed is the smallest
    // eligible vertex given the ones before it.
    for window in first.windows(2) {
        assert!(window[0] < window[1]);
    }
}

#[test]
fn test_methods_agree_on_cleanly_separated_components() {
    // Four disjoint triangles: every method must find exactly one seed per
    // component, whatever order it scans in.
    let mut rows = Vec::new();
    for c in 0..4u32 {
        let base = c * 3;
        rows.push(vec![base + 1, base + 2]);
        rows.push(vec![base, base + 2]);
        rows.push(vec![base, base + 1]);
    }
    let g = Digraph::from_rows(&rows).unwrap();

    for method in ALL_METHODS {
        let seeds = find_seeds(&g, method).unwrap();
        assert_eq!(seeds.len(), 4, "{method:?}");

        let mut components: Vec<u32> = seeds.iter().map(|&s| s / 3).collect();
        components.sort_unstable();
        assert_eq!(components, vec![0, 1, 2, 3], "{method:?}");
    }
}

// The live sort behind the updating methods: after any sequence of valid
// decrements, the unvisited suffix must stay bucket-sorted and the
// visited prefix untouched.
#[test]
fn test_moving_sort_stays_ordered_under_random_decrements() {
    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(1000 + seed);
        let n = rng.random_range(4..50);
        let g = random_nng(&mut rng, n, 3);

        let mut ord = InwardsOrder::new(&g, true).unwrap();

        for cursor in 0..n {
            // Decrement a handful of random vertices sitting after the
            // cursor, as the updating scans do.
            for _ in 0..rng.random_range(0..4) {
                let v = rng.random_range(0..n as PointIndex);
                if ord.position(v) > cursor && ord.count(v) > 0 {
                    let prefix: Vec<PointIndex> = ord.sorted()[..=cursor].to_vec();
                    ord.decrement(v, cursor);
                    assert_eq!(
                        &ord.sorted()[..=cursor],
                        &prefix[..],
                        "decrement disturbed the visited prefix"
                    );
                }
            }

            // Consistency: sorted/position stay inverse permutations, and
            // counts are non-decreasing across the unvisited suffix.
            for (slot, &v) in ord.sorted().iter().enumerate() {
                assert_eq!(ord.position(v), slot);
            }
            for pair in (cursor + 1..n).collect::<Vec<_>>().windows(2) {
                let a = ord.sorted()[pair[0]];
                let b = ord.sorted()[pair[1]];
                assert!(
                    ord.count(a) <= ord.count(b),
                    "unvisited suffix lost its ordering at cursor {cursor}"
                );
            }
        }
    }
}

#[test]
fn test_updating_methods_still_respect_claim_rules_on_dense_graphs() {
    // A dense graph with heavy arc sharing stresses the decrement paths.
    let n = 30usize;
    let rows: Vec<Vec<PointIndex>> = (0..n)
        .map(|v| {
            (1..=4)
                .map(|d| ((v + d * 7) % n) as PointIndex)
                .collect()
        })
        .collect();
    let g = Digraph::from_rows(&rows).unwrap();

    for method in [
        SeedMethod::InwardsUpdating,
        SeedMethod::InwardsAltUpdating,
        SeedMethod::ExclusionUpdating,
    ] {
        let seeds = find_seeds(&g, method).unwrap();
        assert!(!seeds.is_empty(), "{method:?} found nothing on a dense graph");

        let mut claimed = vec![false; n];
        for &s in &seeds {
            for x in closed_neighborhood(&g, s) {
                assert!(!claimed[x as usize], "{method:?} overlap");
                claimed[x as usize] = true;
            }
        }
    }
}
