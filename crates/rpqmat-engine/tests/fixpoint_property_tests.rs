use proptest::prelude::*;
use rpqmat_engine::*;
use rpqmat_sparse::{BoolMatrix, Index};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

const MAX_VERTICES: Index = 8;
const MAX_STATES: Index = 4;
const MAX_LABELS: usize = 4;
const MAX_EDGES: usize = 16;

type Pairs = Vec<(Index, Index)>;

#[derive(Debug, Clone)]
struct LabelCase {
    graph: Option<Pairs>,
    automaton: Option<Pairs>,
    inverse: bool,
}

#[derive(Debug, Clone)]
struct QueryCase {
    vertices: Index,
    states: Index,
    labels: Vec<LabelCase>,
    sources: Vec<Index>,
    starts: Vec<Index>,
    finals: Vec<Index>,
    reversed: bool,
}

fn pairs_strategy(n: Index) -> impl Strategy<Value = Pairs> {
    prop::collection::vec((0..n, 0..n), 0..=MAX_EDGES)
}

fn label_strategy(vertices: Index, states: Index) -> impl Strategy<Value = LabelCase> {
    (
        prop::option::weighted(0.9, pairs_strategy(vertices)),
        prop::option::weighted(0.9, pairs_strategy(states)),
        any::<bool>(),
    )
        .prop_map(|(graph, automaton, inverse)| LabelCase {
            graph,
            automaton,
            inverse,
        })
}

fn query_strategy() -> impl Strategy<Value = QueryCase> {
    (1..=MAX_VERTICES, 1..=MAX_STATES).prop_flat_map(|(vertices, states)| {
        (
            Just(vertices),
            Just(states),
            prop::collection::vec(label_strategy(vertices, states), 1..=MAX_LABELS),
            prop::collection::vec(0..vertices, 1..=3),
            prop::collection::vec(0..states, 1..=2),
            prop::collection::vec(0..states, 0..=2),
            any::<bool>(),
        )
            .prop_map(
                |(vertices, states, mut labels, sources, starts, finals, reversed)| {
                    // at least one label must carry both matrices
                    if !labels.iter().any(|l| l.graph.is_some() && l.automaton.is_some()) {
                        labels[0].graph.get_or_insert_with(Vec::new);
                        labels[0].automaton.get_or_insert_with(Vec::new);
                    }
                    QueryCase {
                        vertices,
                        states,
                        labels,
                        sources,
                        starts,
                        finals,
                        reversed,
                    }
                },
            )
    })
}

fn build(n: Index, pairs: &[(Index, Index)]) -> BoolMatrix {
    let rows: Vec<Index> = pairs.iter().map(|p| p.0).collect();
    let cols: Vec<Index> = pairs.iter().map(|p| p.1).collect();
    BoolMatrix::from_coordinates(n, n, &rows, &cols).unwrap()
}

struct Built {
    graph: Vec<Option<BoolMatrix>>,
    automaton: Vec<Option<BoolMatrix>>,
    inverse: Vec<bool>,
}

impl Built {
    fn new(case: &QueryCase) -> Self {
        Self {
            graph: case
                .labels
                .iter()
                .map(|l| l.graph.as_ref().map(|p| build(case.vertices, p)))
                .collect(),
            automaton: case
                .labels
                .iter()
                .map(|l| l.automaton.as_ref().map(|p| build(case.states, p)))
                .collect(),
            inverse: case.labels.iter().map(|l| l.inverse).collect(),
        }
    }

    fn labels(&self) -> LabelSet<'_> {
        let graph: Vec<Option<&BoolMatrix>> = self.graph.iter().map(Option::as_ref).collect();
        let automaton: Vec<Option<&BoolMatrix>> =
            self.automaton.iter().map(Option::as_ref).collect();
        LabelSet::from_parallel(&graph, &automaton, &self.inverse)
    }
}

fn query<'a>(
    built: &'a Built,
    sources: &[Index],
    starts: &[Index],
    direction: Direction,
) -> RpqQuery<'a> {
    RpqQuery::new(built.labels(), sources.to_vec(), starts.to_vec()).with_direction(direction)
}

/// Plain breadth-first search over the product graph.
fn reference(case: &QueryCase, sources: &[Index], starts: &[Index], reversed: bool) -> BTreeSet<(Index, Index)> {
    let mut seen: BTreeSet<(Index, Index)> = BTreeSet::new();
    for &s in starts {
        for &v in sources {
            seen.insert((s, v));
        }
    }
    let mut queue: Vec<(Index, Index)> = seen.iter().copied().collect();
    while let Some((s, v)) = queue.pop() {
        for label in &case.labels {
            let (Some(graph), Some(automaton)) = (&label.graph, &label.automaton) else {
                continue;
            };
            let against = label.inverse ^ reversed;
            for &(a_from, a_to) in automaton {
                let (from, to) = if reversed { (a_to, a_from) } else { (a_from, a_to) };
                if from != s {
                    continue;
                }
                for &(g_from, g_to) in graph {
                    let (src, dst) = if against { (g_to, g_from) } else { (g_from, g_to) };
                    if src == v && seen.insert((to, dst)) {
                        queue.push((to, dst));
                    }
                }
            }
        }
    }
    seen
}

#[derive(Default)]
struct Recorder {
    supersteps: Mutex<Vec<SuperstepStats>>,
    runs: Mutex<Vec<RunStats>>,
}

impl DiagnosticsSink for Recorder {
    fn record(&self, stats: &RunStats) {
        self.runs.lock().unwrap().push(stats.clone());
    }

    fn superstep(&self, stats: &SuperstepStats) {
        self.supersteps.lock().unwrap().push(*stats);
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn engines_agree_with_product_bfs(case in query_strategy()) {
        let built = Built::new(&case);
        let direction = Direction::from_reversed(case.reversed);
        let q = query(&built, &case.sources, &case.starts, direction);

        let sequential = SequentialEngine::new().evaluate(&q).unwrap();
        let parallel = ParallelEngine::new(3).unwrap().evaluate(&q).unwrap();
        prop_assert_eq!(&sequential, &parallel);

        let expected = reference(&case, &case.sources, &case.starts, case.reversed);
        let actual: BTreeSet<(Index, Index)> = sequential.iter().collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn reachable_grows_monotonically_and_terminates(case in query_strategy()) {
        let built = Built::new(&case);
        let direction = Direction::from_reversed(case.reversed);
        let recorder = Arc::new(Recorder::default());
        let engine = SequentialEngine::new().with_sink(recorder.clone());
        let reachable = engine
            .evaluate(&query(&built, &case.sources, &case.starts, direction))
            .unwrap();

        let initial = {
            let sources: BTreeSet<_> = case.sources.iter().collect();
            let starts: BTreeSet<_> = case.starts.iter().collect();
            (sources.len() * starts.len()) as u64
        };
        let steps = recorder.supersteps.lock().unwrap();
        prop_assert!(!steps.is_empty());
        prop_assert!(steps.len() as u64 <= u64::from(case.states) * u64::from(case.vertices));

        let mut previous = initial;
        for (i, step) in steps.iter().enumerate() {
            prop_assert_eq!(step.index, i + 1);
            prop_assert_eq!(step.reachable_pairs, previous + step.frontier_pairs);
            let last = i + 1 == steps.len();
            prop_assert_eq!(step.frontier_pairs == 0, last);
            previous = step.reachable_pairs;
        }

        let runs = recorder.runs.lock().unwrap();
        prop_assert_eq!(runs.len(), 1);
        prop_assert_eq!(runs[0].supersteps, steps.len());
        prop_assert_eq!(runs[0].reachable_pairs, reachable.nvals());
    }

    #[test]
    fn extraction_is_idempotent(case in query_strategy()) {
        let built = Built::new(&case);
        let q = query(&built, &case.sources, &case.starts, Direction::from_reversed(case.reversed));
        let reachable = SequentialEngine::new().evaluate(&q).unwrap();
        let first = extract_answer(&reachable, &case.finals).unwrap();
        let second = extract_answer(&reachable, &case.finals).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn reversed_query_mirrors_forward_query(case in query_strategy()) {
        prop_assume!(!case.finals.is_empty());
        let built = Built::new(&case);
        let engine = SequentialEngine::new();
        let source = case.sources[0];

        let forward = engine
            .evaluate(&query(&built, &[source], &case.starts, Direction::Forward))
            .unwrap();
        let forward_answer = extract_answer(&forward, &case.finals).unwrap();

        for target in 0..case.vertices {
            let backward = engine
                .evaluate(&query(&built, &[target], &case.finals, Direction::Reversed))
                .unwrap();
            let backward_answer = extract_answer(&backward, &case.starts).unwrap();
            prop_assert_eq!(
                forward_answer.contains(target),
                backward_answer.contains(source),
                "target {}", target
            );
        }
    }

    #[test]
    fn graph_only_label_changes_nothing(case in query_strategy(), extra in pairs_strategy(MAX_VERTICES)) {
        let built = Built::new(&case);
        let q = query(&built, &case.sources, &case.starts, Direction::from_reversed(case.reversed));
        let baseline = SequentialEngine::new().evaluate(&q).unwrap();

        let extra: Pairs = extra
            .into_iter()
            .filter(|&(a, b)| a < case.vertices && b < case.vertices)
            .collect();
        let extra_graph = build(case.vertices, &extra);
        let mut labels = built.labels();
        labels.push(LabelEntry { graph: Some(&extra_graph), automaton: None, inverse: false });
        let widened = RpqQuery::new(labels, case.sources.clone(), case.starts.clone())
            .with_direction(Direction::from_reversed(case.reversed));

        prop_assert_eq!(&SequentialEngine::new().evaluate(&widened).unwrap(), &baseline);
        prop_assert_eq!(&ParallelEngine::new(2).unwrap().evaluate(&widened).unwrap(), &baseline);
    }
}
