//! `meta.txt` query descriptors.
//!
//! A descriptor is a stream of whitespace-separated integers:
//!
//! ```text
//! source dest
//! k s_1 .. s_k        start states
//! m f_1 .. f_m        final states
//! l label_1 .. label_l
//! ```
//!
//! Vertices and states are 1-based. A negative label walks its edges
//! backwards. `source = 0` with a non-zero `dest` asks for the sources that
//! reach `dest`: the query runs reversed from `dest`, starting in the final
//! states and accepting in the start states.

use std::fmt;

use rpqmat_engine::{Direction, Label};
use rpqmat_sparse::Index;
use serde::Serialize;

use crate::error::DescriptorError;

/// Descriptor as written on disk (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryDescriptor {
    pub source: u64,
    pub dest: u64,
    pub start_states: Vec<u64>,
    pub final_states: Vec<u64>,
    pub labels: Vec<Label>,
}

/// Engine-ready inputs of one query (0-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedQuery {
    pub source_vertices: Vec<Index>,
    pub start_states: Vec<Index>,
    /// States the answer is projected on.
    pub final_states: Vec<Index>,
    pub direction: Direction,
}

impl QueryDescriptor {
    pub fn is_reversed(&self) -> bool {
        self.source == 0 && self.dest != 0
    }

    /// Graph label ids in first-use order, without repeats.
    pub fn graph_labels(&self) -> Vec<u32> {
        let mut seen = Vec::with_capacity(self.labels.len());
        for label in &self.labels {
            if !seen.contains(&label.id) {
                seen.push(label.id);
            }
        }
        seen
    }

    pub fn resolve(&self) -> Result<ResolvedQuery, DescriptorError> {
        let starts = to_indices(&self.start_states, "start state")?;
        let finals = to_indices(&self.final_states, "final state")?;

        if self.is_reversed() {
            return Ok(ResolvedQuery {
                source_vertices: vec![to_index(self.dest, "destination vertex")?],
                start_states: finals,
                final_states: starts,
                direction: Direction::Reversed,
            });
        }

        // `0 0` runs from the first vertex
        let source = self.source.max(1);
        Ok(ResolvedQuery {
            source_vertices: vec![to_index(source, "source vertex")?],
            start_states: starts,
            final_states: finals,
            direction: Direction::Forward,
        })
    }
}

impl fmt::Display for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            write!(f, "{}", items.len())?;
            for item in items {
                write!(f, " {item}")?;
            }
            writeln!(f)
        }

        writeln!(f, "{} {}", self.source, self.dest)?;
        list(f, &self.start_states)?;
        list(f, &self.final_states)?;
        list(f, &self.labels)
    }
}

pub fn parse_descriptor(text: &str) -> Result<QueryDescriptor, DescriptorError> {
    let mut tokens = Tokens::new(text);

    let source = tokens.unsigned("source vertex")?;
    let dest = tokens.unsigned("destination vertex")?;
    let start_states = tokens.counted_list("start state count", "start state")?;
    let final_states = tokens.counted_list("final state count", "final state")?;

    let count = tokens.unsigned("label count")?;
    let mut labels = Vec::new();
    for _ in 0..count {
        let (line, token) = tokens.next("label")?;
        let label = token
            .parse::<i64>()
            .ok()
            .filter(|&raw| raw != 0)
            .and_then(Label::from_signed)
            .ok_or_else(|| DescriptorError::Token {
                line,
                expected: "non-zero signed label",
                found: token.to_string(),
            })?;
        labels.push(label);
    }

    Ok(QueryDescriptor {
        source,
        dest,
        start_states,
        final_states,
        labels,
    })
}

fn to_index(one_based: u64, what: &'static str) -> Result<Index, DescriptorError> {
    one_based
        .checked_sub(1)
        .and_then(|v| Index::try_from(v).ok())
        .ok_or(DescriptorError::IndexOutOfRange {
            what,
            value: one_based,
        })
}

fn to_indices(one_based: &[u64], what: &'static str) -> Result<Vec<Index>, DescriptorError> {
    one_based.iter().map(|&v| to_index(v, what)).collect()
}

/// Whitespace tokens tagged with their 1-based line.
struct Tokens<'a> {
    inner: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        let inner = text
            .lines()
            .enumerate()
            .flat_map(|(i, line)| line.split_whitespace().map(move |t| (i + 1, t)));
        Self {
            inner: Box::new(inner),
        }
    }

    fn next(&mut self, expected: &'static str) -> Result<(usize, &'a str), DescriptorError> {
        self.inner
            .next()
            .ok_or(DescriptorError::UnexpectedEnd(expected))
    }

    fn unsigned(&mut self, expected: &'static str) -> Result<u64, DescriptorError> {
        let (line, token) = self.next(expected)?;
        token.parse().map_err(|_| DescriptorError::Token {
            line,
            expected,
            found: token.to_string(),
        })
    }

    fn counted_list(
        &mut self,
        count: &'static str,
        item: &'static str,
    ) -> Result<Vec<u64>, DescriptorError> {
        let n = self.unsigned(count)?;
        (0..n).map(|_| self.unsigned(item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_forward_descriptor() {
        let d = parse_descriptor("1 0\n1 1\n1 3\n2 1 2\n").unwrap();
        assert_eq!(d.source, 1);
        assert_eq!(d.start_states, vec![1]);
        assert_eq!(d.final_states, vec![3]);
        assert_eq!(d.labels, vec![Label::new(1), Label::new(2)]);
        assert!(!d.is_reversed());

        let q = d.resolve().unwrap();
        assert_eq!(q.source_vertices, vec![0]);
        assert_eq!(q.start_states, vec![0]);
        assert_eq!(q.final_states, vec![2]);
        assert_eq!(q.direction, Direction::Forward);
    }

    #[test]
    fn zero_source_with_dest_reverses_the_query() {
        let d = parse_descriptor("0 5 2 1 2 1 4 1 -3").unwrap();
        assert!(d.is_reversed());
        assert_eq!(d.labels, vec![Label::inverse(3)]);

        let q = d.resolve().unwrap();
        assert_eq!(q.source_vertices, vec![4]);
        assert_eq!(q.start_states, vec![3]);
        assert_eq!(q.final_states, vec![0, 1]);
        assert_eq!(q.direction, Direction::Reversed);
    }

    #[test]
    fn zero_source_and_dest_start_at_first_vertex() {
        let q = parse_descriptor("0 0 1 1 1 1 1 7")
            .unwrap()
            .resolve()
            .unwrap();
        assert_eq!(q.source_vertices, vec![0]);
        assert_eq!(q.direction, Direction::Forward);
    }

    #[test]
    fn final_list_uses_its_own_count() {
        let d = parse_descriptor("2 0\n1 1\n3 2 3 4\n1 9\n").unwrap();
        assert_eq!(d.start_states, vec![1]);
        assert_eq!(d.final_states, vec![2, 3, 4]);
        assert_eq!(d.labels, vec![Label::new(9)]);
    }

    #[test]
    fn graph_labels_are_deduplicated() {
        let d = parse_descriptor("1 0 1 1 1 2 3 4 -4 7").unwrap();
        assert_eq!(d.graph_labels(), vec![4, 7]);
    }

    #[test]
    fn reports_bad_tokens_with_line() {
        assert_eq!(
            parse_descriptor("1 0\n1 x\n"),
            Err(DescriptorError::Token {
                line: 2,
                expected: "start state",
                found: "x".to_string()
            })
        );
        assert_eq!(
            parse_descriptor("1 0\n1 1\n1 2\n1 0\n"),
            Err(DescriptorError::Token {
                line: 4,
                expected: "non-zero signed label",
                found: "0".to_string()
            })
        );
        assert_eq!(
            parse_descriptor("1 0\n1 1\n"),
            Err(DescriptorError::UnexpectedEnd("final state count"))
        );
    }

    #[test]
    fn zero_state_is_out_of_range() {
        let d = parse_descriptor("1 0 1 0 1 1 1 1").unwrap();
        assert_eq!(
            d.resolve(),
            Err(DescriptorError::IndexOutOfRange {
                what: "start state",
                value: 0
            })
        );
    }

    #[test]
    fn display_writes_parseable_text() {
        let d = parse_descriptor("0 5 2 1 2 1 4 2 -3 6").unwrap();
        assert_eq!(d.to_string(), "0 5\n2 1 2\n1 4\n2 -3 6\n");
        assert_eq!(parse_descriptor(&d.to_string()).unwrap(), d);
    }
}
