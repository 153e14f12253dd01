#![cfg(feature = "persistent")]
//! Unit tests for Seq and its lazy composition nodes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use lambars_aff::persistent::Seq;
use rstest::rstest;

/// Tracks how many traversals of a generated sequence are open at once.
#[derive(Default)]
struct OpenGauge {
    open: AtomicUsize,
    peak: AtomicUsize,
}

impl OpenGauge {
    fn enter(self: &Arc<Self>) -> OpenGuard {
        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        OpenGuard(Arc::clone(self))
    }
}

struct OpenGuard(Arc<OpenGauge>);

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Yields `items` while holding an `OpenGuard`.
struct Guarded {
    items: std::vec::IntoIter<i32>,
    _guard: OpenGuard,
}

impl Iterator for Guarded {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        self.items.next()
    }
}

/// A generated operand that counts as open while traversed.
fn gauged(gauge: &Arc<OpenGauge>, items: Vec<i32>) -> Seq<i32> {
    let gauge = Arc::clone(gauge);
    Seq::generate(move || Guarded {
        items: items.clone().into_iter(),
        _guard: gauge.enter(),
    })
}

// =============================================================================
// Concatenation
// =============================================================================

#[rstest]
fn test_concat_stays_flat_and_ordered() {
    let seq = Seq::from(vec![1, 2])
        .concat(Seq::from(vec![3]))
        .concat(Seq::from(vec![]))
        .concat(Seq::from(vec![4, 5]));

    assert_eq!(seq.operand_count(), 4);
    assert_eq!(seq.to_vec(), vec![1, 2, 3, 4, 5]);
}

#[rstest]
#[case(1)]
#[case(10)]
#[case(1_000)]
fn test_n_concatenations_yield_n_plus_one_operands(#[case] concatenations: usize) {
    let seq = (0..concatenations).fold(Seq::singleton(0), |seq, index| {
        seq.concat(Seq::singleton(index + 1))
    });
    assert_eq!(seq.operand_count(), concatenations + 1);
    assert_eq!(seq.to_vec(), (0..=concatenations).collect::<Vec<_>>());
}

#[rstest]
fn test_concat_cursor_opens_one_operand_at_a_time() {
    let gauge = Arc::new(OpenGauge::default());
    let seq = Seq::concat_all([
        gauged(&gauge, vec![1, 2]),
        gauged(&gauge, vec![]),
        gauged(&gauge, vec![3]),
        gauged(&gauge, vec![4, 5]),
    ]);

    assert_eq!(seq.to_vec(), vec![1, 2, 3, 4, 5]);
    assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
    assert_eq!(gauge.open.load(Ordering::SeqCst), 0);
}

#[rstest]
fn test_abandoned_cursor_releases_operand() {
    let gauge = Arc::new(OpenGauge::default());
    let seq = gauged(&gauge, vec![1, 2, 3]).concat(Seq::singleton(4));

    let mut cursor = seq.iter();
    assert_eq!(cursor.next(), Some(1));
    assert_eq!(gauge.open.load(Ordering::SeqCst), 1);

    drop(cursor);
    assert_eq!(gauge.open.load(Ordering::SeqCst), 0);
}

#[rstest]
fn test_push_back_and_append() {
    let base = Seq::from(vec!['a']);
    let pushed = base.clone().push_back('b').push_back('c');
    let appended = base.append(&pushed);

    assert_eq!(pushed.to_vec(), vec!['a', 'b', 'c']);
    assert_eq!(appended.to_vec(), vec!['a', 'a', 'b', 'c']);
    assert_eq!(base.to_vec(), vec!['a']);
}

// =============================================================================
// Bind / flatten
// =============================================================================

#[rstest]
fn test_bind_is_lazy_and_yields_nested_order() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let seq = Seq::from(vec![1, 2, 3]).bind(move |x| {
        counter.fetch_add(1, Ordering::SeqCst);
        Seq::from(vec![x * 10, x * 10 + 1])
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let first_two: Vec<i32> = seq.iter().take(2).collect();
    assert_eq!(first_two, vec![10, 11]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    calls.store(0, Ordering::SeqCst);
    assert_eq!(seq.to_vec(), vec![10, 11, 20, 21, 30, 31]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[rstest]
fn test_bind_holds_at_most_one_sub_sequence() {
    let gauge = Arc::new(OpenGauge::default());
    let inner_gauge = Arc::clone(&gauge);
    let seq = Seq::from(vec![1, 2, 3]).bind(move |x| gauged(&inner_gauge, vec![x, x]));

    assert_eq!(seq.count(), 6);
    assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_flatten_matches_bind_identity() {
    let nested: Seq<Seq<i32>> = Seq::from(vec![
        Seq::from(vec![1]),
        Seq::empty(),
        Seq::from(vec![2, 3]).concat(Seq::singleton(4)),
    ]);
    assert_eq!(nested.flatten().to_vec(), vec![1, 2, 3, 4]);
    assert_eq!(nested.flatten(), nested.bind(|inner| inner));
}

#[rstest]
fn test_map_then_bind() {
    let seq = Seq::from(vec![1, 2])
        .map(|x| x + 1)
        .bind(|x| Seq::from(vec![x; 2]));
    assert_eq!(seq.to_vec(), vec![2, 2, 3, 3]);
}

#[rstest]
fn test_head_only_evaluates_first_sub_sequence() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let seq = Seq::generate(|| 1..).bind(move |x: u64| {
        counter.fetch_add(1, Ordering::SeqCst);
        Seq::singleton(x)
    });
    assert_eq!(seq.head(), Some(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Restartability and sharing
// =============================================================================

#[rstest]
fn test_cursors_are_independent() {
    let seq = Seq::from(vec![1, 2]).concat(Seq::from(vec![3])).map(|x| x * 2);
    let mut first = seq.iter();
    let mut second = seq.iter();

    assert_eq!(first.next(), Some(2));
    assert_eq!(first.next(), Some(4));
    assert_eq!(second.next(), Some(2));
    assert_eq!(first.next(), Some(6));
    assert_eq!(second.collect::<Vec<_>>(), vec![4, 6]);
}

#[rstest]
fn test_retraversal_reproduces_elements() {
    let seq = Seq::from(vec![3, 1, 2]).bind(|x| Seq::generate(move || 0..x));
    let expected = vec![0, 1, 2, 0, 0, 1];
    assert_eq!(seq.to_vec(), expected);
    assert_eq!(seq.to_vec(), expected);
}

#[rstest]
fn test_concurrent_traversal_from_threads() {
    let seq = (0..8)
        .map(|chunk| Seq::generate(move || chunk * 100..chunk * 100 + 100))
        .fold(Seq::empty(), Seq::concat)
        .bind(|x| Seq::from(vec![x, x]));
    let expected: i64 = (0..800).map(|x: i64| x * 2).sum();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let seq = seq.clone();
            thread::spawn(move || seq.iter().sum::<i64>())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

// =============================================================================
// Queries and traits
// =============================================================================

#[rstest]
#[case(Seq::empty(), true, 0, None)]
#[case(Seq::singleton(9), false, 1, Some(9))]
#[case(Seq::from(vec![]).concat(Seq::from(vec![5, 6])), false, 2, Some(5))]
#[case(Seq::from(vec![1, 2]).bind(|_| Seq::empty()), true, 0, None)]
fn test_queries(
    #[case] seq: Seq<i32>,
    #[case] empty: bool,
    #[case] count: usize,
    #[case] head: Option<i32>,
) {
    assert_eq!(seq.is_empty(), empty);
    assert_eq!(seq.count(), count);
    assert_eq!(seq.head(), head);
}

#[rstest]
fn test_collect_and_into_iterator() {
    let seq: Seq<i32> = (1..=3).collect();
    let doubled: Vec<i32> = seq.clone().into_iter().map(|x| x * 2).collect();
    assert_eq!(doubled, vec![2, 4, 6]);
    assert_eq!(seq, Seq::from(vec![1, 2, 3]));
    assert_eq!(Seq::<i32>::default(), Seq::empty());
}
