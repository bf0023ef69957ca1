//! Sequential pipeline tests.
//!
//! Tests cover:
//! - `Value` chaining
//! - `ValueIter::apply` equivalence with plain iteration, drops, errors
//! - The single-worker path of `apply_parallel` (in-process, order preserved)

mod common;
use common::{DropEven, FactoryLog};

use anyhow::{anyhow, Result};
use value_pipe::{current_worker_id, mapper, Mapper, Value, ValueIter};

#[test]
fn test_value_chain() {
    let v = Value::new(4) >> (|x: i32| x + 1) >> (|x: i32| x * 2);
    assert_eq!(*v.get(), 10);
}

#[test]
fn test_value_iter_chain() -> Result<()> {
    let v = ValueIter::new(1..4) >> mapper::from_fn(|x: i32| x + 1) >> mapper::from_fn(|x: i32| x * 2);
    assert_eq!(v.collect::<Result<Vec<_>>>()?, vec![4, 6, 8]);
    Ok(())
}

#[test]
fn test_sequential_equivalence() -> Result<()> {
    let source: Vec<u64> = (0..500).map(|x| x * 7 % 113).collect();
    let expected: Vec<String> = source.iter().map(|x| format!("#{}", x)).collect();

    let got = ValueIter::new(source)
        .apply(mapper::from_fn(|x: u64| format!("#{}", x)))
        .collect::<Result<Vec<_>>>()?;

    assert_eq!(got, expected);
    Ok(())
}

#[test]
fn test_sequential_drop_even() -> Result<()> {
    let got = ValueIter::new(vec![1u64, 2, 3, 4])
        .apply(DropEven)
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(got, vec![1, 3]);
    Ok(())
}

#[test]
fn test_infinite_source_is_pulled_lazily() -> Result<()> {
    let firsts = ValueIter::new(0u64..)
        .apply(DropEven)
        .apply(mapper::from_fn(|x: u64| x * 10))
        .take(3)
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(firsts, vec![10, 30, 50]);
    Ok(())
}

#[test]
fn test_chained_mapper_via_then() -> Result<()> {
    let stage = DropEven.then(mapper::from_fn(|x: u64| x * 3));
    let got = ValueIter::new(0u64..6)
        .apply(stage)
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(got, vec![3, 9, 15]);
    Ok(())
}

#[test]
fn test_mapper_can_emit_none_as_a_value() -> Result<()> {
    let got = ValueIter::new(vec![0, 5, 0])
        .apply(mapper::from_fn(|x: i32| (x != 0).then_some(x)))
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(got, vec![None, Some(5), None]);
    Ok(())
}

#[test]
fn test_sequential_error_reaches_consumer() {
    let result = ValueIter::new(0..10)
        .apply(mapper::try_map(|x: i32| {
            if x == 4 {
                Err(anyhow!("bad element {}", x))
            } else {
                Ok(x)
            }
        }))
        .collect::<Result<Vec<_>>>();

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "bad element 4");
}

#[test]
fn test_single_worker_preserves_order() -> Result<()> {
    let log = FactoryLog::default();
    let factory_log = log.clone();

    let got = ValueIter::new(0u64..200)
        .apply_parallel(
            move |worker: usize| {
                factory_log.record(worker);
                Ok(mapper::from_fn(|x: u64| (x, current_worker_id())))
            },
            Some(1),
        )?
        .collect::<Result<Vec<_>>>()?;

    let expected: Vec<(u64, Option<usize>)> = (0..200).map(|x| (x, None)).collect();
    assert_eq!(got, expected, "single worker runs in-process and in order");
    assert_eq!(log.sorted_indices(), vec![0]);
    Ok(())
}

#[test]
fn test_single_worker_matches_sequential_with_drops() -> Result<()> {
    let sequential = ValueIter::new(0u64..100)
        .apply(DropEven)
        .collect::<Result<Vec<_>>>()?;
    let degenerate = ValueIter::new(0u64..100)
        .apply_parallel(|_| Ok(DropEven), Some(1))?
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(sequential, degenerate);
    Ok(())
}

#[test]
fn test_single_worker_yields_errors_in_place() -> Result<()> {
    let fail_on_two = |_: usize| {
        anyhow::Ok(mapper::try_map(|x: u64| {
            if x == 2 {
                Err(anyhow!("bad element {}", x))
            } else {
                Ok(x)
            }
        }))
    };

    let results: Vec<Result<u64>> = ValueIter::new(0u64..5)
        .apply_parallel(fail_on_two, Some(1))?
        .collect();

    // Same as the sequential path: the error sits at its position and the
    // remaining elements still follow.
    assert_eq!(results.len(), 5);
    assert_eq!(results[2].as_ref().map_err(|e| e.to_string()), Err("bad element 2".to_string()));
    let oks: Vec<u64> = results.into_iter().filter_map(Result::ok).collect();
    assert_eq!(oks, vec![0, 1, 3, 4]);

    // With more workers the first error ends the sequence.
    let results: Vec<Result<u64>> = ValueIter::new(0u64..5)
        .apply_parallel(fail_on_two, Some(2))?
        .collect();
    assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    assert!(results.last().is_some_and(|r| r.is_err()));
    Ok(())
}

#[test]
fn test_single_worker_factory_error_is_immediate() {
    let result = ValueIter::new(0u64..10)
        .apply_parallel(|_| -> Result<DropEven> { Err(anyhow!("model missing")) }, Some(1));

    let err = result.unwrap_err();
    assert!(err.to_string().contains("worker 0"));
    assert_eq!(err.root_cause().to_string(), "model missing");
}

#[test]
fn test_empty_source_defaults_to_one_worker() -> Result<()> {
    let got = ValueIter::new(Vec::<u64>::new())
        .apply_parallel(|_| Ok(DropEven), None)?
        .collect::<Result<Vec<_>>>()?;
    assert!(got.is_empty());
    Ok(())
}
