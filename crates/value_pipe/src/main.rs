use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use value_pipe::{mapper, Value, ValueIter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let v = Value::new(4) >> (|x: i32| x + 1) >> (|x: i32| x * 2);
    println!("{}", v.get());

    let v = ValueIter::new(1..4) >> mapper::from_fn(|x: i32| x + 1) >> mapper::from_fn(|x: i32| x * 2);
    println!("{:?}", v.collect::<Result<Vec<_>>>()?);

    // Each worker adds its own index, so the output shows which worker mapped what.
    let v = ValueIter::new(0..1000).apply_parallel(
        |worker: usize| Ok(mapper::from_fn(move |x: usize| x + worker)),
        Some(4),
    )?;
    let mut out = v.collect::<Result<Vec<_>>>()?;
    out.sort_unstable();
    println!("{:?}", out);

    Ok(())
}
