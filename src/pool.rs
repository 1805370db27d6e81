use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::error::Result;

const BAR_TEMPLATE: &str = "{msg:25} {pos}/{len} [{elapsed_precise}] {bar:40}";

/// Fan a precomputed list of work units over a fixed-size worker pool.
///
/// Output identity (filenames, indices) is fixed at submission time by
/// the units themselves, so unordered completion is safe; the progress
/// bar advances as results arrive. The first failing unit aborts the
/// run; a broken precondition must not be skipped silently.
pub fn parallel_map<T, F>(label: &str, workers: Option<usize>, items: Vec<T>, f: F) -> Result<()>
where
    T: Send,
    F: Fn(T) -> Result<()> + Send + Sync,
{
    let bar = ProgressBar::new(items.len() as u64);
    bar.set_style(
        ProgressStyle::with_template(BAR_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(label.to_string());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.unwrap_or(0))
        .build()?;

    let result = pool.install(|| {
        items.into_par_iter().try_for_each(|item| {
            let r = f(item);
            bar.inc(1);
            r
        })
    });
    bar.finish();
    result
}
