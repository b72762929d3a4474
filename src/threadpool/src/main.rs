use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::info;

use threadpool::{Config, ThreadPool};

static STDOUT_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Parser)]
#[command(about = "Feeds two sample tasks into a thread pool at a fixed interval")]
struct Args {
    #[arg(long, env = "THREADPOOL_ITERATIONS", default_value_t = 50)]
    iterations: usize,
    #[arg(long, env = "THREADPOOL_INTERVAL_MS", default_value_t = 1000)]
    interval_ms: u64,
    /// Defaults to the host's hardware concurrency.
    #[arg(long, env = "THREADPOOL_WORKERS")]
    workers: Option<usize>,
}

fn function_first() {
    let _guard = STDOUT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    println!("Thread id : {:?} : function_first", thread::current().id());
}

fn function_second() {
    let _guard = STDOUT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    println!("Thread id : {:?} : function_second", thread::current().id());
}

fn main() -> threadpool::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let mut cfg = Config::from_env()?;
    if let Some(workers) = args.workers {
        cfg.workers = workers;
    }
    info!(
        "Hardware concurrency {}, using {} workers",
        num_cpus::get(),
        cfg.workers
    );
    let mut pool = ThreadPool::with_config(cfg)?;

    let interval = Duration::from_millis(args.interval_ms);
    for i in 0..args.iterations {
        println!("{}", i);
        pool.submit(function_first)?;
        pool.submit(function_second)?;
        thread::sleep(interval);
    }

    pool.stop();
    let stats = pool.stats();
    info!(
        "Executed {} of {} tasks ({} panicked)",
        stats.executed, stats.submitted, stats.panicked
    );
    Ok(())
}
