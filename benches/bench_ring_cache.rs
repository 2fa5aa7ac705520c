//! Manual throughput bench for sequential reads through `RingCache`.
//!
//! Run with `cargo bench` (no `criterion` harness; this crate times its own
//! loop and prints a summary, in the same style as the teacher crate's
//! `harness = false` benches).

use std::io::Cursor;
use std::time::Instant;

use ringcache::{ Config, RingCache, SeekableSource };

fn main() {
    sequential_read_throughput();
    short_seek_latency();
}

fn sequential_read_throughput() {
    const TOTAL: usize = 64 * 1024 * 1024;
    const CHUNK: usize = 64 * 1024;

    let data: Vec<u8> = vec![0u8; TOTAL];
    let source = SeekableSource::new(Cursor::new(data)).unwrap();
    let cache = RingCache::open(source, Config::new()).unwrap();

    let mut buf = vec![0u8; CHUNK];
    let start = Instant::now();
    let mut read_total = 0usize;
    while read_total < TOTAL {
        let n = cache.read(&mut buf).expect("not interrupted");
        if n == 0 {
            break;
        }
        read_total += n;
    }
    let elapsed = start.elapsed();
    let mb_per_sec = (read_total as f64) / elapsed.as_secs_f64() / (1024.0 * 1024.0);
    println!("sequential_read_throughput: {} bytes in {:?} ({:.1} MiB/s)", read_total, elapsed, mb_per_sec);
}

fn short_seek_latency() {
    const TOTAL: usize = 16 * 1024 * 1024;
    const ITERATIONS: usize = 200;

    let data: Vec<u8> = vec![0u8; TOTAL];
    let source = SeekableSource::new(Cursor::new(data)).unwrap();
    let cache = RingCache::open(source, Config::new()).unwrap();

    let mut buf = vec![0u8; 4096];
    cache.read(&mut buf).unwrap();

    let start = Instant::now();
    for i in 0..ITERATIONS {
        let target = (i as u64) * 4096 % (1024 * 1024);
        cache.set_position(target).unwrap();
        cache.read(&mut buf).expect("short seeks never deadlock");
    }
    let elapsed = start.elapsed();
    println!("short_seek_latency: {} seeks in {:?} ({:?}/seek)", ITERATIONS, elapsed, elapsed / (ITERATIONS as u32));
}
