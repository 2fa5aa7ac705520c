//! Minimal end-to-end usage of `ringcache` over an in-memory source.

use std::io::Cursor;

use ringcache::{ Config, RingCache, SeekableSource };

fn main() {
    let data: Vec<u8> = (0..(2 * 1024 * 1024u32)).map(|i| (i % 256) as u8).collect();
    let source = SeekableSource::new(Cursor::new(data)).expect("cursor cannot fail to seek");

    let cache = RingCache::open(source, Config::new()).expect("source reports a non-zero size");

    println!("opened cache: size={} can_seek={}", cache.size(), cache.can_seek());

    let mut head = vec![0u8; 32 * 1024];
    let n = cache.read(&mut head).expect("not interrupted");
    println!("read {} bytes sequentially, position={}", n, cache.position());

    cache.set_position(16 * 1024).expect("source is seekable");
    let mut reread = vec![0u8; 1024];
    let n = cache.read(&mut reread).expect("short seek resolves without blocking forever");
    println!("re-read {} bytes from a short seek, position={}", n, cache.position());

    let peeked = cache.peek(64).expect("not interrupted");
    println!("peeked {} bytes without advancing position={}", peeked.len(), cache.position());

    println!("cached_size={}", cache.cached_size());
}
