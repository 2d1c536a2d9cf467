use std::{collections, sync::{self, atomic}, thread};

use serial_test::serial;

use binmalloc::BinAllocator;

#[global_allocator]
static BIN_ALLOCATOR: BinAllocator = BinAllocator::new();

//
//  Tests
//

#[serial]
#[test]
fn concurrent_collections() {
    //  Test that threads contending on the single heap do not corrupt each other's blocks.

    let number_iterations = number_iterations();
    let number_threads = number_threads();

    for iteration in 0..number_iterations {
        let start = RendezVous::new(number_threads);

        let pool = Pool::new(number_threads, |thread_index| {
            let start = start.clone();

            move || {
                start.wait_until_all_ready();

                let mut strings: Vec<String> = Vec::new();
                let mut map = collections::BTreeMap::new();

                for i in 0..512 {
                    let value = format!("{}-{}-{}", thread_index, iteration, i);

                    if i % 3 == 0 {
                        map.insert(i, value.clone().into_boxed_str());
                    }

                    strings.push(value);

                    if i % 7 == 0 {
                        strings.shrink_to_fit();
                    }
                }

                for (i, value) in strings.iter().enumerate() {
                    assert_eq!(format!("{}-{}-{}", thread_index, iteration, i), *value);
                }

                for (i, value) in &map {
                    assert_eq!(strings[*i], **value);
                }

                strings.len() + map.len()
            }
        });

        let results = pool.join();

        assert_eq!(vec![512 + 171; number_threads], results);
    }
}

#[serial]
#[test]
fn producer_consumer() {
    //  Test that blocks allocated on one thread can be released on another.

    let number_iterations = number_iterations();
    let number_threads = number_threads();

    let (sender, receiver) = sync::mpsc::channel::<Vec<Box<usize>>>();

    let producers = Pool::new(number_threads, |thread_index| {
        let sender = sender.clone();

        move || {
            for iteration in 0..number_iterations {
                let batch: Vec<_> = (0..256)
                    .map(|i| Box::new(thread_index * 1_000_000 + iteration * 1_000 + i))
                    .collect();

                sender.send(batch).unwrap();
            }
        }
    });

    drop(sender);

    let consumer = thread::spawn(move || {
        let mut received = 0;

        for batch in receiver {
            for (i, value) in batch.into_iter().enumerate() {
                assert_eq!(i, *value % 1_000);
                received += 1;
            }
        }

        received
    });

    producers.join();

    assert_eq!(number_threads * number_iterations * 256, consumer.join().unwrap());
}

//
//  Multi-threaded helpers
//

//  Threads spawned together, joined together; a panic in any thread fails the test once all are joined.
struct Pool<T>(Vec<thread::JoinHandle<T>>);

impl<T> Pool<T>
    where
        T: Send + 'static
{
    fn new<F, G>(count: usize, factory: F) -> Self
        where
            F: FnMut(usize) -> G,
            G: FnOnce() -> T + Send + 'static,
    {
        Self((0..count).map(factory).map(thread::spawn).collect())
    }

    fn join(self) -> Vec<T> {
        let outcomes: Vec<_> = self.0.into_iter().map(thread::JoinHandle::join).collect();

        outcomes.into_iter()
            .enumerate()
            .map(|(index, outcome)| outcome.unwrap_or_else(|_| panic!("thread {} panicked", index)))
            .collect()
    }
}

//  Single-use barrier, releasing all threads at once to maximize contention.
#[derive(Clone, Debug)]
struct RendezVous(sync::Arc<atomic::AtomicUsize>);

impl RendezVous {
    fn new(count: usize) -> Self { Self(sync::Arc::new(atomic::AtomicUsize::new(count))) }

    fn wait_until_all_ready(&self) {
        self.0.fetch_sub(1, atomic::Ordering::AcqRel);

        while !self.is_ready() {
            std::hint::spin_loop();
        }
    }

    fn is_ready(&self) -> bool { self.0.load(atomic::Ordering::Acquire) == 0 }
}

//
//  Implementation Details
//

fn number_iterations() -> usize { read_number_from_environment("BINMALLOC_MULTI_NUMBER_ITERATIONS", 10) }

fn number_threads() -> usize {
    let default = std::cmp::max(2, std::cmp::min(num_cpus::get(), 8));
    read_number_from_environment("BINMALLOC_MULTI_NUMBER_THREADS", default)
}

fn read_number_from_environment(name: &str, default: usize) -> usize {
    match std::env::var(name).ok().and_then(|value| value.parse().ok()) {
        Some(result) => {
            println!("read_number_from_environment - {}: {}", name, result);
            result
        },
        None => {
            println!("read_number_from_environment - {}: {} (default)", name, default);
            default
        },
    }
}
