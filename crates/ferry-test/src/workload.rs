use ferry_client::{Row, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ITEMS: &[&str] = &["tea", "coffee", "milk", "sugar", "bread", "butter"];
const SOURCES: &[&str] = &["web", "mobile", "batch"];

/// Reproducible row streams for the fixture tables.
pub struct Workload {
    rng: StdRng,
}

impl Workload {
    /// Creates a generator with a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `orders` rows with ids `first..first + count`, in id order.
    pub fn orders(&mut self, first: i64, count: usize) -> Vec<Row> {
        (first..)
            .take(count)
            .map(|id| {
                let item = ITEMS[self.rng.gen_range(0..ITEMS.len())];
                let qty: i64 = self.rng.gen_range(1..=20);
                Row::new(vec![Value::Int(id), Value::from(item), Value::Int(qty)])
            })
            .collect()
    }

    /// `events` rows; the table has no key, so repeats are allowed.
    pub fn events(&mut self, count: usize) -> Vec<Row> {
        (0..count)
            .map(|_| {
                let source = SOURCES[self.rng.gen_range(0..SOURCES.len())];
                let n: u32 = self.rng.gen();
                Row::new(vec![
                    Value::from(source),
                    Value::Json(format!("{{\"n\":{n}}}")),
                ])
            })
            .collect()
    }
}
