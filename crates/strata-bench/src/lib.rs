//! Workload profiles for benchmarking Strata allocators and registries.
//!
//! Every profile is a pure function of its seed, so runs are comparable
//! across machines and commits:
//!
//! - [`frame_profile`]: many small, mixed-alignment requests, as a
//!   per-frame scratch allocator sees them
//! - [`level_profile`]: fewer, larger requests, as a per-level allocator
//!   sees them
//! - [`churn_schedule`]: interleaved add/remove steps for registry churn

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

/// One allocation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request {
    /// Bytes requested.
    pub size: usize,
    /// Requested alignment. Always a power of two.
    pub align: usize,
}

/// One step of a registry churn schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChurnStep {
    /// Add a value.
    Add,
    /// Remove the live value at this position (modulo the live count).
    Remove(usize),
}

/// Minimal 64-bit LCG; good enough to spread sizes, not for anything else.
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407))
    }

    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

const ALIGNS: [usize; 5] = [1, 4, 8, 16, 64];

fn requests(seed: u64, count: usize, min: usize, max: usize) -> Vec<Request> {
    let mut rng = Lcg::new(seed);
    let span = (max - min + 1) as u64;
    (0..count)
        .map(|_| Request {
            size: min + rng.below(span) as usize,
            align: ALIGNS[rng.below(ALIGNS.len() as u64) as usize],
        })
        .collect()
}

/// `count` requests of 8 to 256 bytes.
pub fn frame_profile(seed: u64, count: usize) -> Vec<Request> {
    requests(seed, count, 8, 256)
}

/// `count` requests of 4 KiB to 1 MiB.
pub fn level_profile(seed: u64, count: usize) -> Vec<Request> {
    requests(seed, count, 4 * 1024, 1024 * 1024)
}

/// Total bytes a profile asks for, ignoring alignment padding.
pub fn total_size(requests: &[Request]) -> usize {
    requests.iter().map(|r| r.size).sum()
}

/// `steps` registry operations, roughly two adds for every remove.
pub fn churn_schedule(seed: u64, steps: usize) -> Vec<ChurnStep> {
    let mut rng = Lcg::new(seed);
    (0..steps)
        .map(|_| match rng.below(3) {
            0 => ChurnStep::Remove(rng.next() as usize),
            _ => ChurnStep::Add,
        })
        .collect()
}
