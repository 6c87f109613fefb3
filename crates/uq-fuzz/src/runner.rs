//! Seeded fuzz case runner
//!
//! Each case gets its own generator derived from the run seed and the case
//! index, so a failing case can be replayed from its index alone.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

// ============================================================================
// Configuration
// ============================================================================

/// Fuzz run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzConfig {
    /// Number of cases per target
    pub cases: u64,
    /// Run seed
    pub seed: u64,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            cases: 10_000,
            seed: 0,
        }
    }
}

impl FuzzConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cases(mut self, n: u64) -> Self {
        self.cases = n;
        self
    }

    pub fn seed(mut self, s: u64) -> Self {
        self.seed = s;
        self
    }

    /// Generator for one case
    pub fn case_rng(&self, case: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ case)
    }
}

// ============================================================================
// Results
// ============================================================================

/// Result of one fuzz target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzResult {
    pub name: String,
    pub cases_run: u64,
    pub cases_passed: u64,
    pub cases_failed: u64,
    pub duration_ms: u64,
    /// Cases per second
    pub throughput: f64,
    pub failures: Vec<FuzzFailure>,
    pub passed: bool,
}

impl FuzzResult {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cases_run: 0,
            cases_passed: 0,
            cases_failed: 0,
            duration_ms: 0,
            throughput: 0.0,
            failures: Vec::new(),
            passed: true,
        }
    }

    pub fn record_pass(&mut self) {
        self.cases_run += 1;
        self.cases_passed += 1;
    }

    pub fn record_fail(&mut self, failure: FuzzFailure) {
        self.cases_run += 1;
        self.cases_failed += 1;
        self.passed = false;
        self.failures.push(failure);
    }

    pub fn finalize(&mut self, duration: Duration) {
        self.duration_ms = duration.as_millis() as u64;
        let secs = duration.as_secs_f64();
        if secs > 0.0 {
            self.throughput = self.cases_run as f64 / secs;
        }
    }

    /// Print summary to stdout
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║ Fuzz Target: {:<46} ║", self.name);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!(
            "║ Cases: {:>10} | Passed: {:>10} | Failed: {:>10} ║",
            self.cases_run, self.cases_passed, self.cases_failed
        );
        println!(
            "║ Duration: {:>7} ms | Throughput: {:>10.0} cases/sec   ║",
            self.duration_ms, self.throughput
        );
        println!(
            "║ Status: {:<52} ║",
            if self.passed { "✓ PASSED" } else { "✗ FAILED" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");

        if !self.failures.is_empty() {
            println!("\nFailures:");
            for (i, f) in self.failures.iter().enumerate().take(5) {
                println!("  [{}] case {}: {}", i + 1, f.case, f.message);
            }
            if self.failures.len() > 5 {
                println!("  ... and {} more", self.failures.len() - 5);
            }
        }
    }
}

/// Details of a failing case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzFailure {
    pub case: u64,
    pub message: String,
}

// ============================================================================
// Runner
// ============================================================================

pub struct FuzzRunner {
    config: FuzzConfig,
    results: Vec<FuzzResult>,
}

impl FuzzRunner {
    pub fn new(config: FuzzConfig) -> Self {
        Self {
            config,
            results: Vec::new(),
        }
    }

    pub fn config(&self) -> &FuzzConfig {
        &self.config
    }

    /// Run `test_fn` once per case with that case's generator
    pub fn run<F>(&mut self, name: &str, test_fn: F) -> &FuzzResult
    where
        F: Fn(&mut StdRng) -> Result<(), String>,
    {
        let mut result = FuzzResult::new(name);
        let start = Instant::now();

        for case in 0..self.config.cases {
            let mut rng = self.config.case_rng(case);
            match test_fn(&mut rng) {
                Ok(()) => result.record_pass(),
                Err(message) => result.record_fail(FuzzFailure { case, message }),
            }
        }

        result.finalize(start.elapsed());
        let index = self.results.len();
        self.results.push(result);
        &self.results[index]
    }

    pub fn results(&self) -> &[FuzzResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<FuzzResult> {
        self.results
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_config_defaults() {
        let config = FuzzConfig::default();
        assert_eq!(config.cases, 10_000);
        assert_eq!(config.seed, 0);
        assert_eq!(FuzzRunner::new(config).config().cases, 10_000);
    }

    #[test]
    fn test_runner_basic() {
        let mut runner = FuzzRunner::new(FuzzConfig::new().cases(500));
        let result = runner.run("always_pass", |_| Ok(()));
        assert!(result.passed);
        assert_eq!(result.cases_passed, 500);
    }

    #[test]
    fn test_runner_with_failures() {
        let mut runner = FuzzRunner::new(FuzzConfig::new().cases(100));
        let result = runner.run("some_fail", |rng| {
            if rng.gen_bool(0.5) {
                Err("coin came up heads".to_string())
            } else {
                Ok(())
            }
        });

        assert!(!result.passed);
        assert_eq!(result.cases_run, 100);
        assert_eq!(result.cases_failed + result.cases_passed, 100);
        assert_eq!(result.failures.len() as u64, result.cases_failed);
        assert!(!runner.all_passed());
    }

    #[test]
    fn test_cases_replayable() {
        let config = FuzzConfig::new().seed(7);
        let a: u64 = config.case_rng(42).gen();
        let b: u64 = config.case_rng(42).gen();
        let c: u64 = config.case_rng(43).gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
