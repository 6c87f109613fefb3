//! Fuzz report export

use crate::runner::FuzzResult;
use serde::{Deserialize, Serialize};

/// Full report of one fuzz run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzReport {
    /// Report timestamp (Unix ms)
    pub timestamp_ms: i64,
    pub seed: u64,
    pub total_duration_ms: u64,
    pub results: Vec<FuzzResult>,
    pub summary: ReportSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_targets: u32,
    pub targets_passed: u32,
    pub targets_failed: u32,
    pub total_cases: u64,
    pub cases_passed: u64,
    pub cases_failed: u64,
    /// 0-1
    pub pass_rate: f64,
}

impl FuzzReport {
    pub fn new(seed: u64, results: Vec<FuzzResult>) -> Self {
        let total_targets = results.len() as u32;
        let targets_passed = results.iter().filter(|r| r.passed).count() as u32;
        let total_cases: u64 = results.iter().map(|r| r.cases_run).sum();
        let cases_passed: u64 = results.iter().map(|r| r.cases_passed).sum();
        let cases_failed: u64 = results.iter().map(|r| r.cases_failed).sum();
        let pass_rate = if total_cases > 0 {
            cases_passed as f64 / total_cases as f64
        } else {
            0.0
        };

        Self {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            seed,
            total_duration_ms: results.iter().map(|r| r.duration_ms).sum(),
            results,
            summary: ReportSummary {
                total_targets,
                targets_passed,
                targets_failed: total_targets - targets_passed,
                total_cases,
                cases_passed,
                cases_failed,
                pass_rate,
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Markdown table (for PR comments)
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("## Fuzz Results\n\n");
        md.push_str(&format!(
            "**{}/{}** targets passed, {} cases, pass rate {:.2}%\n\n",
            self.summary.targets_passed,
            self.summary.total_targets,
            self.summary.total_cases,
            self.summary.pass_rate * 100.0
        ));
        md.push_str("| Target | Cases | Failed | Duration (ms) | Status |\n");
        md.push_str("|--------|-------|--------|---------------|--------|\n");
        for r in &self.results {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                r.name,
                r.cases_run,
                r.cases_failed,
                r.duration_ms,
                if r.passed { "✅" } else { "❌" }
            ));
        }
        md
    }

    pub fn print(&self) {
        for result in &self.results {
            result.print_summary();
            println!();
        }
        println!("════════════════════════════════════════════════════════════════");
        println!(
            "TOTAL: {} targets, {} cases, {} passed, {} failed",
            self.summary.total_targets,
            self.summary.total_cases,
            self.summary.cases_passed,
            self.summary.cases_failed
        );
        println!(
            "OVERALL: {}",
            if self.summary.targets_failed == 0 {
                "✓ ALL PASSED"
            } else {
                "✗ SOME FAILED"
            }
        );
        println!("════════════════════════════════════════════════════════════════");
    }
}
