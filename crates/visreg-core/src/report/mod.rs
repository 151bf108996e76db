//! JUnit-style report accumulator
//!
//! The report is an explicit value: load it from a [`ReportStore`], record
//! comparison outcomes, then [`Report::finalize`] it back to the store. One
//! suite exists per case, across runs; every test case carries the run it came
//! from. A `(run, case, file)` triple is recorded at most once.

mod store;
mod xml;


pub use store::{FileStore, MemoryStore, ReportStore};

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use log::{debug, warn};

use crate::compare::Comparison;
use crate::discovery::RunId;

/// Report property holding the highest recorded run
pub const LEDGER_PROPERTY: &str = "visreg.last_run";

/// Default `name` of the report root
pub const DEFAULT_REPORT_NAME: &str = "visreg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseStatus {
    Passed,
    Failed,
    Error,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Passed => "passed",
            CaseStatus::Failed => "failed",
            CaseStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "passed" => Some(CaseStatus::Passed),
            "failed" => Some(CaseStatus::Failed),
            "error" => Some(CaseStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a `<failure>` or `<error>` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub message: String,
    pub kind: String,
    pub details: String,
}

/// One compared image within one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseEntry {
    /// Image file name
    pub name: String,
    /// Case the image belongs to
    pub classname: String,
    pub run: RunId,
    pub status: CaseStatus,
    pub finding: Option<Finding>,
}

/// Counters shared by the root and every suite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub tests: u64,
    pub failures: u64,
    pub errors: u64,
    pub disabled: u64,
}

impl Counters {
    fn count(&mut self, status: CaseStatus) {
        self.tests += 1;
        match status {
            CaseStatus::Passed => {}
            CaseStatus::Failed => self.failures += 1,
            CaseStatus::Error => self.errors += 1,
        }
    }

    fn add(&mut self, other: &Counters) {
        self.tests += other.tests;
        self.failures += other.failures;
        self.errors += other.errors;
        self.disabled += other.disabled;
    }

    pub fn passed(&self) -> u64 {
        self.tests
            .saturating_sub(self.failures)
            .saturating_sub(self.errors)
            .saturating_sub(self.disabled)
    }
}

/// All entries of one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    pub name: String,
    pub counters: Counters,
    pub cases: Vec<TestCaseEntry>,
}

impl TestSuite {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            counters: Counters::default(),
            cases: Vec::new(),
        }
    }

    fn counted(&self) -> Counters {
        let mut counters = Counters {
            disabled: self.counters.disabled,
            ..Counters::default()
        };
        for case in &self.cases {
            counters.count(case.status);
        }
        counters
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub name: String,
    pub counters: Counters,
    last_run: Option<RunId>,
    /// Sorted by suite name
    suites: Vec<TestSuite>,
    recorded: HashSet<(RunId, String, String)>,
}

impl Report {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            counters: Counters::default(),
            last_run: None,
            suites: Vec::new(),
            recorded: HashSet::new(),
        }
    }

    /// Read the report from `store`, or start an empty one named `name`.
    ///
    /// Counters that disagree with the entries are recomputed with a warning.
    /// A document that fails to parse is an error.
    pub fn load(store: &dyn ReportStore, name: &str) -> Result<Self, String> {
        let Some(contents) = store.read()? else {
            debug!("No report at {}; starting a new one", store.describe());
            return Ok(Self::new(name));
        };

        let mut report = xml::parse(&contents)
            .map_err(|e| format!("Failed to parse report {}: {}", store.describe(), e))?;

        if let Err(problem) = report.check_counters() {
            warn!(
                "Report {} has inconsistent counters ({}); recomputing from entries",
                store.describe(),
                problem
            );
            report.recompute_counters();
        }
        Ok(report)
    }

    pub(crate) fn from_parts(
        name: String,
        counters: Counters,
        last_run: Option<RunId>,
        suites: Vec<TestSuite>,
    ) -> Result<Self, String> {
        let mut report = Self {
            name,
            counters,
            last_run,
            suites: Vec::with_capacity(suites.len()),
            recorded: HashSet::new(),
        };

        for suite in suites {
            let index = match report.suite_index(&suite.name) {
                Ok(_) => return Err(format!("duplicate testsuite '{}'", suite.name)),
                Err(index) => index,
            };
            for case in &suite.cases {
                let key = (case.run, suite.name.clone(), case.name.clone());
                if !report.recorded.insert(key) {
                    return Err(format!(
                        "duplicate testcase '{}' for run {} in suite '{}'",
                        case.name, case.run, suite.name
                    ));
                }
            }
            report.suites.insert(index, suite);
        }
        Ok(report)
    }

    /// Record a comparison outcome. Returns false when the triple was already recorded.
    pub fn record(&mut self, case: &str, file: &str, run: RunId, comparison: &Comparison) -> bool {
        let (status, finding) = if comparison.failed() {
            let finding = Finding {
                message: comparison.summary(),
                kind: comparison.failure.as_str().to_string(),
                details: comparison.failure_details(),
            };
            (CaseStatus::Failed, Some(finding))
        } else {
            (CaseStatus::Passed, None)
        };
        self.push(case, file, run, status, finding)
    }

    /// Record an image that could not be compared at all
    pub fn record_error(&mut self, case: &str, file: &str, run: RunId, message: &str) -> bool {
        let finding = Finding {
            message: message.to_string(),
            kind: "decode".to_string(),
            details: String::new(),
        };
        self.push(case, file, run, CaseStatus::Error, Some(finding))
    }

    fn push(
        &mut self,
        case: &str,
        file: &str,
        run: RunId,
        status: CaseStatus,
        finding: Option<Finding>,
    ) -> bool {
        if !self
            .recorded
            .insert((run, case.to_string(), file.to_string()))
        {
            debug!("Run {} {}/{} already recorded; skipping", run, case, file);
            return false;
        }

        let index = match self.suite_index(case) {
            Ok(index) => index,
            Err(index) => {
                self.suites.insert(index, TestSuite::new(case));
                index
            }
        };
        let suite = &mut self.suites[index];
        suite.cases.push(TestCaseEntry {
            name: file.to_string(),
            classname: case.to_string(),
            run,
            status,
            finding,
        });
        suite.counters.count(status);
        self.counters.count(status);
        true
    }

    /// Advance the run ledger; never moves backwards
    pub fn set_last_run(&mut self, run: RunId) {
        self.last_run = Some(self.last_run.map_or(run, |last| last.max(run)));
    }

    pub fn last_run(&self) -> Option<RunId> {
        self.last_run
    }

    pub fn contains(&self, run: RunId, case: &str, file: &str) -> bool {
        self.recorded
            .contains(&(run, case.to_string(), file.to_string()))
    }

    /// Runs with at least one recorded entry
    pub fn recorded_runs(&self) -> BTreeSet<RunId> {
        self.recorded.iter().map(|(run, _, _)| *run).collect()
    }

    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    pub fn suite(&self, name: &str) -> Option<&TestSuite> {
        self.suite_index(name).ok().map(|i| &self.suites[i])
    }

    fn suite_index(&self, name: &str) -> Result<usize, usize> {
        self.suites
            .binary_search_by(|suite| suite.name.as_str().cmp(name))
    }

    /// Serialized document; identical state always yields identical bytes
    pub fn to_xml(&self) -> Result<String, String> {
        xml::serialize(self)
    }

    /// Write the whole report to `store`, replacing previous content
    pub fn finalize(&self, store: &dyn ReportStore) -> Result<(), String> {
        let document = self.to_xml()?;
        store.write(&document)?;
        debug!(
            "Wrote report to {} ({} tests, {} failures, {} errors)",
            store.describe(),
            self.counters.tests,
            self.counters.failures,
            self.counters.errors
        );
        Ok(())
    }

    /// Verify root counters equal suite sums and suite counters match entries
    pub fn check_counters(&self) -> Result<(), String> {
        let mut sum = Counters::default();
        for suite in &self.suites {
            let counted = suite.counted();
            if counted != suite.counters {
                return Err(format!(
                    "suite '{}' counters {:?} do not match its entries {:?}",
                    suite.name, suite.counters, counted
                ));
            }
            sum.add(&suite.counters);
        }
        if sum != self.counters {
            return Err(format!(
                "root counters {:?} do not match suite totals {:?}",
                self.counters, sum
            ));
        }
        Ok(())
    }

    fn recompute_counters(&mut self) {
        let mut total = Counters::default();
        for suite in &mut self.suites {
            suite.counters = suite.counted();
            total.add(&suite.counters);
        }
        self.counters = total;
    }
}
