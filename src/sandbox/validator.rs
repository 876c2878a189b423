//! Script validator — execution-before-execution quality gate.
//!
//! Grounded in `original_source/agent/executor/script_validator.py`'s
//! `ScriptValidator`: a static lint pass (deny-list of obviously dangerous
//! call patterns), an optional output-contract check, and a sandboxed
//! dry-run with a short timeout. Dry-run blocks are logged but never fatal —
//! the caller decides whether to proceed to real execution.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::sandbox::executor::{CodeExecutor, ExecutionRequest, Language};

/// Which validation phase produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Lint,
    Contract,
    DryRun,
    Ok,
}

/// Outcome of one validation pass.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub ok: bool,
    pub kind: ValidationKind,
    pub message: String,
    pub details: String,
}

impl ValidationReport {
    fn pass() -> Self {
        ValidationReport {
            ok: true,
            kind: ValidationKind::Ok,
            message: "validation passed".to_string(),
            details: String::new(),
        }
    }
}

/// Deny-listed call patterns that a dry-run guard blocks by raising instead
/// of performing the real operation. Deliberately a small, non-exhaustive
/// set rather than a full AST analyzer.
const DANGEROUS_PATTERNS: &[&str] = &[
    "os.system(",
    "subprocess.run(",
    "subprocess.Popen(",
    "subprocess.call(",
    "shutil.rmtree(",
    "os.remove(",
    "os.unlink(",
    "socket.socket(",
    "eval(",
    "exec(",
    "__import__(",
];

/// Marker the dry-run guard prelude raises when a blocked call is attempted;
/// seeing this in stderr means the block fired, not that the script is
/// broken.
const BLOCKED_MARKER: &str = "TASKAGENT_BLOCKED_OPERATION";

pub struct ScriptValidator {
    dry_run_timeout: Duration,
}

impl ScriptValidator {
    pub fn new(dry_run_timeout_secs: u64) -> Self {
        ScriptValidator {
            dry_run_timeout: Duration::from_secs(dry_run_timeout_secs.max(1)),
        }
    }

    /// Run the full validation pipeline: lint, optional output-contract
    /// check, optional dry-run. Stops at the first failing phase whose
    /// failure is fatal.
    pub async fn validate(
        &self,
        code: &str,
        executor: &dyn CodeExecutor,
        require_json_output: bool,
        dry_run: bool,
    ) -> Result<ValidationReport> {
        if let Some(report) = self.lint(code) {
            return Ok(report);
        }

        if require_json_output && !self.satisfies_output_contract(code) {
            return Ok(ValidationReport {
                ok: false,
                kind: ValidationKind::Contract,
                message: "output contract not satisfied: script does not print JSON".to_string(),
                details: "expected a final print(json.dumps({...})) call".to_string(),
            });
        }

        if dry_run {
            let (ok, message, details, fatal) = self.dry_run(code, executor).await?;
            if !ok && fatal {
                return Ok(ValidationReport {
                    ok: false,
                    kind: ValidationKind::DryRun,
                    message,
                    details,
                });
            }
        }

        Ok(ValidationReport::pass())
    }

    /// Static deny-list lint. Returns `Some(report)` on the first dangerous
    /// pattern found outside the dry-run guard's own prelude.
    fn lint(&self, code: &str) -> Option<ValidationReport> {
        for pattern in DANGEROUS_PATTERNS {
            if code.contains(pattern) {
                debug!(pattern, "lint: dangerous call pattern present");
                return Some(ValidationReport {
                    ok: false,
                    kind: ValidationKind::Lint,
                    message: format!("script contains a disallowed call: {}", pattern),
                    details: "remove direct OS/process/network calls; use a registered tool step instead".to_string(),
                });
            }
        }
        None
    }

    fn satisfies_output_contract(&self, code: &str) -> bool {
        code.contains("json.dumps") && code.contains("print(")
    }

    /// Wrap the script in a guard prelude that raises on dangerous
    /// operations, then execute it with a short timeout. A block is
    /// reported as non-fatal; any other runtime error is fatal.
    async fn dry_run(
        &self,
        code: &str,
        executor: &dyn CodeExecutor,
    ) -> Result<(bool, String, String, bool)> {
        let wrapped = format!("{}\n\n{}", guard_prelude(), code);
        let request = ExecutionRequest::new(wrapped, Language::Python)
            .with_timeout(self.dry_run_timeout)
            .with_env("TASKAGENT_DRY_RUN", "1");

        let result = executor.execute(request).await?;

        if result.success {
            return Ok((true, "dry-run passed".to_string(), result.stdout, false));
        }

        let combined = result.combined_output();
        if combined.contains(BLOCKED_MARKER) {
            return Ok((
                false,
                "dry-run blocked a dangerous operation (real execution will proceed)".to_string(),
                combined,
                false,
            ));
        }

        if result.timed_out {
            warn!("dry-run timed out; not treated as fatal");
            return Ok((false, "dry-run timed out".to_string(), "timeout".to_string(), false));
        }

        Ok((
            false,
            "dry-run failed with a runtime error".to_string(),
            combined,
            true,
        ))
    }
}

fn guard_prelude() -> &'static str {
    "# dry-run guard\n\
import os as _ta_os\n\
import shutil as _ta_shutil\n\
import subprocess as _ta_subprocess\n\
\n\
def _ta_block(*args, **kwargs):\n\
    raise RuntimeError('TASKAGENT_BLOCKED_OPERATION: blocked in dry-run')\n\
\n\
_ta_os.system = _ta_block\n\
_ta_os.remove = _ta_block\n\
_ta_os.unlink = _ta_block\n\
_ta_shutil.rmtree = _ta_block\n\
_ta_shutil.move = _ta_block\n\
_ta_subprocess.run = _ta_block\n\
_ta_subprocess.Popen = _ta_block\n\
_ta_subprocess.call = _ta_block"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lint_rejects_subprocess() {
        let validator = ScriptValidator::new(2);
        let report = validator.lint("import subprocess\nsubprocess.run(['ls'])");
        assert!(report.is_some());
        assert_eq!(report.unwrap().kind, ValidationKind::Lint);
    }

    #[test]
    fn lint_accepts_clean_script() {
        let validator = ScriptValidator::new(2);
        assert!(validator.lint("print('hello world')").is_none());
    }

    #[test]
    fn output_contract_requires_json_dumps_and_print() {
        let validator = ScriptValidator::new(2);
        assert!(!validator.satisfies_output_contract("print('hi')"));
        assert!(validator.satisfies_output_contract(
            "import json\nprint(json.dumps({'success': True}))"
        ));
    }
}
