use std::sync::LazyLock;

use regex::Regex;

use crate::error::{VvError, VvResult};
use crate::model::{ParsedVerdict, ScoringInvocation, VerificationStatus};

/// Score line printed by the native tutorial binary.
static NATIVE_SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Voice score:\s*(\d+)").unwrap());

/// Score line printed by the Java tutorial.
static MANAGED_SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Voice scored (\d+)").unwrap());

/// Verdict phrasing shared by both tutorials.
static VERDICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)verification\s+(succeeded|failed)").unwrap());

/// Extract score and verdict from a completed scoring run.
///
/// A nonzero exit code short-circuits before any pattern runs. The score is
/// mandatory; the verdict is not, since an engine build can print the score
/// line without the summary sentence. Patterns only ever look at stdout.
pub fn parse(invocation: &ScoringInvocation) -> VvResult<ParsedVerdict> {
    if invocation.exit_code != 0 {
        return Err(VvError::from_process_failure(
            invocation.exit_code,
            invocation.stderr_text.clone(),
        ));
    }

    let score = extract_score(&invocation.stdout_text)
        .ok_or_else(|| VvError::ScoreUnparseable(first_line_snippet(&invocation.stdout_text)))?;

    Ok(ParsedVerdict {
        score,
        status: extract_status(&invocation.stdout_text),
    })
}

/// Ordered dialect list; the first pattern that yields a parseable integer
/// wins. New engine phrasings extend this list, not the call sites.
fn score_patterns() -> [&'static Regex; 2] {
    [&NATIVE_SCORE, &MANAGED_SCORE]
}

fn extract_score(stdout: &str) -> Option<i32> {
    score_patterns().iter().find_map(|pattern| {
        pattern
            .captures(stdout)
            .and_then(|captures| captures[1].parse().ok())
    })
}

fn extract_status(stdout: &str) -> VerificationStatus {
    match VERDICT.captures(stdout) {
        Some(captures) if captures[1].eq_ignore_ascii_case("succeeded") => {
            VerificationStatus::Succeeded
        }
        Some(_) => VerificationStatus::Failed,
        None => VerificationStatus::Unknown,
    }
}

fn first_line_snippet(stdout: &str) -> String {
    let Some(line) = stdout.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return "engine produced no output".to_owned();
    };
    let mut snippet: String = line.chars().take(120).collect();
    if line.chars().count() > 120 {
        snippet.push_str("...");
    }
    snippet
}
