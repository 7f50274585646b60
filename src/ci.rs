//! Failure annotations for CI platforms.

use crate::config::CiKind;
use crate::results::FailedTest;

/// One annotation line per failed test, in the format `kind` understands.
pub fn annotations(kind: CiKind, failed: &[FailedTest]) -> Vec<String> {
    failed.iter().map(|test| annotation(kind, test)).collect()
}

fn annotation(kind: CiKind, test: &FailedTest) -> String {
    let path = test.path.join(" > ");
    match kind {
        CiKind::Github => format!(
            "::error title={}::{}",
            escape_github_property(&path),
            escape_github_data(&test.error)
        ),
        CiKind::Azure => format!(
            "##vso[task.logissue type=error]{path}: {}",
            single_line(&test.error)
        ),
        CiKind::Gitlab => format!("ERROR: {path}: {}", single_line(&test.error)),
        CiKind::Jenkins => format!("[FAILED] {path}: {}", single_line(&test.error)),
        CiKind::Console => format!("✗ {path}: {}", single_line(&test.error)),
    }
}

fn escape_github_data(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_github_property(s: &str) -> String {
    escape_github_data(s)
        .replace(':', "%3A")
        .replace(',', "%2C")
}

fn single_line(s: &str) -> String {
    s.lines().collect::<Vec<_>>().join(" | ")
}
