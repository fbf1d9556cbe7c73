//! HTML projection of execution jobs.
//!
//! Every piece of job text passes through [`escape_html`] exactly once on
//! its way into a fragment. Callers hand raw backend text to these
//! functions and must not escape it themselves.

use regex::Regex;
use serde::Serialize;
use std::sync::{Mutex, OnceLock};

use crate::tracker::{ExecutionJob, JobObserver, JobStatus};
use crate::types::TestCase;

/// Replace `& < > " '` with their HTML entities.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn code_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"```(\w+)?\n([\s\S]+?)\n```").expect("valid code block pattern"))
}

/// Escape raw output and lay it out as HTML.
///
/// Fenced blocks (```` ```lang ````) become `<div class="code-block lang">`
/// elements that keep their newlines; newlines elsewhere become `<br>`.
pub fn format_output(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let escaped = escape_html(raw);
    let mut html = String::with_capacity(escaped.len());
    let mut last = 0;

    for caps in code_block_pattern().captures_iter(&escaped) {
        let Some(whole) = caps.get(0) else { continue };
        html.push_str(&line_breaks(&escaped[last..whole.start()]));

        let lang = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let code = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        html.push_str(&format!(r#"<div class="code-block {}">{}</div>"#, lang, code));

        last = whole.end();
    }

    html.push_str(&line_breaks(&escaped[last..]));
    html
}

fn line_breaks(text: &str) -> String {
    text.replace('\n', "<br>")
}

/// Render generated test results, one `test-case` element per test.
pub fn format_tests(tests: &[TestCase]) -> String {
    tests
        .iter()
        .map(|test| {
            let (class, mark) = if test.passed {
                ("passed", "\u{2713}")
            } else {
                ("failed", "\u{2717}")
            };
            let message = test
                .message
                .as_deref()
                .filter(|m| !m.is_empty())
                .map(|m| format!(r#"<div class="test-message">{}</div>"#, escape_html(m)))
                .unwrap_or_default();

            format!(
                r#"<div class="test-case {}"><div class="test-header"><span class="test-name">{}</span><span class="test-status">{}</span></div>{}</div>"#,
                class,
                escape_html(&test.name),
                mark,
                message
            )
        })
        .collect()
}

/// Label shown for each job state.
pub fn status_text(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Idle => "Ready",
        JobStatus::Running => "Executing...",
        JobStatus::Success => "Completed Successfully",
        JobStatus::Error => "Execution Failed",
    }
}

/// Rendered view of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    pub execution_id: Option<String>,
    pub status: JobStatus,
    /// CSS class list for the status element, e.g. `status running`.
    pub status_class: String,
    pub status_html: String,
    /// True while the loading indicator should be shown.
    pub loading: bool,
    pub result_html: Option<String>,
    pub error_html: Option<String>,
}

impl JobView {
    /// Assemble the three console elements into a single fragment.
    pub fn to_html(&self) -> String {
        let mut html = format!(
            r#"<div id="execution-status" class="{}">{}</div>"#,
            self.status_class, self.status_html
        );
        if let Some(result) = &self.result_html {
            html.push_str(&format!(r#"<div id="execution-result">{}</div>"#, result));
        }
        if let Some(error) = &self.error_html {
            html.push_str(&format!(r#"<div id="error-details">{}</div>"#, error));
        }
        html
    }
}

/// Project a job onto its view. Pure; no business logic.
pub fn render(job: &ExecutionJob) -> JobView {
    let status = job.status();
    let status_html = match status {
        JobStatus::Running => r#"Running <div class="loading-spinner"></div>"#.to_string(),
        other => status_text(other).to_string(),
    };

    JobView {
        execution_id: job.id().map(str::to_string),
        status,
        status_class: format!("status {}", status),
        status_html,
        loading: status == JobStatus::Running,
        result_html: job.output().filter(|o| !o.is_empty()).map(format_output),
        error_html: job.error().map(|e| line_breaks(&escape_html(e))),
    }
}

/// Observer that renders every transition and keeps the frames.
#[derive(Debug, Default)]
pub struct HtmlProjector {
    frames: Mutex<Vec<JobView>>,
}

impl HtmlProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// All views rendered so far, oldest first.
    pub fn frames(&self) -> Vec<JobView> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Hand back the rendered views and forget them.
    pub fn take_frames(&self) -> Vec<JobView> {
        std::mem::take(&mut *self.frames.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn latest(&self) -> Option<JobView> {
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl JobObserver for HtmlProjector {
    fn on_transition(&self, job: &ExecutionJob) {
        let view = render(job);
        tracing::trace!(status = %view.status, "Rendered job view");
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackendStatus, ExecutionStatusReport};

    fn finished(status: &str, result: Option<&str>, error: Option<&str>) -> ExecutionJob {
        let mut job = ExecutionJob::new();
        job.start("exec-1".to_string());
        job.apply(&ExecutionStatusReport {
            execution_id: None,
            status: BackendStatus::from(status.to_string()),
            result: result.map(str::to_string),
            error: error.map(str::to_string),
        });
        job
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_script_output_renders_as_text() {
        let view = render(&finished("completed", Some("<script>alert(1)</script>"), None));
        assert_eq!(
            view.result_html.as_deref(),
            Some("&lt;script&gt;alert(1)&lt;/script&gt;")
        );
        assert!(!view.to_html().contains("<script>"));
    }

    #[test]
    fn test_render_escapes_exactly_once() {
        let view = render(&finished("completed", Some("a &lt; b"), None));
        // The raw text already contains an entity; it is escaped once, not
        // passed through and not escaped twice.
        assert_eq!(view.result_html.as_deref(), Some("a &amp;lt; b"));
    }

    #[test]
    fn test_newlines_become_line_breaks() {
        assert_eq!(format_output("1\n2\n"), "1<br>2<br>");
        assert_eq!(format_output(""), "");
    }

    #[test]
    fn test_code_blocks() {
        let html = format_output("Here:\n```python\nif a < b:\n    print(a)\n```\ndone");
        assert_eq!(
            html,
            "Here:<br><div class=\"code-block python\">if a &lt; b:\n    print(a)</div><br>done"
        );

        let html = format_output("```\nx\n```");
        assert_eq!(html, "<div class=\"code-block \">x</div>");
    }

    #[test]
    fn test_format_tests() {
        let tests = vec![
            TestCase {
                name: "testAdd".to_string(),
                passed: true,
                message: None,
            },
            TestCase {
                name: "test<Div>".to_string(),
                passed: false,
                message: Some("expected 2 & got 3".to_string()),
            },
        ];

        let html = format_tests(&tests);
        assert!(html.starts_with(r#"<div class="test-case passed">"#));
        assert!(html.contains(r#"<span class="test-status">✓</span>"#));
        assert!(html.contains(r#"<div class="test-case failed">"#));
        assert!(html.contains(r#"<span class="test-name">test&lt;Div&gt;</span>"#));
        assert!(html.contains(r#"<span class="test-status">✗</span>"#));
        assert!(html.contains(r#"<div class="test-message">expected 2 &amp; got 3</div>"#));
        assert_eq!(html.matches("test-message").count(), 1);
        assert_eq!(format_tests(&[]), "");
    }

    #[test]
    fn test_running_view_shows_loading() {
        let mut job = ExecutionJob::new();
        job.start("exec-1".to_string());
        let view = render(&job);

        assert!(view.loading);
        assert_eq!(view.status_class, "status running");
        assert!(view.status_html.contains("loading-spinner"));
        assert_eq!(view.result_html, None);
        assert_eq!(view.error_html, None);
    }

    #[test]
    fn test_error_view() {
        let view = render(&finished("failed", None, Some("compile error: line 3\n<eof>")));
        assert_eq!(view.status_html, "Execution Failed");
        assert_eq!(view.status_class, "status error");
        assert_eq!(
            view.error_html.as_deref(),
            Some("compile error: line 3<br>&lt;eof&gt;")
        );
        assert!(view.to_html().contains(r#"<div id="error-details">"#));
    }

    #[test]
    fn test_idle_view() {
        let view = render(&ExecutionJob::new());
        assert_eq!(view.status_html, "Ready");
        assert!(!view.loading);
        assert_eq!(view.execution_id, None);
    }

    #[test]
    fn test_projector_keeps_frames() {
        let projector = HtmlProjector::new();
        let mut job = ExecutionJob::new();
        job.start("exec-1".to_string());
        projector.on_transition(&job);
        projector.on_transition(&finished("completed", Some("ok"), None));

        let frames = projector.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].status, JobStatus::Running);
        assert_eq!(projector.latest().unwrap().status_html, "Completed Successfully");

        assert_eq!(projector.take_frames().len(), 2);
        assert!(projector.frames().is_empty());
        assert_eq!(projector.latest(), None);
    }
}
