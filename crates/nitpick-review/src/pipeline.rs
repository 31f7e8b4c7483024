use std::collections::HashSet;
use std::fmt;

use nitpick_core::{Comment, NitpickError, PipelineConfig, PullRequest};
use serde::Serialize;

use crate::decode::{decode_comments, Decoded};
use crate::github::PullRequestHost;
use crate::llm::ChatModel;
use crate::prompt;

/// Pipeline stage, used to label progress and decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetching the PR diff.
    FetchDiff,
    /// First model pass over the diff.
    Analyze,
    /// Review-and-refine model pass.
    Refine,
    /// Fetching comments already on the PR.
    FetchExisting,
    /// Deduplication model pass.
    Dedupe,
    /// Posting comments back to the PR.
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::FetchDiff => write!(f, "diff fetch"),
            Stage::Analyze => write!(f, "analysis"),
            Stage::Refine => write!(f, "refinement"),
            Stage::FetchExisting => write!(f, "existing-comment fetch"),
            Stage::Dedupe => write!(f, "deduplication"),
            Stage::Publish => write!(f, "publish"),
        }
    }
}

/// Outcome of a completed pipeline run.
///
/// # Examples
///
/// ```
/// use nitpick_review::pipeline::PipelineReport;
///
/// let report = PipelineReport::default();
/// assert_eq!(report.posted, 0);
/// ```
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    /// Comments decoded from the first analysis pass.
    pub raw_count: usize,
    /// Comments remaining after refinement (equal to `raw_count` when the
    /// refine pass is disabled).
    pub refined_count: usize,
    /// Comments remaining after deduplication.
    pub final_count: usize,
    /// Model-emitted records rejected by schema validation, across stages.
    pub rejected_count: usize,
    /// Comments dropped because they named files absent from the diff.
    pub off_diff_count: usize,
    /// Comments successfully posted.
    pub posted: usize,
    /// Comments whose post failed (only non-zero with continue-on-error).
    pub failed: usize,
    /// The final comment batch (what was, or would be, posted).
    pub comments: Vec<Comment>,
    /// Model identifier used for the run.
    pub model: String,
    /// Whether publishing was skipped.
    pub dry_run: bool,
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Review Run")?;
        writeln!(f, "==========")?;
        writeln!(
            f,
            "Model: {} | Raw: {} | Refined: {} | Final: {} | Posted: {} | Failed: {}",
            self.model, self.raw_count, self.refined_count, self.final_count, self.posted,
            self.failed,
        )?;
        if self.rejected_count > 0 {
            writeln!(f, "Rejected malformed records: {}", self.rejected_count)?;
        }
        if self.off_diff_count > 0 {
            writeln!(f, "Dropped off-diff comments: {}", self.off_diff_count)?;
        }
        if self.dry_run {
            writeln!(f, "(dry run: nothing was posted)")?;
        }
        writeln!(f)?;

        if self.comments.is_empty() {
            writeln!(f, "No comments to post.")?;
        } else {
            for c in &self.comments {
                let line = c
                    .line
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "?".into());
                writeln!(f, "[{}] {}:{line}", c.category, c.file)?;
                writeln!(f, "  {}", c.suggestion)?;
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl PipelineReport {
    /// Render the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Review Run\n\n");
        out.push_str(&format!(
            "**Model:** {} | **Raw:** {} | **Refined:** {} | **Final:** {} | **Posted:** {}\n\n",
            self.model, self.raw_count, self.refined_count, self.final_count, self.posted,
        ));
        if self.comments.is_empty() {
            out.push_str("No comments to post.\n");
        } else {
            for c in &self.comments {
                out.push_str(&format!("{}\n\n---\n\n", format_comment_body(c)));
            }
        }
        out
    }
}

/// Orchestrator for the five-step review pipeline.
///
/// Runs strictly sequentially: fetch diff, analyze (plus optional refine),
/// fetch existing comments, deduplicate, publish. Each stage's full output
/// feeds the next; nothing runs concurrently and nothing is retried here —
/// bounded retries live inside the model client.
///
/// Generic over the host and model seams so tests can drive the orchestration
/// with doubles instead of live services.
pub struct ReviewPipeline<H, M> {
    host: H,
    model: M,
    config: PipelineConfig,
    dry_run: bool,
    verbose: bool,
}

impl<H: PullRequestHost, M: ChatModel> ReviewPipeline<H, M> {
    /// Create a pipeline from a host, a model, and pipeline configuration.
    pub fn new(host: H, model: M, config: PipelineConfig) -> Self {
        Self {
            host,
            model,
            config,
            dry_run: false,
            verbose: false,
        }
    }

    /// Skip the publish stage and only report what would be posted.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Print stage progress to stderr.
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Run the full pipeline against one pull request.
    ///
    /// Fatal errors (diff fetch, any decode failure, publish failure under
    /// the abort policy) propagate to the caller; the existing-comment fetch
    /// degrades to an empty string instead of aborting.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`NitpickError`] encountered.
    pub async fn run(&self, pr: &PullRequest) -> Result<PipelineReport, NitpickError> {
        let mut report = PipelineReport {
            model: self.model.model().to_string(),
            dry_run: self.dry_run,
            ..PipelineReport::default()
        };

        // Stage 1: fetch diff. A failure here is fatal; the run must not
        // proceed with partial or empty diff text.
        self.progress(Stage::FetchDiff);
        let diff = self.host.fetch_pr_diff(pr).await?;

        // Stage 2: analyze.
        self.progress(Stage::Analyze);
        let reply = self
            .model
            .chat(prompt::analyze_instruction(), &diff)
            .await?;
        let mut comments = self.decoded(Stage::Analyze, &reply, &mut report)?;
        report.raw_count = comments.len();

        // Stage 2b: refine. Schema in, schema out.
        if self.config.refine && !comments.is_empty() {
            self.progress(Stage::Refine);
            let payload = prompt::refine_payload(&comments)?;
            let reply = self
                .model
                .chat(prompt::refine_instruction(), &payload)
                .await?;
            comments = self.decoded(Stage::Refine, &reply, &mut report)?;
        }
        report.refined_count = comments.len();

        // Stages 3 and 4: fetch existing comments and deduplicate. The fetch
        // is the one non-fatal external call: deduplicating against nothing
        // is a safe fallback, so a failure degrades to an empty string.
        if self.config.dedupe && !comments.is_empty() {
            self.progress(Stage::FetchExisting);
            let existing = match self.host.fetch_existing_comments(pr).await {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("warning: could not fetch existing comments: {e}");
                    String::new()
                }
            };

            self.progress(Stage::Dedupe);
            let payload = prompt::dedupe_payload(&comments, &existing)?;
            let reply = self
                .model
                .chat(prompt::dedupe_instruction(), &payload)
                .await?;
            comments = self.decoded(Stage::Dedupe, &reply, &mut report)?;
        }

        if self.config.restrict_to_diff {
            let known = diff_file_set(&diff);
            let before = comments.len();
            comments.retain(|c| known.contains(c.file.as_str()));
            report.off_diff_count = before - comments.len();
            if report.off_diff_count > 0 {
                eprintln!(
                    "warning: dropped {} comment(s) referencing files outside the diff",
                    report.off_diff_count
                );
            }
        }
        report.final_count = comments.len();

        // Stage 5: publish, one issue comment per record. No batching and no
        // rollback: a failure partway leaves the earlier comments posted.
        if !self.dry_run {
            self.progress(Stage::Publish);
            for comment in &comments {
                let body = format_comment_body(comment);
                match self.host.post_comment(pr, &body).await {
                    Ok(()) => report.posted += 1,
                    Err(e) => {
                        if self.config.continue_on_publish_error {
                            eprintln!("warning: failed to post comment for {}: {e}", comment.file);
                            report.failed += 1;
                        } else {
                            return Err(NitpickError::Publish(format!(
                                "aborted after posting {} of {} comments: {e}",
                                report.posted,
                                comments.len()
                            )));
                        }
                    }
                }
            }
        }

        report.comments = comments;
        Ok(report)
    }

    fn decoded(
        &self,
        stage: Stage,
        reply: &str,
        report: &mut PipelineReport,
    ) -> Result<Vec<Comment>, NitpickError> {
        let Decoded { comments, rejected } =
            decode_comments(reply).map_err(|e| label_stage(stage, e))?;
        for r in &rejected {
            eprintln!(
                "warning: {stage} reply record {} rejected: {}",
                r.index, r.reason
            );
        }
        report.rejected_count += rejected.len();
        Ok(comments)
    }

    fn progress(&self, stage: Stage) {
        if self.verbose {
            eprintln!("stage: {stage}");
        }
    }
}

fn label_stage(stage: Stage, err: NitpickError) -> NitpickError {
    match err {
        NitpickError::Decode { message, raw } => NitpickError::Decode {
            message: format!("{stage} reply: {message}"),
            raw,
        },
        NitpickError::Shape(observed) => {
            NitpickError::Shape(format!("{observed} (in {stage} reply)"))
        }
        other => other,
    }
}

/// Render one comment as the issue-comment body posted to the PR.
///
/// Fixed template order: file, line, type, suggestion. A missing line is
/// flagged rather than omitted so readers know the model gave no anchor.
///
/// # Examples
///
/// ```
/// use nitpick_core::{Category, Comment};
/// use nitpick_review::pipeline::format_comment_body;
///
/// let body = format_comment_body(&Comment {
///     file: "a.py".into(),
///     line: Some(5),
///     suggestion: "use a named constant".into(),
///     category: Category::GoodCodePractice,
/// });
/// assert!(body.contains("**File:** a.py"));
/// assert!(body.contains("**Line:** 5"));
/// ```
pub fn format_comment_body(comment: &Comment) -> String {
    let line = comment
        .line
        .map(|l| l.to_string())
        .unwrap_or_else(|| "(not specified)".into());
    format!(
        "**File:** {}\n**Line:** {line}\n**Type:** {}\n\n**Suggestion:**\n{}",
        comment.file, comment.category, comment.suggestion
    )
}

/// Collect the file names appearing in `File:` headers of the diff text.
fn diff_file_set(diff: &str) -> HashSet<&str> {
    diff.lines()
        .filter_map(|l| l.strip_prefix("File: "))
        .map(str::trim)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nitpick_core::Category;

    #[test]
    fn body_template_orders_fields() {
        let body = format_comment_body(&Comment {
            file: "src/auth.py".into(),
            line: Some(42),
            suggestion: "validate the token".into(),
            category: Category::Security,
        });
        let file_pos = body.find("**File:** src/auth.py").unwrap();
        let line_pos = body.find("**Line:** 42").unwrap();
        let type_pos = body.find("**Type:** Security").unwrap();
        let suggestion_pos = body.find("**Suggestion:**\nvalidate the token").unwrap();
        assert!(file_pos < line_pos);
        assert!(line_pos < type_pos);
        assert!(type_pos < suggestion_pos);
    }

    #[test]
    fn body_flags_missing_line() {
        let body = format_comment_body(&Comment {
            file: "a.py".into(),
            line: None,
            suggestion: "x".into(),
            category: Category::Logic,
        });
        assert!(body.contains("**Line:** (not specified)"));
    }

    #[test]
    fn diff_file_set_extracts_headers() {
        let diff = "File: a.py\n@@ -1 +1 @@\n-x\n+y\n\nFile: b.py\n@@ -2 +2 @@\n";
        let set = diff_file_set(diff);
        assert!(set.contains("a.py"));
        assert!(set.contains("b.py"));
        assert!(!set.contains("c.py"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn stage_labels_read_naturally() {
        assert_eq!(Stage::Analyze.to_string(), "analysis");
        assert_eq!(Stage::FetchExisting.to_string(), "existing-comment fetch");
    }

    #[test]
    fn label_stage_decorates_decode_errors() {
        let err = label_stage(
            Stage::Refine,
            NitpickError::Decode {
                message: "bad token".into(),
                raw: "x".into(),
            },
        );
        assert!(err.to_string().contains("refinement reply"));

        let err = label_stage(Stage::Dedupe, NitpickError::Shape("object".into()));
        assert!(err.to_string().contains("deduplication reply"));
    }

    #[test]
    fn report_display_mentions_counts() {
        let report = PipelineReport {
            raw_count: 3,
            refined_count: 2,
            final_count: 1,
            posted: 1,
            model: "gpt-4o-mini".into(),
            comments: vec![Comment {
                file: "a.py".into(),
                line: Some(1),
                suggestion: "fix".into(),
                category: Category::Logic,
            }],
            ..PipelineReport::default()
        };
        let text = format!("{report}");
        assert!(text.contains("Raw: 3"));
        assert!(text.contains("[Logic] a.py:1"));

        let md = report.to_markdown();
        assert!(md.contains("# Review Run"));
        assert!(md.contains("**File:** a.py"));
    }
}
