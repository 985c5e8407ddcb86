//! Command execution helpers for `revk`.
//!
//! This module owns the runtime flow for each subcommand: configuration
//! resolution, collaborator setup, and rendering the outcome to the terminal.

use log::{error, info};
use revk::artifact::{self, CollectedReview};
use revk::config::ReviewConfig;
use revk::github::GitHubClient;
use revk::llm::LlmClient;
use revk::phrase::PatternPhrases;
use revk::printer::{write_collected, write_outcome};
use revk::ref_parser::PullRequestRef;
use revk::state::FileStateStore;
use revk::{
    ApproveArgs, CollectArgs, GlobalArgs, ReviewArgs, Reviewer, RevkError, RunOutcome, SubmitArgs,
};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use termimad::MadSkin;

/// Collaborators shared by every subcommand.
struct Session {
    config: ReviewConfig,
    github: GitHubClient,
    store: FileStateStore,
    phrases: PatternPhrases,
}

impl Session {
    fn new(global: &GlobalArgs, reference: Option<&str>) -> Result<Self, RevkError> {
        let config = ReviewConfig::from_args(global, reference)?;
        let github = GitHubClient::new(
            &config.github_token,
            config.github_api_url.as_deref(),
            &config.http,
        )?;
        let store = FileStateStore::new(&config.workspace);
        Ok(Self {
            config,
            github,
            store,
            phrases: PatternPhrases::default(),
        })
    }

    fn pull_request(&self) -> &PullRequestRef {
        &self.config.pull_request
    }

    fn reviewer(&self) -> Reviewer<'_, GitHubClient, GitHubClient, FileStateStore> {
        Reviewer::new(&self.github, &self.github, &self.store, &self.phrases)
    }

    fn annotator(&self) -> Result<LlmClient, RevkError> {
        let llm = self.config.llm()?;
        LlmClient::new(
            &llm.api_key,
            llm.endpoint.as_deref(),
            llm.model.as_deref(),
            &self.config.http,
        )
    }

    fn artifact_path(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit.unwrap_or_else(|| {
            artifact::default_path(&self.config.workspace, &self.pull_request().state_key())
        })
    }
}

fn caused_by_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|c| {
        c.downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == ErrorKind::BrokenPipe)
    })
}

/// Render with `print` to a locked stdout.
///
/// Rendering failures are logged rather than propagated: the review has
/// already been submitted or saved by the time anything is printed. A
/// closed pipe is silently ignored.
fn render<F>(print: F)
where
    F: FnOnce(&mut std::io::StdoutLock<'static>, &MadSkin) -> anyhow::Result<()>,
{
    let skin = MadSkin::default();
    let mut out = std::io::stdout().lock();
    match print(&mut out, &skin) {
        Err(e) if !caused_by_broken_pipe(&e) => error!("error printing review: {e}"),
        _ => {}
    }
}

fn print_outcome(outcome: &RunOutcome) {
    render(|out, skin| write_outcome(out, skin, outcome));
}

fn print_collected(review: &CollectedReview, path: &Path) {
    render(|out, skin| {
        write_collected(&mut *out, skin, review)?;
        writeln!(out, "Saved collected review to {}", path.display())?;
        Ok(())
    });
}

pub async fn run_review(args: ReviewArgs, global: &GlobalArgs) -> Result<(), RevkError> {
    let session = Session::new(global, args.reference.as_deref())?;
    let annotator = session.annotator()?;
    let outcome = session
        .reviewer()
        .run(session.pull_request(), &annotator)
        .await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn run_collect(args: CollectArgs, global: &GlobalArgs) -> Result<(), RevkError> {
    let session = Session::new(global, args.reference.as_deref())?;
    let annotator = session.annotator()?;
    let collected = session
        .reviewer()
        .collect(session.pull_request(), &annotator)
        .await?;
    let Some(review) = collected else {
        print_outcome(&RunOutcome::UpToDate);
        return Ok(());
    };
    let path = session.artifact_path(args.output);
    artifact::write(&path, &review)?;
    print_collected(&review, &path);
    Ok(())
}

pub async fn run_submit(args: SubmitArgs, global: &GlobalArgs) -> Result<(), RevkError> {
    let session = Session::new(global, args.reference.as_deref())?;
    let path = session.artifact_path(args.input);
    let collected = artifact::read(&path)?;
    info!(
        "submitting {} collected comment(s) from {}",
        collected.comments.len(),
        path.display()
    );
    let outcome = session
        .reviewer()
        .submit_collected(session.pull_request(), collected)
        .await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn run_approve(args: ApproveArgs, global: &GlobalArgs) -> Result<(), RevkError> {
    let session = Session::new(global, args.reference.as_deref())?;
    let outcome = session
        .reviewer()
        .approve(session.pull_request(), args.message.as_deref())
        .await?;
    print_outcome(&outcome);
    Ok(())
}

#[cfg(test)]
mod tests;
