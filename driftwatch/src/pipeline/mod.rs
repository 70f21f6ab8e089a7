//! Workspace processing pipeline
//!
//! The unit of work is a [`Processor`]: a function from a sequence of
//! workspaces to a (possibly filtered, mutated or reordered) sequence, or a
//! failure. A [`ProcessorChain`] composes an ordered list of processors,
//! short-circuiting on the first failure. Per-item concurrency is internal
//! to a stage and always resolved back to the original input order before
//! the next stage runs.

pub mod filter;
pub mod hydrate;
pub mod plan;
pub mod result;
pub mod sort;
pub mod wait;

use anyhow::{Context, Result};
use async_trait::async_trait;
use driftwatch_core::domain::Workspace;

/// Knows how to process a list of workspaces.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>>;
}

/// Executes a chain of processors, threading the output of one as the input
/// of the next. On any child error it returns immediately with a wrapped
/// error and no partial result.
pub struct ProcessorChain {
    processors: Vec<Box<dyn Processor>>,
}

impl ProcessorChain {
    pub fn new(processors: Vec<Box<dyn Processor>>) -> Self {
        Self { processors }
    }
}

#[async_trait]
impl Processor for ProcessorChain {
    async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        let mut workspaces = workspaces;
        for processor in &self.processors {
            workspaces = processor
                .process(workspaces)
                .await
                .context("processor failed")?;
        }

        Ok(workspaces)
    }
}

/// Doesn't do anything.
pub struct NoopProcessor;

#[async_trait]
impl Processor for NoopProcessor {
    async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        Ok(workspaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    struct AppendProcessor(Vec<&'static str>);

    #[async_trait]
    impl Processor for AppendProcessor {
        async fn process(&self, mut workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
            for id in &self.0 {
                workspaces.push(Workspace::new(*id, *id, "org"));
            }
            Ok(workspaces)
        }
    }

    struct DropLastProcessor;

    #[async_trait]
    impl Processor for DropLastProcessor {
        async fn process(&self, mut workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
            workspaces.pop();
            Ok(workspaces)
        }
    }

    struct RenameProcessor;

    #[async_trait]
    impl Processor for RenameProcessor {
        async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
            Ok(workspaces
                .into_iter()
                .map(|mut wk| {
                    wk.id = format!("{}-mutated", wk.id);
                    wk
                })
                .collect())
        }
    }

    struct FailingProcessor;

    #[async_trait]
    impl Processor for FailingProcessor {
        async fn process(&self, _workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
            bail!("something")
        }
    }

    fn workspaces(ids: &[&str]) -> Vec<Workspace> {
        ids.iter().map(|id| Workspace::new(*id, *id, "org")).collect()
    }

    fn ids(wks: &[Workspace]) -> Vec<String> {
        wks.iter().map(|wk| wk.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_empty_chain_is_identity() {
        let chain = ProcessorChain::new(vec![]);
        let got = chain.process(workspaces(&["test1", "test2"])).await.unwrap();
        assert_eq!(ids(&got), vec!["test1", "test2"]);
    }

    #[tokio::test]
    async fn test_chain_threads_aggregating_processors() {
        let chain = ProcessorChain::new(vec![
            Box::new(AppendProcessor(vec!["test3"])),
            Box::new(AppendProcessor(vec!["test4"])),
            Box::new(AppendProcessor(vec!["test5"])),
        ]);
        let got = chain.process(workspaces(&["test1", "test2"])).await.unwrap();
        assert_eq!(ids(&got), vec!["test1", "test2", "test3", "test4", "test5"]);
    }

    #[tokio::test]
    async fn test_chain_threads_reducing_processors() {
        let chain = ProcessorChain::new(vec![Box::new(DropLastProcessor)]);
        let got = chain.process(workspaces(&["test1", "test2"])).await.unwrap();
        assert_eq!(ids(&got), vec!["test1"]);
    }

    #[tokio::test]
    async fn test_chain_threads_mutating_processors() {
        let chain = ProcessorChain::new(vec![Box::new(RenameProcessor)]);
        let got = chain.process(workspaces(&["test1", "test2"])).await.unwrap();
        assert_eq!(ids(&got), vec!["test1-mutated", "test2-mutated"]);
    }

    #[tokio::test]
    async fn test_chain_short_circuits_on_failure() {
        let chain = ProcessorChain::new(vec![
            Box::new(FailingProcessor),
            Box::new(AppendProcessor(vec!["never"])),
        ]);
        let err = chain
            .process(workspaces(&["test1", "test2"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("processor failed"));
    }

    #[tokio::test]
    async fn test_noop_composition_preserves_order() {
        let chain = ProcessorChain::new(vec![
            Box::new(NoopProcessor),
            Box::new(NoopProcessor),
            Box::new(NoopProcessor),
        ]);
        let got = chain
            .process(workspaces(&["a", "c", "b", "d"]))
            .await
            .unwrap();
        assert_eq!(ids(&got), vec!["a", "c", "b", "d"]);
    }
}
