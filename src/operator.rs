use crate::error::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};

/// Input that stops the crawl at the prompt
pub const STOP_TOKEN: &str = "Q";

/// Operator's answer when a listing page brought no new posts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop,
}

impl Decision {
    /// Only the exact stop token stops; any other answer continues
    pub fn from_input(input: &str) -> Self {
        if input.trim_end_matches(['\r', '\n']) == STOP_TOKEN {
            Decision::Stop
        } else {
            Decision::Continue
        }
    }
}

/// Asked whether to keep paging once pages stop yielding new posts
#[async_trait]
pub trait OperatorDecision: Send {
    async fn decide(&mut self, pages_without_new_posts: usize) -> Result<Decision>;
}

/// Prompts on stdout and reads the answer from stdin.
///
/// The reader is kept across prompts so lines buffered ahead of time (piped
/// answers) are not lost between questions.
pub struct ConsolePrompt<R = BufReader<Stdin>, W = Stdout> {
    input: R,
    output: W,
}

impl ConsolePrompt {
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> ConsolePrompt<R, W> {
    /// Prompt on `output` and read answers from `input`
    pub fn with_io(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }
}

#[async_trait]
impl<R, W> OperatorDecision for ConsolePrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn decide(&mut self, _pages_without_new_posts: usize) -> Result<Decision> {
        self.output
            .write_all(
                format!(
                    "No new posts have been found lately. Enter '{}' to stop searching or any key to continue: ",
                    STOP_TOKEN
                )
                .as_bytes(),
            )
            .await?;
        self.output.flush().await?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).await?;
        if read == 0 {
            // Nobody left to answer
            ::log::info!("Standard input closed, stopping");
            return Ok(Decision::Stop);
        }

        Ok(Decision::from_input(&line))
    }
}

/// Replays fixed answers, then continues forever
#[derive(Debug, Default)]
pub struct Scripted {
    answers: VecDeque<Decision>,
    asked: usize,
}

impl Scripted {
    pub fn new(answers: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: 0,
        }
    }

    /// How many times the operator was asked
    pub fn times_asked(&self) -> usize {
        self.asked
    }
}

#[async_trait]
impl OperatorDecision for Scripted {
    async fn decide(&mut self, _pages_without_new_posts: usize) -> Result<Decision> {
        self.asked += 1;
        Ok(self.answers.pop_front().unwrap_or(Decision::Continue))
    }
}
