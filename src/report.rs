//! # Run Report
//!
//! Ordered, append-only result lines of one sync run, plus the paging used by
//! output sinks with a message size limit.

use async_trait::async_trait;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    lines: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Pack whole lines into pages of at most `max_chars` characters, lines
    /// joined by newlines. A line longer than `max_chars` is never split and
    /// gets a page of its own.
    pub fn pages(&self, max_chars: usize) -> Vec<String> {
        let mut pages = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;
        let mut current_lines = 0;

        for line in &self.lines {
            let line_len = line.chars().count();

            if current_lines > 0 && current_len + 1 + line_len > max_chars {
                pages.push(std::mem::take(&mut current));
                current_len = 0;
                current_lines = 0;
            }

            if current_lines > 0 {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(line);
            current_len += line_len;
            current_lines += 1;
        }

        if current_lines > 0 {
            pages.push(current);
        }
        pages
    }
}

/// Output channel the finished report is handed to.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, pages: Vec<String>) -> anyhow::Result<()>;
}
