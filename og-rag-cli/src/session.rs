//! Interactive question session for `og-rag query` without a question.
//!
//! Lines starting with `/` change the retrieval settings for the following
//! questions; anything else is answered through the pipeline.

use og_rag::{DocType, MAX_TOP_K, QueryRequest, RagPipeline};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::commands::print_response;

const PROMPT: &str = "question> ";

const HELP: &str = "\
Commands:
  /topk N                 number of sources (1-50)
  /minscore N | off       similarity threshold in [0, 1]; off disables it
  /filter source=X        restrict to a source agency
  /filter doc_type=X      restrict to a document type
  /filter                 clear filters
  /sources on | off       list sources after each answer
  /quit                   leave the session";

/// Retrieval settings carried from one question to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub top_k: usize,
    pub min_score: f32,
    pub source: Option<String>,
    pub doc_type: Option<DocType>,
    pub show_sources: bool,
}

/// What the session loop should do with one input line.
#[derive(Debug, PartialEq)]
pub enum Action {
    Skip,
    Quit,
    Ask(String),
    Updated(String),
    Invalid(String),
}

impl SessionSettings {
    /// Build the request for `question` under the current settings.
    pub fn request(&self, question: &str) -> QueryRequest {
        let mut request = QueryRequest::new(question).with_top_k(self.top_k).with_min_score(self.min_score);
        if let Some(source) = &self.source {
            request = request.with_source(source);
        }
        if let Some(doc_type) = self.doc_type {
            request = request.with_doc_type(doc_type);
        }
        request
    }

    /// Interpret one input line, updating settings for `/` commands.
    pub fn handle(&mut self, line: &str) -> Action {
        let line = line.trim();
        if line.is_empty() {
            return Action::Skip;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Action::Ask(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match name {
            "quit" | "exit" | "q" => Action::Quit,
            "help" | "?" => Action::Updated(HELP.to_string()),
            "sources" => self.set_sources(arg),
            "topk" => self.set_top_k(arg),
            "minscore" => self.set_min_score(arg),
            "filter" => self.set_filter(arg),
            _ => Action::Invalid(format!("unknown command /{name}, try /help")),
        }
    }

    fn set_sources(&mut self, arg: &str) -> Action {
        match arg.to_ascii_lowercase().as_str() {
            "" => {}
            "on" => self.show_sources = true,
            "off" => self.show_sources = false,
            other => return Action::Invalid(format!("expected on or off, got '{other}'")),
        }
        Action::Updated(format!("show sources: {}", if self.show_sources { "on" } else { "off" }))
    }

    fn set_top_k(&mut self, arg: &str) -> Action {
        if arg.is_empty() {
            return Action::Updated(format!("top-k: {}", self.top_k));
        }
        match arg.parse::<usize>() {
            Ok(top_k) if (1..=MAX_TOP_K).contains(&top_k) => {
                self.top_k = top_k;
                Action::Updated(format!("top-k set to {top_k}"))
            }
            _ => Action::Invalid(format!("top-k must be a whole number between 1 and {MAX_TOP_K}")),
        }
    }

    fn set_min_score(&mut self, arg: &str) -> Action {
        match arg.to_ascii_lowercase().as_str() {
            "" => Action::Updated(format!("min score: {}", self.min_score)),
            "off" | "none" => {
                self.min_score = 0.0;
                Action::Updated("min score threshold disabled".to_string())
            }
            value => match value.parse::<f32>() {
                Ok(score) if (0.0..=1.0).contains(&score) => {
                    self.min_score = score;
                    Action::Updated(format!("min score set to {score}"))
                }
                _ => Action::Invalid("min score must be a number in [0, 1] or off".to_string()),
            },
        }
    }

    fn set_filter(&mut self, arg: &str) -> Action {
        if arg.is_empty() || arg.eq_ignore_ascii_case("off") {
            self.source = None;
            self.doc_type = None;
            return Action::Updated("filter cleared".to_string());
        }
        let Some((field, value)) = arg.split_once('=') else {
            return Action::Invalid("expected /filter field=value".to_string());
        };
        let value = value.trim();
        if value.is_empty() {
            return Action::Invalid(format!("missing value for {}", field.trim()));
        }
        match field.trim() {
            "source" => {
                self.source = Some(value.to_lowercase());
                Action::Updated(format!("filter set: source={}", value.to_lowercase()))
            }
            "doc_type" => match value.parse::<DocType>() {
                Ok(doc_type) => {
                    self.doc_type = Some(doc_type);
                    Action::Updated(format!("filter set: doc_type={doc_type}"))
                }
                Err(e) => Action::Invalid(e.to_string()),
            },
            other => Action::Invalid(format!("cannot filter on '{other}', use source or doc_type")),
        }
    }
}

/// Read questions until `/quit`, end of input or Ctrl-C.
pub async fn run(pipeline: &RagPipeline, mut settings: SessionSettings) -> anyhow::Result<()> {
    println!("og-rag interactive session");
    println!("Ask about oil & gas safety, regulations and operations. Type /help for commands.\n");

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if !line.trim().is_empty() {
            editor.add_history_entry(line.as_str())?;
        }

        match settings.handle(&line) {
            Action::Skip => {}
            Action::Quit => break,
            Action::Updated(message) => println!("{message}"),
            Action::Invalid(message) => eprintln!("{message}"),
            Action::Ask(question) => {
                debug!(top_k = settings.top_k, min_score = settings.min_score, "session question");
                match pipeline.answer(&settings.request(&question)).await {
                    Ok(response) => print_response(&response, settings.show_sources),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
        }
    }
    println!("Goodbye!");
    Ok(())
}
