//! Answer generator trait and prompt construction.

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;

/// System prompt framing the generator as an oil & gas domain assistant.
pub const SYSTEM_PROMPT: &str = "You are an Oil & Gas domain expert assistant with deep knowledge of:
- Offshore and onshore safety regulations (BSEE, PHMSA, OSHA)
- Equipment operations (BOPs, ESPs, compressors, pipelines, separators)
- Incident investigation and root cause analysis
- HSE compliance and best practices

You have access to a knowledge base of regulatory documents, safety alerts, investigation reports, and technical guidance.

When answering questions:
1. Base your answers on the provided context from the knowledge base
2. Cite specific sources when possible (e.g., \"According to BSEE Safety Alert...\")
3. If the context doesn't contain enough information, say so clearly
4. Provide actionable, practical guidance when appropriate
5. Use industry-standard terminology

If asked about something outside the O&G domain or not covered in the context, acknowledge the limitation.";

/// Answer returned when no candidate clears the score threshold.
pub const NO_RESULTS_ANSWER: &str = "I couldn't find any relevant information in the knowledge base for this query. Try rephrasing your question or lowering the similarity threshold.";

/// Answer returned when relevant sources exist but none fit the context budget.
pub const CONTEXT_OVERFLOW_ANSWER: &str = "Relevant sources were found, but none of them fit within the configured context size, so no grounded answer could be produced. Try raising the context budget or asking a narrower question.";

/// The user message sent alongside [`SYSTEM_PROMPT`].
pub fn user_prompt(question: &str, context: &Context) -> String {
    format!(
        "Based on the following sources from the O&G knowledge base, please answer the question.

<knowledge_base>
{}
</knowledge_base>

<question>
{question}
</question>

Provide a clear, accurate answer based on the sources above. Reference specific sources when making claims.",
        context.render()
    )
}

/// An opaque text generator producing an answer from a question and its context.
///
/// # Example
///
/// ```rust,ignore
/// use og_rag::{AnswerGenerator, assemble};
///
/// let context = assemble(&candidates, 12_000);
/// let answer = generator.generate("What causes ESP motor overheating?", &context).await?;
/// ```
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate an answer grounded in `context`.
    async fn generate(&self, question: &str, context: &Context) -> Result<String>;

    /// A short name for logs and error messages.
    fn name(&self) -> &str {
        "generator"
    }
}
