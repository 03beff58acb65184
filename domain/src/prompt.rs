use crate::models::RetrievedDocument;
use thiserror::Error;

pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "
Answer the question based only on the following context:

{context}

---

Answer the question based on the above context: {question}
";

/// Join page contents in rank order. No results gives an empty string.
pub fn build_context(results: &[RetrievedDocument]) -> String {
    results
        .iter()
        .map(|r| r.document.page_content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown placeholder {{{0}}}; only {{context}} and {{question}} are supported")]
    UnknownPlaceholder(String),
    #[error("unbalanced brace at byte {0}; write {{{{ or }}}} for a literal brace")]
    UnbalancedBrace(usize),
    #[error("template never uses {{{0}}}")]
    MissingPlaceholder(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Context,
    Question,
}

/// A prompt with `{context}` and `{question}` slots. `{{` and `}}` are literal
/// braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((idx, c)) = chars.next() {
            match c {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::UnbalancedBrace(idx));
                    }
                    let slot = match name.as_str() {
                        "context" => Segment::Context,
                        "question" => Segment::Question,
                        _ => return Err(TemplateError::UnknownPlaceholder(name)),
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(slot);
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                        continue;
                    }
                    return Err(TemplateError::UnbalancedBrace(idx));
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if !segments.contains(&Segment::Context) {
            return Err(TemplateError::MissingPlaceholder("context"));
        }
        if !segments.contains(&Segment::Question) {
            return Err(TemplateError::MissingPlaceholder("question"));
        }
        Ok(Self { segments })
    }

    /// The built-in question-answering template.
    pub fn builtin() -> Self {
        Self {
            segments: vec![
                Segment::Literal(
                    "\nAnswer the question based only on the following context:\n\n".to_string(),
                ),
                Segment::Context,
                Segment::Literal(
                    "\n\n---\n\nAnswer the question based on the above context: ".to_string(),
                ),
                Segment::Question,
                Segment::Literal("\n".to_string()),
            ],
        }
    }

    /// Single-pass substitution; braces inside the values are left alone.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Context => out.push_str(context),
                Segment::Question => out.push_str(question),
            }
        }
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}
