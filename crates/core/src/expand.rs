use crate::traits::TextGenerator;
use crate::SearchError;
use std::sync::Arc;

/// Turns one user question into several paraphrased queries to widen
/// nearest-neighbor recall. A generator failure propagates so the
/// retriever never silently searches with zero queries.
pub struct QueryExpander<G> {
    generator: Arc<G>,
}

impl<G> QueryExpander<G>
where
    G: TextGenerator + Send + Sync,
{
    pub fn new(generator: Arc<G>) -> Self {
        Self { generator }
    }

    /// Always returns at least one query: the parsed paraphrasings, or
    /// the original question when the model output yields none.
    pub async fn expand(&self, question: &str) -> Result<Vec<String>, SearchError> {
        let raw = self
            .generator
            .complete(&expansion_prompt(question))
            .await?;

        let queries = parse_query_lines(&raw);
        if queries.is_empty() {
            return Ok(vec![question.trim().to_string()]);
        }
        Ok(queries)
    }
}

fn expansion_prompt(question: &str) -> String {
    format!(
        "You are an AI language model assistant. Your task is to generate three \
different versions of the given user question to retrieve relevant documents from a vector \
database. By generating multiple perspectives on the user question, your goal is to help \
the user overcome some of the limitations of the distance-based similarity search. \
Provide these alternative questions separated by newlines. Original question: {question}"
    )
}

/// Split on newlines, trim, drop empty lines.
fn parse_query_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_query_lines, QueryExpander};
    use crate::traits::TextGenerator;
    use crate::SearchError;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct CannedGenerator {
        output: Result<String, String>,
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn complete(&self, _prompt: &str) -> Result<String, SearchError> {
            match &self.output {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(SearchError::Generation(message.clone())),
            }
        }
    }

    #[test]
    fn empty_lines_are_dropped() {
        let parsed = parse_query_lines("first phrasing\n\n  second phrasing  \n\t\n");
        assert_eq!(parsed, vec!["first phrasing", "second phrasing"]);
    }

    #[tokio::test]
    async fn expansion_parses_one_query_per_line() {
        let expander = QueryExpander::new(Arc::new(CannedGenerator {
            output: Ok("what is the total?\nhow much is owed?\ninvoice amount?".to_string()),
        }));

        let queries = expander
            .expand("what does the invoice total?")
            .await
            .expect("expansion should succeed");
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0], "what is the total?");
    }

    #[tokio::test]
    async fn blank_output_falls_back_to_the_original_question() {
        let expander = QueryExpander::new(Arc::new(CannedGenerator {
            output: Ok("\n   \n".to_string()),
        }));

        let queries = expander
            .expand("  what does the invoice total?  ")
            .await
            .expect("expansion should succeed");
        assert_eq!(queries, vec!["what does the invoice total?"]);
    }

    #[tokio::test]
    async fn generator_failure_propagates() {
        let expander = QueryExpander::new(Arc::new(CannedGenerator {
            output: Err("model offline".to_string()),
        }));

        let result = expander.expand("anything").await;
        assert!(matches!(result, Err(SearchError::Generation(_))));
    }
}
