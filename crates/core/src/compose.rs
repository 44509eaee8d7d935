use crate::traits::TextGenerator;
use crate::SearchError;
use std::sync::Arc;

/// Builds the final answer prompt from context, question, and
/// conversation history and delegates to the text generator. No local
/// retry; a collaborator failure is fatal for the request.
pub struct AnswerComposer<G> {
    generator: Arc<G>,
}

impl<G> AnswerComposer<G>
where
    G: TextGenerator + Send + Sync,
{
    pub fn new(generator: Arc<G>) -> Self {
        Self { generator }
    }

    pub async fn compose(
        &self,
        question: &str,
        context: &str,
        history: &str,
    ) -> Result<String, SearchError> {
        self.generator
            .complete(&answer_prompt(question, context, history))
            .await
    }
}

fn answer_prompt(question: &str, context: &str, history: &str) -> String {
    format!(
        "Answer the following question based on this context:\n\
{context}\n\
Question: {question}\n\
History: {history}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::{answer_prompt, AnswerComposer};
    use crate::traits::TextGenerator;
    use crate::SearchError;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn complete(&self, prompt: &str) -> Result<String, SearchError> {
            Ok(prompt.to_string())
        }
    }

    #[test]
    fn prompt_embeds_all_parts_verbatim() {
        let prompt = answer_prompt("the question?", "some context", "earlier turns");
        assert!(prompt.contains("some context"));
        assert!(prompt.contains("Question: the question?"));
        assert!(prompt.contains("History: earlier turns"));
    }

    #[tokio::test]
    async fn composer_sends_a_single_prompt() {
        let composer = AnswerComposer::new(Arc::new(EchoGenerator));
        let answer = composer
            .compose("q", "ctx", "h")
            .await
            .expect("composition should succeed");
        assert_eq!(answer, answer_prompt("q", "ctx", "h"));
    }
}
