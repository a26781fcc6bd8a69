use crate::error::ModelError;
use crate::models::GenerationOptions;

/// Text generation capability used to turn a composed prompt into an answer.
///
/// Calls are blocking and carry no cancellation; callers that need a deadline
/// impose it around the call.
pub trait AnswerGenerator {
    fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String, ModelError>;
}

impl<G: AnswerGenerator + ?Sized> AnswerGenerator for Box<G> {
    fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String, ModelError> {
        (**self).generate(prompt, options)
    }
}
