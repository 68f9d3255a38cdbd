/// Interactive value request. Returns `None` when the user cancels.
///
/// Any modality fits: a form field, a terminal prompt, or a value already
/// carried by an RPC body.
pub trait ValuePrompt: Send + Sync {
    fn request(&self, message: &str, default: &str) -> Option<String>;
}

/// Answers every request with a value decided up front.
#[derive(Debug, Clone, Default)]
pub struct FixedPrompt(Option<String>);

impl FixedPrompt {
    pub fn new(value: Option<String>) -> Self {
        Self(value)
    }

    pub fn cancelled() -> Self {
        Self(None)
    }
}

impl ValuePrompt for FixedPrompt {
    fn request(&self, _message: &str, _default: &str) -> Option<String> {
        self.0.clone()
    }
}

impl<F> ValuePrompt for F
where
    F: Fn(&str, &str) -> Option<String> + Send + Sync,
{
    fn request(&self, message: &str, default: &str) -> Option<String> {
        self(message, default)
    }
}

/// Ask and treat an empty or whitespace-only answer as a cancel.
pub(crate) fn ask(prompt: &dyn ValuePrompt, message: &str, default: &str) -> Option<String> {
    prompt
        .request(message, default)
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_answer_is_cancel() {
        assert_eq!(ask(&FixedPrompt::new(Some("   ".into())), "Tag name", ""), None);
        assert_eq!(ask(&FixedPrompt::cancelled(), "Tag name", ""), None);
        assert_eq!(
            ask(&FixedPrompt::new(Some("home".into())), "Tag name", ""),
            Some("home".into())
        );
    }

    #[test]
    fn test_closure_prompt_sees_default() {
        let echo = |_: &str, default: &str| Some(format!("{default}!"));
        assert_eq!(ask(&echo, "Update Todo content", "Buy milk"), Some("Buy milk!".into()));
    }
}
