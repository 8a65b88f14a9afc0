use dialoguer::{Confirm, Input, Select};
use odoodeploy_core::resolve::Prompter;
use odoodeploy_core::AppError;

/// Terminal prompts backed by `dialoguer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompter;

fn prompt_err(e: dialoguer::Error) -> AppError {
    AppError::Prompt(e.to_string())
}

impl Prompter for DialoguerPrompter {
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, AppError> {
        let mut input = Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(d) = default {
            input = input.default(d.to_string());
        }
        input.interact_text().map_err(prompt_err)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, AppError> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(prompt_err)
    }

    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, AppError> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .map_err(prompt_err)
    }
}
