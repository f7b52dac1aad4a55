//! Interactive prompts for values not given on the command line.
//!
//! Invalid answers are re-asked by `dialoguer`; a closed or non-interactive
//! stdin surfaces as an error.

use color_eyre::eyre::Result;
use dialoguer::{Confirm, Input};
use url::Url;

/// Ask for the chapter listing URL.
pub(crate) fn listing_url(prompt: &str) -> Result<Url> {
    let answer: String = Input::new()
        .with_prompt(prompt)
        .validate_with(|input: &String| check_listing_url(input))
        .interact_text()?;
    Ok(Url::parse(answer.trim())?)
}

/// Ask for a whole number no smaller than `min`.
pub(crate) fn number_at_least(prompt: &str, min: u32) -> Result<u32> {
    let answer = Input::<u32>::new()
        .with_prompt(prompt)
        .validate_with(|n: &u32| check_at_least(*n, min))
        .interact_text()?;
    Ok(answer)
}

/// Ask a yes/no question.
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).interact()?)
}

fn check_listing_url(input: &str) -> std::result::Result<(), String> {
    match Url::parse(input.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(format!("unsupported scheme '{}': use http or https", url.scheme())),
        Err(e) => Err(format!("invalid URL: {e}")),
    }
}

fn check_at_least(value: u32, min: u32) -> std::result::Result<(), String> {
    if value >= min {
        Ok(())
    } else {
        Err(format!("must be at least {min}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_url_accepts_http_and_https() {
        assert!(check_listing_url("https://novels.example.com/list/42").is_ok());
        assert!(check_listing_url("  http://novels.example.com/list  ").is_ok());
    }

    #[test]
    fn listing_url_rejects_other_input() {
        let err = check_listing_url("ftp://novels.example.com/list").unwrap_err();
        assert!(err.contains("ftp"));
        assert!(check_listing_url("not a url").unwrap_err().starts_with("invalid URL"));
        assert!(check_listing_url("").is_err());
    }

    #[test]
    fn at_least_enforces_minimum() {
        assert!(check_at_least(1, 1).is_ok());
        assert!(check_at_least(7, 3).is_ok());
        assert_eq!(check_at_least(0, 1).unwrap_err(), "must be at least 1");
        assert!(check_at_least(2, 3).is_err());
    }
}
