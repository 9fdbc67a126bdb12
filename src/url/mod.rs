//! URL helpers for ycrawler
//!
//! Endpoint templates are expanded here, and discovered links are normalized
//! before de-duplication.

mod normalize;

pub use normalize::normalize_link;

use crate::crawler::StoryId;
use url::Url;

/// Placeholder substituted with the story id in endpoint templates
pub const ID_PLACEHOLDER: &str = "{id}";

/// Expands an endpoint template such as `https://host/item/{id}.json`
///
/// # Examples
///
/// ```
/// use ycrawler::crawler::StoryId;
/// use ycrawler::url::expand_template;
///
/// let url = expand_template("https://news.ycombinator.com/item?id={id}", StoryId(42)).unwrap();
/// assert_eq!(url.as_str(), "https://news.ycombinator.com/item?id=42");
/// ```
pub fn expand_template(template: &str, id: StoryId) -> Result<Url, url::ParseError> {
    Url::parse(&template.replace(ID_PLACEHOLDER, &id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_item_template() {
        let url = expand_template(
            "https://hacker-news.firebaseio.com/v0/item/{id}.json",
            StoryId(8863),
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://hacker-news.firebaseio.com/v0/item/8863.json"
        );
    }

    #[test]
    fn test_expand_invalid_template() {
        assert!(expand_template("not a url {id}", StoryId(1)).is_err());
    }
}
