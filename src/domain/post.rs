use pulldown_cmark::html;
use pulldown_cmark::Parser;
use scraper::Html;
use serde::Deserialize;
use serde::Serialize;

/// Number of characters (not bytes, not words) kept in the excerpt
const EXCERPT_LEN: usize = 50;

/// A published post, as stored in the `posts` collection. Posts are never
/// edited after creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub title: String,
    pub date: String,
    pub html_content: String,
    pub text_content: String,
    pub excerpt: String,
}

impl Post {
    /// Render `content` (markdown) into the html, text and excerpt forms.
    /// Missing or blank fields are rejected.
    pub fn parse(
        title: Option<String>,
        content: Option<String>,
        date: String,
    ) -> Result<Self, String> {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .ok_or("Post title is empty")?;
        let content = content
            .filter(|c| !c.trim().is_empty())
            .ok_or("Post content is empty")?;

        let html_content = markdown_to_html(&content);
        let text_content = html_to_text(&html_content);
        let excerpt = excerpt(&text_content);

        Ok(Self {
            title,
            date,
            html_content,
            text_content,
            excerpt,
        })
    }
}

fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// Text nodes only, with surrounding whitespace trimmed
fn html_to_text(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_owned()
}

/// The ellipsis is always appended, even when nothing was cut
fn excerpt(text: &str) -> String {
    let mut excerpt: String = text.chars().take(EXCERPT_LEN).collect();
    excerpt.push_str("...");
    excerpt
}
