//! Markdown → HTML rendering with an inline audio extension.
//!
//! Standard CommonMark (plus tables and strikethrough) is rendered by
//! `pulldown-cmark`. One extra inline rule is applied to text runs outside
//! code: `![audio:<path>]` becomes
//! `<audio src="<path>" controls></audio>`. Any other bracket syntax that
//! markdown does not recognise is left as literal text.
//!
//! Rendering is a pure function of its input, so the same body always
//! produces byte-identical HTML.

use std::sync::OnceLock;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd, TextMergeStream};
use regex::Regex;

fn audio_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"!\[audio:(?P<src>.+?)\]").expect("audio pattern is valid"))
}

/// Render a markdown body to HTML.
pub fn render_markdown(body: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut events: Vec<Event<'_>> = Vec::new();
    let mut in_code_block = false;

    for event in TextMergeStream::new(Parser::new_ext(body, options)) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                events.push(event);
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                events.push(event);
            }
            Event::Text(text) if !in_code_block && text.contains("![audio:") => {
                expand_audio(&text, &mut events);
            }
            other => events.push(other),
        }
    }

    let mut out = String::with_capacity(body.len() + body.len() / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Split a text run around audio tokens, emitting raw HTML for each token.
fn expand_audio(text: &str, events: &mut Vec<Event<'_>>) {
    let mut last = 0;
    for caps in audio_pattern().captures_iter(text) {
        let (Some(whole), Some(src)) = (caps.get(0), caps.name("src")) else {
            continue;
        };
        if whole.start() > last {
            events.push(Event::Text(CowStr::from(text[last..whole.start()].to_string())));
        }
        events.push(Event::InlineHtml(CowStr::from(audio_element(src.as_str()))));
        last = whole.end();
    }
    if last < text.len() {
        events.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}

fn audio_element(src: &str) -> String {
    format!("<audio src=\"{}\" controls></audio>", escape_attr(src))
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
