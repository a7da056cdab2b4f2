// Markdown → block texts, for loading documents from disk.
//
// Only the inline text matters to the suggestion pipeline, so every text
// block (paragraph, heading, list item, code block, table cell) becomes one
// plain block and line breaks inside it collapse to spaces.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

pub fn markdown_blocks(markdown: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Start(tag) if starts_block(&tag) => flush(&mut current, &mut blocks),
            Event::End(end) if ends_block(&end) => flush(&mut current, &mut blocks),
            Event::Text(text) | Event::Code(text) => current.push_str(&text),
            Event::SoftBreak | Event::HardBreak => current.push(' '),
            _ => {}
        }
    }
    flush(&mut current, &mut blocks);

    blocks
}

fn starts_block(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Paragraph | Tag::Heading { .. } | Tag::Item | Tag::CodeBlock(_) | Tag::TableCell
    )
}

fn ends_block(end: &TagEnd) -> bool {
    matches!(
        end,
        TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock | TagEnd::TableCell
    )
}

fn flush(current: &mut String, blocks: &mut Vec<String>) {
    let text = current.replace('\n', " ");
    let text = text.trim();
    if !text.is_empty() {
        blocks.push(text.to_string());
    }
    current.clear();
}
