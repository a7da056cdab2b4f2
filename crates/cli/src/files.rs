// Config and document files on disk.
//
// Sources are markdown; annotated documents are saved as binary yrs state so
// pending suggestions survive between `replay`/`suggest` and `review`.

use std::path::Path;

use anyhow::Context;
use redline_engine::config::EngineConfig;
use redline_engine::document::ydoc::YrsDocument;

/// Load `path` (or the global config when unset) and validate it.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("failed to load config `{}`", path.display()))?,
        None => EngineConfig::load(),
    };
    config.validate()?;
    Ok(config)
}

pub fn read_markdown(path: &Path, config: &EngineConfig) -> anyhow::Result<YrsDocument> {
    let markdown = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    Ok(YrsDocument::from_markdown(&markdown).with_layout(config.layout.grid()))
}

pub fn read_state(path: &Path, config: &EngineConfig) -> anyhow::Result<YrsDocument> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;
    let doc = YrsDocument::from_state(&data)
        .with_context(|| format!("`{}` is not a saved document state", path.display()))?;
    Ok(doc.with_layout(config.layout.grid()))
}

pub fn write_state(path: &Path, doc: &YrsDocument) -> anyhow::Result<()> {
    create_parent(path)?;
    std::fs::write(path, doc.encode_state())
        .with_context(|| format!("failed to write `{}`", path.display()))
}

/// Write the document as plain paragraphs separated by blank lines.
pub fn write_plain(path: &Path, doc: &YrsDocument) -> anyhow::Result<()> {
    create_parent(path)?;
    let mut text = doc.block_texts().join("\n\n");
    text.push('\n');
    std::fs::write(path, text).with_context(|| format!("failed to write `{}`", path.display()))
}

fn create_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    Ok(())
}
