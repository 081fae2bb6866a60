//! Jupyter notebook to Markdown
//!
//! Markdown cells pass through unchanged; code cells become fenced blocks
//! tagged with the notebook's language. Other cell types and all outputs
//! are dropped.

use serde::Deserialize;

const DEFAULT_LANGUAGE: &str = "python";

#[derive(Debug, Deserialize)]
struct Notebook {
    cells: Vec<Cell>,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    language_info: Option<LanguageInfo>,
}

#[derive(Debug, Deserialize)]
struct LanguageInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: Source,
}

/// nbformat allows a cell's source as one string or a list of lines
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Source {
    Lines(Vec<String>),
    Text(String),
}

impl Default for Source {
    fn default() -> Self {
        Source::Text(String::new())
    }
}

impl Source {
    /// Lines already carry their own newlines
    fn text(&self) -> String {
        match self {
            Source::Lines(lines) => lines.concat(),
            Source::Text(text) => text.clone(),
        }
    }
}

/// Convert notebook JSON to Markdown
pub fn notebook_to_markdown(json: &str) -> Result<String, serde_json::Error> {
    let notebook: Notebook = serde_json::from_str(json)?;
    let language = notebook
        .metadata
        .language_info
        .as_ref()
        .map(|info| info.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_LANGUAGE);

    let blocks: Vec<String> = notebook
        .cells
        .iter()
        .filter_map(|cell| {
            let source = cell.source.text();
            let source = source.trim_end_matches('\n');
            match cell.cell_type.as_str() {
                "markdown" => Some(source.to_string()),
                "code" => Some(format!("```{}\n{}\n```", language, source)),
                _ => None,
            }
        })
        .collect();

    Ok(blocks.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_and_code_cells() {
        let json = r##"{
            "cells": [
                {"cell_type": "markdown", "source": ["# Title\n", "Intro text"]},
                {"cell_type": "code", "source": ["import os\n", "    print(1)\n"],
                 "outputs": [{"output_type": "stream", "text": ["1\n"]}]},
                {"cell_type": "raw", "source": "ignored"}
            ],
            "metadata": {},
            "nbformat": 4
        }"##;

        let md = notebook_to_markdown(json).unwrap();
        assert_eq!(
            md,
            "# Title\nIntro text\n\n```python\nimport os\n    print(1)\n```"
        );
    }

    #[test]
    fn test_string_source_and_kernel_language() {
        let json = r#"{
            "cells": [{"cell_type": "code", "source": "fn main() {}"}],
            "metadata": {"language_info": {"name": "rust"}}
        }"#;
        assert_eq!(
            notebook_to_markdown(json).unwrap(),
            "```rust\nfn main() {}\n```"
        );
    }

    #[test]
    fn test_empty_notebook() {
        assert_eq!(notebook_to_markdown(r#"{"cells": []}"#).unwrap(), "");
    }

    #[test]
    fn test_invalid_notebook() {
        assert!(notebook_to_markdown("{not json").is_err());
        assert!(notebook_to_markdown(r#"{"metadata": {}}"#).is_err());
    }
}
