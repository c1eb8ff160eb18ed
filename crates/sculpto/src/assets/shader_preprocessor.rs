//! Multi-stage shader source preprocessor.
//!
//! A shader file carries all of its stages in one text:
//!
//! ```text
//! #version 450            // global block, prepended to every stage
//! #include "lights.glsl"
//!
//! #shader-begin vertex
//! void main() { ... }
//! #shader-end
//!
//! #shader-begin fragment
//! void main() { ... }
//! #shader-end
//! ```
//!
//! `#include` directives are expanded first through a caller-supplied
//! resolver, then the text is split into stage blocks. Everything before
//! the first `#shader-begin` is the global block shared by all stages.

use thiserror::Error;

use crate::render::backend::ShaderStageKind;

const LEXEME_BLOCK_START: &str = "#shader-begin";
const LEXEME_BLOCK_END: &str = "#shader-end";
const LEXEME_INCLUDE: &str = "#include";

/// Nested includes deeper than this indicate a cycle.
const MAX_INCLUDE_DEPTH: usize = 16;

/// Shader preprocessing failures.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The text contains no stage blocks at all.
    #[error("shader '{name}' has no stage blocks")]
    NoShaderBlocks {
        /// Shader debug name.
        name: String,
    },
    /// A `#shader-begin` block was never closed.
    #[error("shader '{name}' has an unterminated stage block")]
    UnterminatedBlock {
        /// Shader debug name.
        name: String,
    },
    /// An include path could not be resolved.
    #[error("shader '{name}' includes unknown file '{path}'")]
    IncludeNotFound {
        /// Shader debug name.
        name: String,
        /// The path that failed to resolve.
        path: String,
    },
    /// Includes nested past [`MAX_INCLUDE_DEPTH`], almost certainly a cycle.
    #[error("shader '{name}' exceeds the include depth limit")]
    IncludeDepthExceeded {
        /// Shader debug name.
        name: String,
    },
}

/// One preprocessed stage: its kind plus expanded source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSource {
    /// Pipeline stage the block compiles to.
    pub kind: ShaderStageKind,
    /// Global block plus the stage block, includes expanded.
    pub source: String,
}

fn stage_from_keyword(keyword: &str) -> Option<ShaderStageKind> {
    match keyword.to_ascii_lowercase().as_str() {
        "vert" | "vertex" => Some(ShaderStageKind::Vertex),
        "frag" | "fragment" | "pixel" => Some(ShaderStageKind::Fragment),
        _ => None,
    }
}

fn expand_includes(
    name: &str,
    text: &str,
    resolver: &dyn Fn(&str) -> Option<String>,
    depth: usize,
) -> Result<String, AssetError> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(AssetError::IncludeDepthExceeded {
            name: name.to_owned(),
        });
    }

    let mut text = text.to_owned();
    let mut cursor = 0;
    while let Some(found) = text[cursor..].find(LEXEME_INCLUDE) {
        let offset = cursor + found;
        let after = &text[offset + LEXEME_INCLUDE.len()..];
        let path: String = after
            .trim_start()
            .chars()
            .take_while(|c| !c.is_whitespace())
            .collect();
        let directive_len = LEXEME_INCLUDE.len() + (after.len() - after.trim_start().len()) + path.len();

        let file_name = path.trim_matches('"');
        let Some(included) = resolver(file_name) else {
            return Err(AssetError::IncludeNotFound {
                name: name.to_owned(),
                path: file_name.to_owned(),
            });
        };
        // Only includes inside the included text count against the depth;
        // any number of siblings at this level is fine.
        let included = expand_includes(name, &included, resolver, depth + 1)?;
        text.replace_range(offset..offset + directive_len, &included);
        cursor = offset + included.len();
    }
    Ok(text)
}

/// Expand includes and split the text into per-stage sources.
///
/// Blocks with an unknown stage keyword are skipped with a warning, like
/// any other partially-broken asset; a text without a single valid block
/// is an error.
pub fn preprocess_shader(
    name: &str,
    text: &str,
    resolver: &dyn Fn(&str) -> Option<String>,
) -> Result<Vec<StageSource>, AssetError> {
    let text = expand_includes(name, text, resolver, 0)?;

    let Some(first_block) = text.find(LEXEME_BLOCK_START) else {
        return Err(AssetError::NoShaderBlocks {
            name: name.to_owned(),
        });
    };
    let global_block = &text[..first_block];

    let mut stages = Vec::new();
    let mut cursor = first_block;
    while let Some(start) = text[cursor..].find(LEXEME_BLOCK_START) {
        let block_start = cursor + start + LEXEME_BLOCK_START.len();
        let Some(end) = text[block_start..].find(LEXEME_BLOCK_END) else {
            return Err(AssetError::UnterminatedBlock {
                name: name.to_owned(),
            });
        };
        let block_end = block_start + end;
        cursor = block_end + LEXEME_BLOCK_END.len();

        let block = &text[block_start..block_end];
        let keyword: String = block
            .trim_start()
            .chars()
            .take_while(|c| !c.is_whitespace())
            .collect();
        let body = &block.trim_start()[keyword.len()..];

        match stage_from_keyword(&keyword) {
            Some(kind) => stages.push(StageSource {
                kind,
                source: format!("{global_block}{body}"),
            }),
            None => {
                log::warn!("shader '{name}': unknown stage '{keyword}', block skipped");
            }
        }
    }

    if stages.is_empty() {
        return Err(AssetError::NoShaderBlocks {
            name: name.to_owned(),
        });
    }
    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_STAGES: &str = "#version 450\n\
        #shader-begin vertex\n\
        void main() { v(); }\n\
        #shader-end\n\
        #shader-begin fragment\n\
        void main() { f(); }\n\
        #shader-end\n";

    fn no_includes(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn splits_stages_and_prepends_the_global_block() {
        let stages = preprocess_shader("test", TWO_STAGES, &no_includes).unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].kind, ShaderStageKind::Vertex);
        assert_eq!(stages[1].kind, ShaderStageKind::Fragment);
        for stage in &stages {
            assert!(stage.source.starts_with("#version 450"));
            assert!(stage.source.contains("void main()"));
        }
        assert!(stages[0].source.contains("v();"));
        assert!(!stages[0].source.contains("f();"));
    }

    #[test]
    fn stage_keyword_aliases_are_accepted() {
        let text = "#shader-begin vert\nv\n#shader-end\n#shader-begin pixel\np\n#shader-end";
        let stages = preprocess_shader("aliases", text, &no_includes).unwrap();
        assert_eq!(stages[0].kind, ShaderStageKind::Vertex);
        assert_eq!(stages[1].kind, ShaderStageKind::Fragment);
    }

    #[test]
    fn unknown_stage_blocks_are_skipped() {
        let text = "#shader-begin geometry\ng\n#shader-end\n#shader-begin vertex\nv\n#shader-end";
        let stages = preprocess_shader("geo", text, &no_includes).unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].kind, ShaderStageKind::Vertex);
    }

    #[test]
    fn text_without_blocks_is_an_error() {
        let result = preprocess_shader("empty", "void main() {}", &no_includes);
        assert!(matches!(result, Err(AssetError::NoShaderBlocks { .. })));
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let text = "#shader-begin vertex\nvoid main() {}";
        let result = preprocess_shader("broken", text, &no_includes);
        assert!(matches!(result, Err(AssetError::UnterminatedBlock { .. })));
    }

    #[test]
    fn includes_are_expanded_through_the_resolver() {
        let text = "#include \"common.glsl\"\n#shader-begin vertex\nuse_common();\n#shader-end";
        let resolver = |path: &str| {
            (path == "common.glsl").then(|| "float common_value = 1.0;\n".to_owned())
        };
        let stages = preprocess_shader("inc", text, &resolver).unwrap();
        assert!(stages[0].source.contains("float common_value"));
        assert!(stages[0].source.contains("use_common();"));
        assert!(!stages[0].source.contains("#include"));
    }

    #[test]
    fn nested_includes_resolve() {
        let text = "#include \"a.glsl\"\n#shader-begin vertex\nv\n#shader-end";
        let resolver = |path: &str| match path {
            "a.glsl" => Some("#include \"b.glsl\"\n".to_owned()),
            "b.glsl" => Some("from_b();\n".to_owned()),
            _ => None,
        };
        let stages = preprocess_shader("nested", text, &resolver).unwrap();
        assert!(stages[0].source.contains("from_b();"));
    }

    #[test]
    fn missing_include_is_an_error() {
        let text = "#include \"gone.glsl\"\n#shader-begin vertex\nv\n#shader-end";
        let result = preprocess_shader("miss", text, &no_includes);
        assert!(matches!(result, Err(AssetError::IncludeNotFound { .. })));
    }

    #[test]
    fn many_sibling_includes_are_not_a_cycle() {
        // Depth is per nesting level, so a flat list of includes longer
        // than the limit still expands.
        let mut text = String::new();
        for i in 0..20 {
            text.push_str(&format!("#include \"part{i}.glsl\"\n"));
        }
        text.push_str("#shader-begin vertex\nv\n#shader-end");
        let resolver = |path: &str| {
            path.starts_with("part").then(|| format!("// {path}\n"))
        };
        let stages = preprocess_shader("siblings", &text, &resolver).unwrap();
        assert!(stages[0].source.contains("// part0.glsl"));
        assert!(stages[0].source.contains("// part19.glsl"));
        assert!(!stages[0].source.contains("#include"));
    }

    #[test]
    fn include_cycles_are_cut_off() {
        let text = "#include \"loop.glsl\"\n#shader-begin vertex\nv\n#shader-end";
        let resolver = |path: &str| {
            (path == "loop.glsl").then(|| "#include \"loop.glsl\"\n".to_owned())
        };
        let result = preprocess_shader("cycle", text, &resolver);
        assert!(matches!(
            result,
            Err(AssetError::IncludeDepthExceeded { .. })
        ));
    }
}
